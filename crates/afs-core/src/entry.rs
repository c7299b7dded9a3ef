//! Work entry types.
//!
//! The immutable description of a job: which file, which direction, and
//! whether the compression stage runs. Shared by the submission API, both
//! workers and the retrieval side.

use std::fmt;
use std::path::Path;

use crate::error::{FsError, Result};

/// Direction of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkOp {
    Read,
    Write,
}

/// Which compression stage, if any, a job passes through.
///
/// Only one meaning is valid per op: writes may compress before the disk
/// stage, reads may decompress after it. The submission API derives the
/// intent from the op, so the mismatched combinations cannot be built
/// through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionIntent {
    #[default]
    None,
    CompressThenWrite,
    ReadThenDecompress,
}

impl CompressionIntent {
    #[inline]
    pub fn for_write(compress: bool) -> Self {
        if compress { Self::CompressThenWrite } else { Self::None }
    }

    #[inline]
    pub fn for_read(decompress: bool) -> Self {
        if decompress { Self::ReadThenDecompress } else { Self::None }
    }

    /// Whether this intent routes the job through the compression worker.
    #[inline]
    pub fn uses_codec(self) -> bool {
        self != Self::None
    }
}

/// A bounded UTF-8 path.
///
/// Capacity matches the fixed path slot of a work item: at most
/// `JobPath::CAPACITY` bytes, no interior NUL.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct JobPath {
    raw: String,
}

impl JobPath {
    pub const CAPACITY: usize = 1024;

    pub fn new(path: &str) -> Result<Self> {
        // One byte of the slot is reserved for the terminator.
        if path.len() >= Self::CAPACITY {
            return Err(FsError::PathEncoding {
                code: libc::ENAMETOOLONG,
                reason: "path exceeds 1023 bytes",
            });
        }
        if path.is_empty() {
            return Err(FsError::PathEncoding {
                code: libc::ENOENT,
                reason: "path is empty",
            });
        }
        if path.as_bytes().contains(&0) {
            return Err(FsError::PathEncoding {
                code: libc::EINVAL,
                reason: "path contains a NUL byte",
            });
        }
        Ok(Self { raw: path.to_owned() })
    }

    /// Best-effort copy of a path that failed validation, kept only so
    /// failed jobs can still be named in logs and by `WorkHandle::path`.
    pub fn lossy(path: &str) -> Self {
        let mut end = path.len().min(Self::CAPACITY - 1);
        while !path.is_char_boundary(end) {
            end -= 1;
        }
        Self { raw: path[..end].replace('\0', "") }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[inline]
    pub fn as_path(&self) -> &Path {
        Path::new(&self.raw)
    }
}

impl fmt::Debug for JobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.raw)
    }
}

impl fmt::Display for JobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_accepts_normal() {
        let p = JobPath::new("assets/config.txt").unwrap();
        assert_eq!(p.as_str(), "assets/config.txt");
        assert_eq!(p.as_path(), Path::new("assets/config.txt"));
    }

    #[test]
    fn test_path_rejects_too_long() {
        let long = "a".repeat(JobPath::CAPACITY);
        let err = JobPath::new(&long).unwrap_err();
        assert!(matches!(err, FsError::PathEncoding { code, .. } if code == libc::ENAMETOOLONG));

        let fits = "a".repeat(JobPath::CAPACITY - 1);
        assert!(JobPath::new(&fits).is_ok());
    }

    #[test]
    fn test_path_rejects_nul_and_empty() {
        assert!(JobPath::new("bad\0path").is_err());
        assert!(JobPath::new("").is_err());
    }

    #[test]
    fn test_lossy_truncates_on_char_boundary() {
        let long = "é".repeat(JobPath::CAPACITY);
        let p = JobPath::lossy(&long);
        assert!(p.as_str().len() < JobPath::CAPACITY);
        assert!(p.as_str().chars().all(|c| c == 'é'));
        assert_eq!(JobPath::lossy("a\0b").as_str(), "ab");
    }

    #[test]
    fn test_intent_from_flags() {
        assert_eq!(CompressionIntent::for_write(true), CompressionIntent::CompressThenWrite);
        assert_eq!(CompressionIntent::for_read(true), CompressionIntent::ReadThenDecompress);
        assert_eq!(CompressionIntent::for_read(false), CompressionIntent::None);
        assert!(!CompressionIntent::None.uses_codec());
        assert!(CompressionIntent::ReadThenDecompress.uses_codec());
    }
}
