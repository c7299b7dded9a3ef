//! AFS error types.
//!
//! Every terminal job failure maps to an `FsError` carrying a platform
//! status code. `code()` yields the value reported by
//! `WorkHandle::result()`; zero is reserved for success.

use std::io;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    /// Path is too long or contains an interior NUL.
    #[error("path cannot be represented: {reason}")]
    PathEncoding { code: i32, reason: &'static str },
    #[error("open failed: os error {code}")]
    Open { code: i32 },
    #[error("size query failed: os error {code}")]
    SizeQuery { code: i32 },
    #[error("read failed: os error {code}")]
    Read { code: i32 },
    #[error("write failed: os error {code}")]
    Write { code: i32 },
    /// Heap could not satisfy the request (bad layout or out of memory).
    #[error("allocation of {size} bytes (align {align}) failed")]
    Alloc { size: usize, align: usize },
    #[error("failed to spawn worker thread: os error {code}")]
    WorkerSpawn { code: i32 },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FsError {
    /// Platform-style status code for this failure. Never zero.
    pub fn code(&self) -> i32 {
        match self {
            Self::PathEncoding { code, .. }
            | Self::Open { code }
            | Self::SizeQuery { code }
            | Self::Read { code }
            | Self::Write { code }
            | Self::WorkerSpawn { code } => *code,
            Self::Alloc { .. } => libc::ENOMEM,
            Self::Config(_) => libc::EINVAL,
        }
    }

    /// OS errno carried by an I/O error, `EIO` when there is none
    /// (e.g. `WriteZero` from a short write).
    pub fn os_code(err: &io::Error) -> i32 {
        match err.raw_os_error() {
            Some(code) if code != 0 => code,
            _ => libc::EIO,
        }
    }

    pub fn open(err: &io::Error) -> Self {
        Self::Open { code: Self::os_code(err) }
    }

    pub fn size_query(err: &io::Error) -> Self {
        Self::SizeQuery { code: Self::os_code(err) }
    }

    pub fn read(err: &io::Error) -> Self {
        Self::Read { code: Self::os_code(err) }
    }

    pub fn write(err: &io::Error) -> Self {
        Self::Write { code: Self::os_code(err) }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
