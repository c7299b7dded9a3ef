//! End-to-end pipeline tests against a scratch directory.

use std::path::Path;
use std::sync::Arc;

use afs::{is_done, FileSystem, FsConfig, FsError, Heap, TrackedHeap, WorkHandle};
use afs_module::BoundedQueue;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tempfile::TempDir;

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut bytes);
    bytes
}

fn setup(config: FsConfig) -> (TempDir, Arc<TrackedHeap>, FileSystem) {
    let dir = tempfile::tempdir().unwrap();
    let heap = Arc::new(TrackedHeap::new("test"));
    let fs = FileSystem::new(config, heap.clone()).unwrap();
    (dir, heap, fs)
}

fn path_in(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_str().unwrap().to_owned()
}

/// Take the read buffer, copy it out, and give it back to the heap.
fn read_bytes(heap: &TrackedHeap, h: &WorkHandle) -> Vec<u8> {
    let buf = h.take_buffer().expect("read produced a buffer");
    let bytes = buf[..h.size()].to_vec();
    heap.free(buf);
    bytes
}

#[test]
fn test_compressed_round_trip() {
    let (dir, heap, fs) = setup(FsConfig::default());
    let path = path_in(&dir, "data.lz4");
    let original = pattern(10_000);

    let w = fs.write(&path, fs.alloc_copy(&original).unwrap(), true);
    assert_eq!(w.result(), 0);
    assert_eq!(w.requested_size(), 10_000);
    assert!(w.size() < 10_000, "pattern data should shrink");
    assert!(w.take_buffer().is_none());

    let on_disk = std::fs::read(&path).unwrap();
    assert_eq!(on_disk.len(), w.size());
    assert_eq!(&on_disk[..4], &10_000u32.to_le_bytes());

    let r = fs.read(&path, heap.clone(), false, true);
    assert_eq!(r.result(), 0);
    assert_eq!(r.size(), 10_000);
    assert_eq!(read_bytes(&heap, &r), original);

    fs.shutdown();
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_null_terminated_read() {
    let (dir, heap, fs) = setup(FsConfig::default());
    let path = path_in(&dir, "config.txt");
    std::fs::write(&path, b"key = value\n").unwrap();

    let r = fs.read(&path, heap.clone(), true, false);
    assert_eq!(r.result(), 0);
    let size = r.size();
    assert_eq!(size, 12);
    let buf = r.take_buffer().unwrap();
    assert_eq!(buf.len(), size + 1);
    assert_eq!(&buf[..size], b"key = value\n");
    assert_eq!(buf[size], 0);
    heap.free(buf);
}

#[test]
fn test_null_terminated_decompressing_read() {
    let (dir, heap, fs) = setup(FsConfig::default());
    let path = path_in(&dir, "text.lz4");
    let text = b"abcabcabcabcabcabcabcabcabcabcabcabcabcabcabcabc".repeat(20);

    let w = fs.write(&path, fs.alloc_copy(&text).unwrap(), true);
    assert_eq!(w.result(), 0);

    let r = fs.read(&path, heap.clone(), true, true);
    assert_eq!(r.size(), text.len());
    let buf = r.take_buffer().unwrap();
    assert_eq!(&buf[..text.len()], &text[..]);
    assert_eq!(buf[text.len()], 0);
    heap.free(buf);
}

#[test]
fn test_missing_file() {
    let (dir, heap, fs) = setup(FsConfig::default());
    let r = fs.read(&path_in(&dir, "nope.bin"), heap.clone(), true, false);

    r.wait();
    assert!(r.is_done());
    assert_ne!(r.result(), 0);
    assert_eq!(r.result(), libc::ENOENT);
    assert!(matches!(r.error(), Some(FsError::Open { .. })));
    assert_eq!(r.size(), 0);
    assert!(r.take_buffer().is_none());

    fs.shutdown();
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_many_writes_then_reads() {
    let (dir, heap, fs) = setup(FsConfig::default().queue_capacity(4));
    let n = 40;

    let writes: Vec<_> = (0..n)
        .map(|i| {
            let body = format!("file number {}\n", i).repeat(i + 1);
            let buf = fs.alloc_copy(body.as_bytes()).unwrap();
            fs.write(&path_in(&dir, &format!("f{}.txt", i)), buf, i % 2 == 0)
        })
        .collect();
    for w in &writes {
        w.wait();
        assert!(w.is_done());
        assert_eq!(w.result(), 0, "{:?}", w.error());
    }

    let reads: Vec<_> = (0..n)
        .map(|i| fs.read(&path_in(&dir, &format!("f{}.txt", i)), heap.clone(), false, i % 2 == 0))
        .collect();
    for (i, r) in reads.iter().enumerate() {
        assert_eq!(r.result(), 0);
        let expected = format!("file number {}\n", i).repeat(i + 1);
        assert_eq!(read_bytes(&heap, r), expected.as_bytes());
    }

    fs.shutdown();
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_done_after_wait() {
    let (dir, heap, fs) = setup(FsConfig::default());
    let path = path_in(&dir, "poll.bin");
    std::fs::write(&path, pattern(64 * 1024)).unwrap();

    let r = fs.read(&path, heap.clone(), false, false);
    while !is_done(Some(&r)) {
        std::thread::yield_now();
    }
    r.wait();
    assert!(r.is_done());
    assert_eq!(read_bytes(&heap, &r).len(), 64 * 1024);
    assert!(is_done(None));
}

#[test]
fn test_destroy_without_wait() {
    let (dir, heap, fs) = setup(FsConfig::default());
    let path = path_in(&dir, "destroy.bin");

    let w = fs.write(&path, fs.alloc_copy(b"destroyed early").unwrap(), false);
    assert!(w.destroy().is_none());
    assert_eq!(std::fs::read(&path).unwrap(), b"destroyed early");

    let r = fs.read(&path, heap.clone(), false, false);
    let buf = r.destroy().expect("unclaimed buffer handed back");
    assert_eq!(&buf[..], b"destroyed early");
    heap.free(buf);

    fs.shutdown();
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_shutdown_finishes_pending_jobs() {
    let (dir, heap, fs) = setup(FsConfig::default().queue_capacity(2));

    let mut handles = Vec::new();
    for i in 0..16 {
        let path = path_in(&dir, &format!("p{}.bin", i));
        let buf = fs.alloc_copy(&pattern(4096 + i)).unwrap();
        handles.push(fs.write_deferred(&path, buf, true));
    }
    fs.shutdown();

    for h in &handles {
        assert!(h.is_done());
        assert_eq!(h.result(), 0);
    }
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_incompressible_write_round_trips() {
    let (dir, heap, fs) = setup(FsConfig::default());
    let path = path_in(&dir, "noise.lz4");
    let payload = noise(4096, 7);

    let w = fs.write(&path, fs.alloc_copy(&payload).unwrap(), true);
    assert_eq!(w.result(), 0);
    let on_disk = std::fs::read(&path).unwrap();
    assert_eq!(on_disk.len(), w.size());
    assert!(w.size() > payload.len(), "random data grows a little");
    assert_eq!(&on_disk[..4], &4096u32.to_le_bytes());

    let r = fs.read(&path, heap.clone(), false, true);
    assert_eq!(r.result(), 0);
    assert_eq!(read_bytes(&heap, &r), payload);

    fs.shutdown();
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_header_lookalike_payload_round_trips() {
    // Six raw bytes that also parse as a frame declaring one byte.
    let (dir, heap, fs) = setup(FsConfig::default());
    let path = path_in(&dir, "lookalike.lz4");
    let payload = [1u8, 0, 0, 0, 0x10, b'A'];

    let w = fs.write(&path, fs.alloc_copy(&payload).unwrap(), true);
    assert_eq!(w.result(), 0);
    assert_eq!(&std::fs::read(&path).unwrap()[..4], &6u32.to_le_bytes());

    let r = fs.read(&path, heap.clone(), false, true);
    assert_eq!(r.result(), 0);
    assert_eq!(r.size(), payload.len());
    assert_eq!(read_bytes(&heap, &r), payload);

    fs.shutdown();
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_read_failure_frees_buffer() {
    // Opening a directory succeeds on Linux; reading it fails with EISDIR.
    // The entry keeps the directory's reported size above zero.
    let (dir, heap, fs) = setup(FsConfig::default());
    let path = path_in(&dir, "subdir");
    std::fs::create_dir(&path).unwrap();
    std::fs::write(dir.path().join("subdir/entry.txt"), b"x").unwrap();

    let r = fs.read(&path, heap.clone(), true, true);
    r.wait();
    assert!(r.is_done());
    assert!(matches!(r.error(), Some(FsError::Read { .. })));
    assert_eq!(r.result(), libc::EISDIR);
    assert_eq!(r.size(), 0);
    assert!(r.take_buffer().is_none());

    fs.shutdown();
    assert_eq!(heap.total_allocations(), 1, "buffer was allocated before the read failed");
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_deferred_matches_blocking_write() {
    let (dir, heap, fs) = setup(FsConfig::default());
    let payload = pattern(50_000);
    let blocking = path_in(&dir, "blocking.lz4");
    let deferred = path_in(&dir, "deferred.lz4");

    let a = fs.write(&blocking, fs.alloc_copy(&payload).unwrap(), true);
    let b = fs.write_deferred(&deferred, fs.alloc_copy(&payload).unwrap(), true);
    assert_eq!(a.result(), 0);
    assert_eq!(b.result(), 0);
    assert_eq!(a.size(), b.size());
    assert_eq!(std::fs::read(&blocking).unwrap(), std::fs::read(&deferred).unwrap());

    let r = fs.read(&deferred, heap.clone(), false, true);
    assert_eq!(read_bytes(&heap, &r), payload);

    fs.shutdown();
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_failed_write_returns_original() {
    let (dir, heap, fs) = setup(FsConfig::default());
    let path = path_in(&dir, "missing/dir/out.lz4");
    let payload = pattern(8192);

    let w = fs.write(&path, fs.alloc_copy(&payload).unwrap(), true);
    assert_eq!(w.result(), libc::ENOENT);
    assert!(matches!(w.error(), Some(FsError::Open { .. })));
    assert_eq!(w.size(), 0);
    assert!(!Path::new(&path).exists());

    let back = w.take_buffer().expect("original payload handed back");
    assert_eq!(&back[..], &payload[..]);
    heap.free(back);

    fs.shutdown();
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_decompress_backlog_does_not_stall() {
    let (dir, heap, fs) = setup(FsConfig::default().queue_capacity(1));
    let n = 24;
    let payloads: Vec<_> = (0..n).map(|i| pattern(20_000 + i * 100)).collect();

    for (i, p) in payloads.iter().enumerate() {
        let w = fs.write(&path_in(&dir, &format!("c{}.lz4", i)), fs.alloc_copy(p).unwrap(), true);
        assert_eq!(w.result(), 0);
    }

    let reads: Vec<_> = (0..n)
        .map(|i| fs.read(&path_in(&dir, &format!("c{}.lz4", i)), heap.clone(), false, true))
        .collect();
    for (r, p) in reads.iter().zip(&payloads) {
        assert_eq!(r.result(), 0);
        assert_eq!(&read_bytes(&heap, r), p);
    }

    fs.shutdown();
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_decompress_of_raw_file_keeps_bytes() {
    let (dir, heap, fs) = setup(FsConfig::default());
    let path = path_in(&dir, "raw.txt");
    std::fs::write(&path, b"hi").unwrap();

    let r = fs.read(&path, heap.clone(), true, true);
    assert_eq!(r.result(), 0);
    assert_eq!(r.size(), 2);
    let buf = r.take_buffer().unwrap();
    assert_eq!(&buf[..2], b"hi");
    assert_eq!(buf[2], 0);
    heap.free(buf);
}

#[test]
fn test_invalid_path_rejected() {
    let (_dir, heap, fs) = setup(FsConfig::default());

    let r = fs.read("bad\0path", heap.clone(), false, false);
    assert!(r.is_done());
    assert_eq!(r.result(), libc::EINVAL);
    assert!(matches!(r.error(), Some(FsError::PathEncoding { .. })));
    assert!(r.take_buffer().is_none());

    let long = "x".repeat(4096);
    let w = fs.write(&long, fs.alloc_copy(b"kept").unwrap(), true);
    assert!(w.is_done());
    assert_eq!(w.result(), libc::ENAMETOOLONG);
    let back = w.take_buffer().unwrap();
    assert_eq!(&back[..], b"kept");
    heap.free(back);

    fs.shutdown();
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_empty_file_round_trip() {
    let (dir, heap, fs) = setup(FsConfig::default());
    let plain = path_in(&dir, "empty.bin");
    let packed = path_in(&dir, "empty.lz4");

    let w = fs.write(&plain, fs.alloc_copy(&[]).unwrap(), false);
    assert_eq!(w.result(), 0);
    assert_eq!(w.size(), 0);

    let w = fs.write(&packed, fs.alloc_copy(&[]).unwrap(), true);
    assert_eq!(w.result(), 0);
    assert_eq!(std::fs::read(&packed).unwrap(), [0u8; 4]);

    for (path, decompress) in [(&plain, false), (&packed, true)] {
        let r = fs.read(path, heap.clone(), true, decompress);
        assert_eq!(r.result(), 0);
        assert_eq!(r.size(), 0);
        let buf = r.take_buffer().unwrap();
        assert_eq!(&buf[..], &[0u8]);
        heap.free(buf);
    }

    fs.shutdown();
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_custom_queues() {
    let dir = tempfile::tempdir().unwrap();
    let heap = Arc::new(TrackedHeap::new("custom"));
    let fs = FileSystem::with_queues(
        FsConfig::default().thread_name_prefix("custom"),
        heap.clone(),
        Arc::new(afs::Lz4Codec),
        BoundedQueue::new(3),
        BoundedQueue::new(3),
    )
    .unwrap();

    let path = path_in(&dir, "custom.lz4");
    let w = fs.write_deferred(&path, fs.alloc_copy(&pattern(3000)).unwrap(), true);
    assert_eq!(w.result(), 0);
    let r = fs.read(&path, heap.clone(), false, true);
    assert_eq!(read_bytes(&heap, &r), pattern(3000));

    drop(fs);
    assert_eq!(heap.live_allocations(), 0);
}

#[test]
fn test_invalid_config_rejected() {
    let heap = Arc::new(TrackedHeap::new("config"));
    match FileSystem::new(FsConfig::default().buffer_align(3), heap) {
        Err(FsError::Config(_)) => {}
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("misaligned config accepted"),
    }
}
