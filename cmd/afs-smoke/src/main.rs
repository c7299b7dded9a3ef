//! AFS End-to-End Smoke Test
//!
//! Tests the full AFS stack:
//!   Part A: Building blocks: heap accounting, LZ4 frame round trip
//!   Part B: Plain I/O: write, read, null-terminated read
//!   Part C: Compression: blocking and deferred writes, decompressing reads
//!   Part D: Failures: missing file, failed write, invalid path
//!   Part E: Load: tiny queues, many jobs, shutdown with work in flight
//!
//! Run: RUST_LOG=afs=debug ./target/release/afs-smoke

use std::sync::Arc;
use std::time::Instant;

use afs::{FileSystem, FsConfig, Heap, TrackedHeap, WorkHandle};
use afs_core::codec::Codec;
use afs_module::{frame, Lz4Codec};

use log::info;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

// ── Test harness ──

struct TestRunner {
    total: usize,
    passed: usize,
    failed: usize,
}

const LINE: &str = "────────────────────────────────────────────────────────────";

impl TestRunner {
    fn new() -> Self {
        Self { total: 0, passed: 0, failed: 0 }
    }

    fn section(&self, name: &str) {
        println!("\n{}", LINE);
        println!("  {}", name);
        println!("{}", LINE);
    }

    fn pass(&mut self, name: &str) {
        self.total += 1;
        self.passed += 1;
        println!("  [{:2}] {:<52} PASS", self.total, name);
    }

    fn fail(&mut self, name: &str, reason: &str) {
        self.total += 1;
        self.failed += 1;
        println!("  [{:2}] {:<52} FAIL: {}", self.total, name, reason);
    }

    fn check(&mut self, name: &str, ok: bool, reason: &str) {
        if ok { self.pass(name); } else { self.fail(name, reason); }
    }

    fn summary(&self) {
        println!("\n{}", LINE);
        println!(
            "  Total: {}  Passed: {}  Failed: {}",
            self.total, self.passed, self.failed
        );
        println!("{}", LINE);
    }
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Seeded random bytes; LZ4 cannot shrink them.
fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut bytes);
    bytes
}

/// Take a read's bytes (without terminator) and return the buffer to `heap`.
fn take_bytes(heap: &dyn Heap, h: &WorkHandle) -> Option<Vec<u8>> {
    let buf = h.take_buffer()?;
    let bytes = buf[..h.size().min(buf.len())].to_vec();
    heap.free(buf);
    Some(bytes)
}

// ════════════════════════════════════════════════════════════
// Part A: Building blocks
// ════════════════════════════════════════════════════════════

fn test_blocks(t: &mut TestRunner) {
    t.section("Part A: Building blocks");

    let heap = TrackedHeap::new("smoke-a");

    // A1: heap accounting
    match heap.alloc(4096, 64) {
        Ok(buf) => {
            let aligned = buf.as_slice().as_ptr() as usize % 64 == 0;
            t.check("alloc 4096 @ 64", aligned && heap.live_bytes() == 4096, "bad alignment or accounting");
            heap.free(buf);
            t.check("free returns to zero", heap.live_allocations() == 0, "allocation still live");
        }
        Err(e) => t.fail("alloc 4096 @ 64", &e.to_string()),
    }

    // A2: frame round trip
    let codec = Lz4Codec;
    let src = pattern(64 * 1024);
    match frame::compress(&codec, &heap, &src, 8) {
        Ok(framed) => {
            t.check(
                &format!("{} frame 64K -> {}", codec.name(), framed.len()),
                framed.len() < src.len() && frame::declared_len(&framed) == Some(src.len()),
                "frame did not shrink or header wrong",
            );
            match frame::decompress(&codec, &heap, &framed, 0, 1 << 20, 8) {
                Ok(plain) => {
                    t.check("frame decompress", plain[..] == src[..], "payload mismatch");
                    heap.free(plain);
                }
                Err(e) => t.fail("frame decompress", &e.to_string()),
            }
            heap.free(framed);
        }
        Err(e) => t.fail("frame compress", &e.to_string()),
    }

    // A3: incompressible input still frames
    let rnd = noise(4096, 0xA3);
    match frame::compress(&codec, &heap, &rnd, 8) {
        Ok(framed) => {
            t.check(
                &format!("incompressible framed to {}", framed.len()),
                frame::declared_len(&framed) == Some(rnd.len()),
                "header wrong",
            );
            heap.free(framed);
        }
        Err(e) => t.fail("incompressible framed", &e.to_string()),
    }

    t.check("no leaks (part A)", heap.report_leaks() == 0, "live buffers remain");
}

// ════════════════════════════════════════════════════════════
// Part B: Plain I/O
// ════════════════════════════════════════════════════════════

fn test_plain(t: &mut TestRunner, fs: &FileSystem, heap: &Arc<TrackedHeap>, dir: &str) {
    t.section("Part B: Plain I/O");

    let path = format!("{}/plain.bin", dir);
    let body = pattern(12_345);

    // B1: write
    let w = match fs.alloc_copy(&body) {
        Ok(buf) => fs.write(&path, buf, false),
        Err(e) => return t.fail("alloc payload", &e.to_string()),
    };
    t.check("write 12345 bytes", w.result() == 0 && w.size() == body.len(), &format!("{:?}", w.error()));

    // B2: read back
    let r = fs.read(&path, heap.clone(), false, false);
    let got = take_bytes(&**heap, &r);
    t.check("read back identical", got.as_deref() == Some(&body[..]), "content mismatch");

    // B3: null-terminated read
    let cfg = format!("{}/config.txt", dir);
    let text = b"threads = 2\nqueue = 64\n";
    if std::fs::write(&cfg, text).is_err() {
        return t.fail("create config.txt", "write failed");
    }
    let r = fs.read(&cfg, heap.clone(), true, false);
    let size = r.size();
    match r.take_buffer() {
        Some(buf) => {
            t.check(
                "null-terminated read",
                size == text.len() && buf.len() == size + 1 && buf[size] == 0,
                &format!("size {} len {}", size, buf.len()),
            );
            heap.free(buf);
        }
        None => t.fail("null-terminated read", &format!("{:?}", r.error())),
    }
}

// ════════════════════════════════════════════════════════════
// Part C: Compression
// ════════════════════════════════════════════════════════════

fn test_compression(t: &mut TestRunner, fs: &FileSystem, heap: &Arc<TrackedHeap>, dir: &str) {
    t.section("Part C: Compression");

    let body = pattern(10_000);
    let blocking = format!("{}/blocking.lz4", dir);
    let deferred = format!("{}/deferred.lz4", dir);

    // C1: blocking compressed write
    let a = match fs.alloc_copy(&body) {
        Ok(buf) => fs.write(&blocking, buf, true),
        Err(e) => return t.fail("alloc payload", &e.to_string()),
    };
    t.check(
        &format!("write(compress) 10000 -> {}", a.size()),
        a.result() == 0 && a.size() < body.len(),
        &format!("{:?}", a.error()),
    );

    // C2: deferred compressed write lands the same bytes
    let b = match fs.alloc_copy(&body) {
        Ok(buf) => fs.write_deferred(&deferred, buf, true),
        Err(e) => return t.fail("alloc payload", &e.to_string()),
    };
    b.wait();
    let same = std::fs::read(&blocking).ok() == std::fs::read(&deferred).ok();
    t.check("write_deferred matches write", b.result() == 0 && same, "files differ");

    // C3: decompressing read
    let r = fs.read(&deferred, heap.clone(), false, true);
    let got = take_bytes(&**heap, &r);
    t.check("read(decompress) round trip", got.as_deref() == Some(&body[..]), "content mismatch");

    // C4: incompressible write still round trips
    let noisy = format!("{}/noise.lz4", dir);
    let rnd = noise(8192, 0xC4);
    let w = match fs.alloc_copy(&rnd) {
        Ok(buf) => fs.write(&noisy, buf, true),
        Err(e) => return t.fail("alloc payload", &e.to_string()),
    };
    let r = fs.read(&noisy, heap.clone(), false, true);
    let got = take_bytes(&**heap, &r);
    t.check(
        "incompressible round trip",
        w.result() == 0 && got.as_deref() == Some(&rnd[..]),
        "content mismatch",
    );
}

// ════════════════════════════════════════════════════════════
// Part D: Failures
// ════════════════════════════════════════════════════════════

fn test_failures(t: &mut TestRunner, fs: &FileSystem, heap: &Arc<TrackedHeap>, dir: &str) {
    t.section("Part D: Failures");

    // D1: missing file
    let r = fs.read(&format!("{}/does-not-exist", dir), heap.clone(), true, false);
    r.wait();
    t.check(
        "missing file fails cleanly",
        r.result() != 0 && r.size() == 0 && r.take_buffer().is_none(),
        &format!("result {}", r.result()),
    );

    // D2: failed write hands back the original
    let body = pattern(4096);
    let w = match fs.alloc_copy(&body) {
        Ok(buf) => fs.write(&format!("{}/no/such/dir/x.lz4", dir), buf, true),
        Err(e) => return t.fail("alloc payload", &e.to_string()),
    };
    let back = w.take_buffer();
    t.check(
        "failed write returns original",
        w.result() != 0 && back.as_deref() == Some(&body[..]),
        &format!("result {}", w.result()),
    );
    if let Some(buf) = back {
        heap.free(buf);
    }

    // D3: invalid path never reaches a queue
    let r = fs.read("bad\0path", heap.clone(), false, false);
    t.check("NUL in path rejected", r.is_done() && r.result() == libc::EINVAL, &format!("result {}", r.result()));
}

// ════════════════════════════════════════════════════════════
// Part E: Load
// ════════════════════════════════════════════════════════════

fn test_load(t: &mut TestRunner, heap: &Arc<TrackedHeap>, dir: &str) {
    t.section("Part E: Load (queue capacity 1)");

    let config = FsConfig::default().queue_capacity(1).thread_name_prefix("afs-load");
    let fs = match FileSystem::new(config, heap.clone()) {
        Ok(fs) => fs,
        Err(e) => return t.fail("start file system", &e.to_string()),
    };

    const N: usize = 64;
    let start = Instant::now();
    let mut writes = Vec::with_capacity(N);
    for i in 0..N {
        match fs.alloc_copy(&pattern(16_384 + i)) {
            Ok(buf) => writes.push(fs.write_deferred(&format!("{}/load{}.lz4", dir, i), buf, true)),
            Err(e) => return t.fail("alloc payload", &e.to_string()),
        }
    }
    let ok = writes.iter().all(|w| w.result() == 0);
    t.check(&format!("{} deferred writes ({:?})", N, start.elapsed()), ok, "a write failed");

    let start = Instant::now();
    let reads: Vec<_> = (0..N)
        .map(|i| fs.read(&format!("{}/load{}.lz4", dir, i), heap.clone(), false, true))
        .collect();
    let ok = reads
        .iter()
        .enumerate()
        .all(|(i, r)| take_bytes(&**heap, r).as_deref() == Some(&pattern(16_384 + i)[..]));
    t.check(&format!("{} decompressing reads ({:?})", N, start.elapsed()), ok, "content mismatch");

    // Shutdown with jobs still queued
    let pending: Vec<_> = (0..N)
        .filter_map(|i| {
            let buf = fs.alloc_copy(&pattern(2048)).ok()?;
            Some(fs.write_deferred(&format!("{}/late{}.lz4", dir, i), buf, true))
        })
        .collect();
    fs.shutdown();
    t.check(
        "shutdown completes pending jobs",
        pending.iter().all(|w| w.is_done() && w.result() == 0),
        "a pending job was lost",
    );
}

// ════════════════════════════════════════════════════════════

fn main() {
    env_logger::init();
    println!("=== AFS End-to-End Smoke Test ===");

    let mut t = TestRunner::new();

    test_blocks(&mut t);

    let tmp = match tempfile::tempdir() {
        Ok(d) => d,
        Err(e) => {
            println!("\nFATAL: no scratch directory: {}", e);
            std::process::exit(1);
        }
    };
    let dir = tmp.path().to_string_lossy().into_owned();
    info!("scratch directory {}", dir);

    let heap = Arc::new(TrackedHeap::new("smoke"));
    let fs = match FileSystem::new(FsConfig::from_env(), heap.clone()) {
        Ok(fs) => fs,
        Err(e) => {
            println!("\nFATAL: FileSystem::new failed: {}", e);
            t.summary();
            std::process::exit(1);
        }
    };

    test_plain(&mut t, &fs, &heap, &dir);
    test_compression(&mut t, &fs, &heap, &dir);
    test_failures(&mut t, &fs, &heap, &dir);
    fs.shutdown();

    test_load(&mut t, &heap, &dir);

    t.section("Leak check");
    t.check(
        &format!("heap clean after {} allocations", heap.total_allocations()),
        heap.report_leaks() == 0,
        &format!("{} buffers live", heap.live_allocations()),
    );

    t.summary();
    std::process::exit(if t.failed > 0 { 1 } else { 0 });
}
