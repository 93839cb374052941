//! Argus Showcase - latency check untuk primitive dan buffer core
//!
//! Bukan benchmark resmi (itu di benches/flush_bench.rs); ini smoke run
//! cepat yang dicetak ke stdout.

use std::sync::atomic::AtomicU64;
use std::time::Instant;

use argus::ordering::{self, StoreOrdering};
use argus::{concurrent_write, EventBuffer, MemorySink, WritePolicy};

fn main() {
    println!("🚀 Argus Telemetry Recorder - PoC v0.1");
    println!("======================================\n");

    // Latency Ordering Primitives
    benchmark_ordering();

    // Latency Append + Concurrent Flush
    benchmark_append_flush();

    println!("\n✅ All benchmarks complete!");
    println!("\nTo run the multi-producer demo: cargo run --release --bin recorder_demo");
}

fn benchmark_ordering() {
    println!("📊 Ordering Primitives Benchmark");
    println!("--------------------------------");

    const ITERATIONS: usize = 1_000_000;

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        ordering::release();
    }
    let release_ns = start.elapsed().as_nanos() as f64 / ITERATIONS as f64;

    let start = Instant::now();
    for _ in 0..ITERATIONS {
        ordering::fence();
    }
    let fence_ns = start.elapsed().as_nanos() as f64 / ITERATIONS as f64;

    let cell = AtomicU64::new(0);
    let start = Instant::now();
    for i in 0..ITERATIONS {
        ordering::ordered_store_u64(&cell, i as u64, StoreOrdering::Fenced);
    }
    let fenced_store_ns = start.elapsed().as_nanos() as f64 / ITERATIONS as f64;

    let start = Instant::now();
    for _ in 0..1000 {
        ordering::cross_modify_fence();
    }
    let xmod_ns = start.elapsed().as_nanos() as f64 / 1000.0;

    println!("  Operations: {}", ITERATIONS);
    println!("  release():            {:.2} ns/op", release_ns);
    println!("  fence():              {:.2} ns/op", fence_ns);
    println!("  ordered store u64:    {:.2} ns/op (fenced)", fenced_store_ns);
    println!(
        "  cross_modify_fence(): {:.2} ns/op ({})\n",
        xmod_ns,
        if ordering::sync_core_accelerated() {
            "membarrier sync-core"
        } else {
            "SeqCst fallback"
        }
    );
}

fn benchmark_append_flush() {
    println!("📊 Append + Concurrent Flush Benchmark");
    println!("--------------------------------------");

    const ITERATIONS: usize = 100_000;
    const RECORD_SIZE: usize = 64;

    let buffer = EventBuffer::new(ITERATIONS * RECORD_SIZE);
    let record = [0u8; RECORD_SIZE];

    // Latency append
    let start = Instant::now();
    for _ in 0..ITERATIONS {
        buffer.append(&record);
    }
    let append_duration = start.elapsed();

    // Satu sweep concurrent menguras semuanya
    let mut policy = WritePolicy::new(MemorySink::new());
    let start = Instant::now();
    let flushed = concurrent_write(&buffer, &mut policy).unwrap();
    let flush_duration = start.elapsed();

    let append_ns = append_duration.as_nanos() as f64 / ITERATIONS as f64;

    println!("  Record size: {} bytes", RECORD_SIZE);
    println!("  Operations: {}", ITERATIONS);
    println!(
        "  Append latency: {:.2} ns/op ({:.3} μs/op)",
        append_ns,
        append_ns / 1000.0
    );
    println!(
        "  Append throughput: {:.2} M records/sec",
        ITERATIONS as f64 / append_duration.as_secs_f64() / 1_000_000.0
    );
    println!(
        "  Flush: {} bytes in {:.2} μs ({:.2} MB/sec)",
        flushed,
        flush_duration.as_nanos() as f64 / 1000.0,
        flushed as f64 / flush_duration.as_secs_f64() / 1_000_000.0
    );
}
