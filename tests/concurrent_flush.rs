//! Concurrent Flush Stress Test
//!
//! Producer, concurrent flusher, dan jalur retirement jalan bersamaan
//! di thread asli; di akhir, pembukuan bytes harus bersih: tidak ada
//! yang hilang, tidak ada yang dobel.
//!
//! Usage:
//!   cargo test --release --test concurrent_flush

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use argus::{
    acquire_exclusive, concurrent_write_excluding_retired, drain_and_retire, release_exclusive,
    try_acquire_exclusive, AcquireOutcome, EventBuffer, MemorySink, OwnerId, TryAcquire,
    WritePolicy,
};

const RECORD_SIZE: usize = 64;
const RECORDS: usize = 20_000;

/// Record sintetis: seq di 8 bytes pertama, sisanya diisi byte seq
fn make_record(seq: u64) -> [u8; RECORD_SIZE] {
    let mut record = [seq as u8; RECORD_SIZE];
    record[..8].copy_from_slice(&seq.to_le_bytes());
    record
}

/// Pembukuan: total bytes yang diproses semua flush (concurrent + exclusive)
/// sama persis dengan total bytes yang pernah di-append, dan isinya
/// utuh berurutan.
#[test]
fn no_lost_or_duplicated_bytes_over_full_lifetime() {
    let buffer = Arc::new(EventBuffer::new(RECORDS * RECORD_SIZE));
    let done = Arc::new(AtomicBool::new(false));

    // Producer: append semua record, pace alami tanpa sleep
    let producer_buf = Arc::clone(&buffer);
    let producer = thread::spawn(move || {
        for seq in 0..RECORDS as u64 {
            assert!(producer_buf.append(&make_record(seq)), "buffer overflow");
        }
    });

    // Concurrent flusher: satu-satunya pihak yang memajukan
    // concurrent_top, sesuai kontrak satu flusher per buffer
    let flusher_buf = Arc::clone(&buffer);
    let flusher_done = Arc::clone(&done);
    let flusher = thread::spawn(move || {
        let mut policy = WritePolicy::new(MemorySink::new());
        while !flusher_done.load(Ordering::Relaxed) {
            concurrent_write_excluding_retired(&flusher_buf, &mut policy).unwrap();
        }
        policy.into_sink()
    });

    producer.join().unwrap();
    done.store(true, Ordering::Relaxed);
    let flushed = flusher.join().unwrap();

    // Teardown: drain terakhir + retire dalam satu exclusive section
    let mut tail_policy = WritePolicy::new(MemorySink::new());
    drain_and_retire(&buffer, &mut tail_policy, OwnerId::new(99)).unwrap();
    let tail = tail_policy.into_sink();

    let total_appended = RECORDS * RECORD_SIZE;
    assert_eq!(flushed.len() + tail.len(), total_appended);
    assert_eq!(buffer.processed(), total_appended as u64);
    assert!(buffer.is_retired());
    assert!(buffer.fully_flushed());

    // Byte stream gabungan harus identik dengan urutan append
    let mut stream = Vec::with_capacity(total_appended);
    stream.extend_from_slice(flushed.as_bytes());
    stream.extend_from_slice(tail.as_bytes());
    for seq in 0..RECORDS as u64 {
        let at = seq as usize * RECORD_SIZE;
        assert_eq!(
            &stream[at..at + 8],
            &seq.to_le_bytes(),
            "record {} corrupted or out of place",
            seq
        );
    }
}

/// Satu percobaan CAS: N thread mencoba bersamaan pada buffer
/// bebas: tepat satu Acquired, sisanya Busy, semua melihat
/// retired == false.
#[test]
fn single_cas_attempt_has_exactly_one_winner() {
    const THREADS: usize = 8;

    let buffer = Arc::new(EventBuffer::new(64));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let buffer = Arc::clone(&buffer);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let outcome = try_acquire_exclusive(&buffer, OwnerId::new(i as u64 + 1));
                assert!(!buffer.is_retired());
                outcome
            })
        })
        .collect();

    let outcomes: Vec<TryAcquire> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners = outcomes
        .iter()
        .filter(|o| **o == TryAcquire::Acquired)
        .count();
    let losers = outcomes.iter().filter(|o| **o == TryAcquire::Busy).count();
    assert_eq!(winners, 1);
    assert_eq!(losers, THREADS - 1);
}

/// Spinning: di bawah kontensi terus-menerus, ownership tetap
/// unik: tidak pernah ada dua thread di dalam critical section
/// bersamaan.
#[test]
fn spinning_acquisition_preserves_uniqueness() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 200;

    let buffer = Arc::new(EventBuffer::new(64));
    let in_section = Arc::new(AtomicUsize::new(0));
    let acquisitions = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let buffer = Arc::clone(&buffer);
            let in_section = Arc::clone(&in_section);
            let acquisitions = Arc::clone(&acquisitions);
            thread::spawn(move || {
                let me = OwnerId::new(i as u64 + 1);
                for _ in 0..ROUNDS {
                    assert_eq!(acquire_exclusive(&buffer, me), AcquireOutcome::Acquired);

                    // Critical section: harus sendirian di sini
                    assert_eq!(in_section.fetch_add(1, Ordering::SeqCst), 0);
                    acquisitions.fetch_add(1, Ordering::Relaxed);
                    assert_eq!(in_section.fetch_sub(1, Ordering::SeqCst), 1);

                    release_exclusive(&buffer, me).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(acquisitions.load(Ordering::Relaxed), THREADS * ROUNDS);
    assert_eq!(buffer.current_owner(), None);
}

/// Retirement di tengah kontensi: spinner tidak boleh livelock pada
/// buffer yang tidak akan pernah dilepas: semua harus menyerah dengan
/// Retired.
#[test]
fn spinners_abandon_when_buffer_retires() {
    const THREADS: usize = 4;

    let buffer = Arc::new(EventBuffer::new(64));
    let holder = OwnerId::new(1);
    assert_eq!(try_acquire_exclusive(&buffer, holder), TryAcquire::Acquired);

    let started = Arc::new(Barrier::new(THREADS + 1));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let buffer = Arc::clone(&buffer);
            let started = Arc::clone(&started);
            thread::spawn(move || {
                started.wait();
                acquire_exclusive(&buffer, OwnerId::new(i as u64 + 100))
            })
        })
        .collect();

    started.wait();
    // Buffer kosong: retire sah, lalu release membangunkan para spinner
    buffer.retire(holder).unwrap();
    release_exclusive(&buffer, holder).unwrap();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), AcquireOutcome::Retired);
    }
    assert_eq!(buffer.current_owner(), None);
}
