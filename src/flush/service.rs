//! Background Flusher: periodic drain task
//!
//! Satu thread menguras sekumpulan buffer lewat operator concurrent
//! setiap interval. Per buffer hanya ada SATU flusher concurrent: itu
//! kontrak eksternal yang dibutuhkan operator lock-free, dan memegang
//! semua buffer di satu thread memenuhinya sekaligus.
//!
//! Sink gagal bukan alasan berhenti: frontier tidak maju, tick
//! berikutnya meng-retry range yang sama.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, trace, warn};

use crate::buffer::EventBuffer;
use crate::error::FlushError;
use crate::sink::Sink;

use super::operator::concurrent_write_excluding_retired;
use super::policy::WritePolicy;

/// Handle untuk flusher thread. `stop()` (atau drop) menghentikan loop,
/// menguras sisa unflushed bytes sekali lagi, lalu join.
pub struct BackgroundFlusher {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl BackgroundFlusher {
    /// Spawn flusher untuk `buffers` dengan `sink` sebagai tujuan write.
    ///
    /// Sink berpindah ke thread flusher; satu-satunya penulis sink
    /// adalah thread itu.
    pub fn start<S>(
        buffers: Vec<Arc<EventBuffer>>,
        sink: S,
        interval: Duration,
    ) -> io::Result<Self>
    where
        S: Sink + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("argus-flusher".to_string())
            .spawn(move || flush_loop(&buffers, sink, interval, &flag))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Hentikan loop, tunggu final sweep, dan kembalikan total bytes
    /// yang dikuras flusher ini seumur hidupnya.
    pub fn stop(mut self) -> u64 {
        self.running.store(false, Ordering::Relaxed);
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(total) => total,
                Err(_) => {
                    error!("flusher thread panicked");
                    0
                }
            },
            None => 0,
        }
    }
}

impl Drop for BackgroundFlusher {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn flush_loop<S: Sink>(
    buffers: &[Arc<EventBuffer>],
    sink: S,
    interval: Duration,
    running: &AtomicBool,
) -> u64 {
    let mut policy = WritePolicy::new(sink);
    let mut total: u64 = 0;

    debug!(buffers = buffers.len(), ?interval, "flusher started");

    while running.load(Ordering::Relaxed) {
        total += sweep(buffers, &mut policy);
        thread::sleep(interval);
    }

    // Final sweep: stop() tidak boleh meninggalkan unflushed bytes di
    // buffer yang masih hidup
    total += sweep(buffers, &mut policy);

    if let Err(e) = policy.sink_mut().sync() {
        warn!(error = %e, "final sink sync failed");
    }

    debug!(total_bytes = total, "flusher stopped");
    total
}

fn sweep<S: Sink>(buffers: &[Arc<EventBuffer>], policy: &mut WritePolicy<S>) -> u64 {
    let mut drained: u64 = 0;

    for buffer in buffers {
        match concurrent_write_excluding_retired(buffer, policy) {
            Ok(0) => {}
            Ok(n) => {
                trace!(bytes = n, "flushed");
                drained += n as u64;
            }
            Err(FlushError::Sink(e)) => {
                // Frontier tidak maju; tick berikutnya retry range sama
                warn!(error = %e, "sink write failed, range kept for retry");
            }
            Err(FlushError::Protocol(e)) => {
                // Defect di pool logic; jangan sentuh buffer ini lagi
                error!(error = %e, buffer = ?buffer, "protocol violation during flush");
            }
        }
    }

    drained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;

    #[test]
    fn test_flusher_drains_before_stopping() {
        let buffers: Vec<Arc<EventBuffer>> =
            (0..3).map(|_| Arc::new(EventBuffer::new(1024))).collect();

        for (i, buf) in buffers.iter().enumerate() {
            assert!(buf.append(&vec![i as u8; 100]));
        }

        let flusher = BackgroundFlusher::start(
            buffers.clone(),
            MemorySink::new(),
            Duration::from_millis(1),
        )
        .unwrap();

        // Final sweep menjamin drain walau stop dipanggil segera
        let total = flusher.stop();
        assert_eq!(total, 300);
        for buf in &buffers {
            assert_eq!(buf.concurrent_top(), buf.pos());
        }
    }

    #[test]
    fn test_flusher_skips_retired_buffers() {
        use crate::buffer::OwnerId;
        use crate::flush::{drain_and_retire, DiscardPolicy};

        let live = Arc::new(EventBuffer::new(256));
        let dead = Arc::new(EventBuffer::new(256));
        assert!(live.append(b"live data"));

        let mut discard = DiscardPolicy;
        drain_and_retire(&dead, &mut discard, OwnerId::new(42)).unwrap();

        let flusher = BackgroundFlusher::start(
            vec![Arc::clone(&live), Arc::clone(&dead)],
            MemorySink::new(),
            Duration::from_millis(1),
        )
        .unwrap();

        let total = flusher.stop();
        assert_eq!(total, 9);
        assert!(dead.is_retired());
    }
}
