//! Argus - In-Process Telemetry Recorder Core
//!
//! Arsitektur:
//! - Lock-Free: producer append tanpa pernah menunggu flusher
//! - Portable Ordering: semua visibility antar-thread lewat satu layer
//!   barrier primitive, tanpa kode per-arsitektur di call site
//! - Pluggable Flush: write ke durable sink atau discard, frontier math
//!   sama persis
//! - Retirement satu arah: buffer disegel setelah drain terakhir, lalu
//!   didaur ulang pool

pub mod buffer;
pub mod error;
pub mod flush;
pub mod ordering;
pub mod sink;

pub use buffer::{EventBuffer, OwnerId};
pub use error::{FlushError, FlushResult, ProtocolError};
pub use flush::{
    acquire_exclusive, concurrent_write, concurrent_write_excluding_retired, discard,
    drain_and_retire, exclusive_write, mutexed_write, release_exclusive, try_acquire_exclusive,
    AcquireOutcome, BackgroundFlusher, DiscardPolicy, ExclusiveFlush, FlushMode, FlushPolicy,
    TryAcquire, WritePolicy,
};
pub use sink::{MemorySink, MmapSink, Sink};
