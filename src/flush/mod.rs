//! Flush module: Drain Protocol untuk Event Buffer
//!
//! Prinsip desain:
//! - Operator menghitung unflushed region lalu menyerahkannya ke policy;
//!   frontier maju HANYA sebesar bytes yang benar-benar diproses
//! - Sink gagal → frontier diam, range yang sama di-retry nanti
//! - Mode concurrent tidak pernah menahan producer; mode exclusive
//!   merebut ownership lewat CAS yang sadar retirement

mod acquire;
mod operator;
mod policy;
mod service;

pub use acquire::{
    acquire_exclusive, release_exclusive, try_acquire_exclusive, AcquireOutcome, TryAcquire,
};
pub use operator::{
    concurrent_write, concurrent_write_excluding_retired, discard, drain_and_retire,
    exclusive_write, mutexed_write, ExclusiveFlush, FlushMode,
};
pub use policy::{DiscardPolicy, FlushPolicy, WritePolicy};
pub use service::BackgroundFlusher;
