//! Error types untuk recorder core
//!
//! Dua kelas error:
//! - Sink failure: recoverable. Frontier tidak maju, range yang sama
//!   bisa di-retry flush berikutnya
//! - Protocol violation: defect di pool logic pemanggil. Fatal di debug
//!   build (debug_assert), explicit error di release build

use thiserror::Error;

/// Pelanggaran protokol buffer. Bukan kondisi runtime yang recoverable;
/// munculnya error ini berarti bug di layer pool/scheduler.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer retired masih memegang unflushed bytes.
    #[error("retired buffer still holds unflushed bytes")]
    RetiredNotEmpty,
    /// Operasi yang mensyaratkan exclusive ownership dipanggil tanpa
    /// memegangnya.
    #[error("operation requires exclusive ownership")]
    NotOwned,
    /// Release oleh identity yang bukan pemegang ownership.
    #[error("release by a non-owner")]
    ForeignRelease,
    /// Flush frontier akan melewati write frontier.
    #[error("flush frontier would overrun the write frontier")]
    FrontierOverrun,
    /// Retire kedua kali pada buffer yang sudah retired.
    #[error("buffer already retired")]
    AlreadyRetired,
}

/// Error yang dipropagasikan operator flush ke pemanggil.
#[derive(Debug, Error)]
pub enum FlushError {
    /// Sink menolak write; unflushed region dibiarkan utuh untuk retry.
    #[error("sink write failed: {0}")]
    Sink(#[from] std::io::Error),
    /// Invariant buffer dilanggar oleh pemanggil.
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolError),
}

pub type FlushResult<T> = Result<T, FlushError>;
