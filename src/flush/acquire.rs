//! Acquisition Protocol: exclusive ownership lewat CAS
//!
//! Ownership direbut dengan compare-and-swap non-blocking atas field
//! owner (unowned → requester). Protokol sadar retirement: buffer yang
//! retired tidak akan pernah dilepas siapa pun, jadi spin di atasnya
//! adalah livelock: setiap kegagalan CAS mengecek ulang flag retired
//! dan menyerah begitu flag terlihat.

use crate::buffer::{EventBuffer, OwnerId};
use crate::error::ProtocolError;

/// Hasil satu percobaan CAS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryAcquire {
    /// Ownership di tangan requester; wajib dilepas lewat
    /// [`release_exclusive`].
    Acquired,
    /// Owner lain sedang memegang; boleh dicoba lagi.
    Busy,
    /// Buffer sudah retired; tidak ada yang bisa direbut.
    Retired,
}

/// Hasil akhir protokol spinning: persis salah satu dari dua.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired,
    Retired,
}

/// Satu percobaan merebut exclusive ownership, tanpa menunggu.
pub fn try_acquire_exclusive(buffer: &EventBuffer, requester: OwnerId) -> TryAcquire {
    if buffer.is_retired() {
        return TryAcquire::Retired;
    }

    if buffer.try_claim(requester) {
        // Retirement bisa menang balapan di antara cek flag dan CAS
        // (owner lama retire lalu release). Ownership atas buffer mati
        // tidak berguna: lepaskan dan laporkan apa adanya.
        if buffer.is_retired() {
            let _ = buffer.release_claim(requester);
            return TryAcquire::Retired;
        }
        return TryAcquire::Acquired;
    }

    if buffer.is_retired() {
        TryAcquire::Retired
    } else {
        TryAcquire::Busy
    }
}

/// Spin sampai ownership direbut atau buffer terlihat retired.
///
/// Tidak ada timeout dan tidak ada backoff: durasi spin dibatasi oleh
/// panjang critical section owner saat ini, dan itu urusan tuning
/// pemanggil, bukan correctness protokol ini.
pub fn acquire_exclusive(buffer: &EventBuffer, requester: OwnerId) -> AcquireOutcome {
    loop {
        match try_acquire_exclusive(buffer, requester) {
            TryAcquire::Acquired => return AcquireOutcome::Acquired,
            TryAcquire::Retired => return AcquireOutcome::Retired,
            TryAcquire::Busy => std::hint::spin_loop(),
        }
    }
}

/// Lepaskan ownership yang dipegang `owner`.
///
/// Release oleh identity yang tidak memegang ownership adalah protocol
/// violation dan ditolak tanpa mengubah apa pun.
pub fn release_exclusive(buffer: &EventBuffer, owner: OwnerId) -> Result<(), ProtocolError> {
    buffer.release_claim(owner)
}
