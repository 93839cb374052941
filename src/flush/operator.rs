//! Flush Operator: frontier math + policy application
//!
//! Semua operator memakai pola yang sama:
//! `unflushed = pos − frontier`, no-op kalau nol, kalau tidak terapkan
//! policy ke `[frontier, frontier + unflushed)` lalu majukan frontier.
//!
//! Mode concurrent memajukan frontier sebesar BYTES YANG DIPROSES, bukan
//! set absolut ke `pos`: producer bisa sudah maju lagi di tengah flush,
//! dan lompatan absolut akan menelan bytes yang belum pernah dilihat
//! policy. Mode mutexed boleh set absolut: tidak ada owner lain yang
//! jalan bersamaan, jadi delta dan absolut setara.

use crate::buffer::{EventBuffer, OwnerId};
use crate::error::{FlushResult, ProtocolError};

use super::acquire::{acquire_exclusive, release_exclusive, AcquireOutcome};
use super::policy::{DiscardPolicy, FlushPolicy};

/// Frontier mana yang dipakai operator discard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// `concurrent_top`, tanpa mutual exclusion terhadap producer.
    Concurrent,
    /// `top`, pemanggil wajib sudah memegang exclusive ownership.
    Mutexed,
}

/// Hasil operator exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusiveFlush {
    /// Ownership direbut dan flush jalan; pemanggil WAJIB melepas
    /// ownership lewat [`release_exclusive`].
    Flushed(usize),
    /// Buffer sudah retired; tidak ada yang direbut, tidak ada yang
    /// perlu dilepas.
    AlreadyRetired,
}

/// Flush lock-free terhadap `concurrent_top`.
///
/// Jalan tanpa mutual exclusion terhadap producer. Sound karena `pos`
/// hanya pernah naik, dan bytes di bawah snapshot
/// [`acquired_pos`](EventBuffer::acquired_pos) dijamin lengkap (release
/// di producer berpasangan dengan acquire di sini).
pub fn concurrent_write<P: FlushPolicy>(
    buffer: &EventBuffer,
    policy: &mut P,
) -> FlushResult<usize> {
    let pos = buffer.acquired_pos();
    let frontier = buffer.concurrent_top();

    if frontier > pos {
        debug_assert!(false, "concurrent_top ahead of pos");
        return Err(ProtocolError::FrontierOverrun.into());
    }

    let unflushed = pos - frontier;
    if unflushed == 0 {
        return Ok(0);
    }

    // SAFETY: range berakhir di snapshot acquired pos; region immutable
    let data = unsafe { buffer.flushable_slice(frontier, unflushed) };

    // Sink gagal → return di sini, frontier tidak disentuh (retry nanti)
    let processed = policy.apply(buffer, data)?;
    debug_assert!(processed == unflushed);

    buffer.advance_concurrent_top(processed);
    Ok(processed)
}

/// Seperti [`concurrent_write`], tapi berhenti total pada buffer retired.
///
/// Buffer retired wajib sudah kosong; background flusher tidak boleh
/// balapan dengan flush terakhir jalur retirement, jadi di sini tidak
/// ada frontier maupun policy yang disentuh.
pub fn concurrent_write_excluding_retired<P: FlushPolicy>(
    buffer: &EventBuffer,
    policy: &mut P,
) -> FlushResult<usize> {
    if buffer.is_retired() {
        if !buffer.fully_flushed() {
            debug_assert!(false, "retired buffer still holds unflushed bytes");
            return Err(ProtocolError::RetiredNotEmpty.into());
        }
        return Ok(0);
    }

    concurrent_write(buffer, policy)
}

/// Flush terhadap `top`; pemanggil sudah memegang exclusive ownership.
///
/// Tidak ada locking internal. Karena tidak ada owner lain yang bisa
/// jalan bersamaan, `top` boleh di-set absolut ke snapshot `pos`.
pub fn mutexed_write<P: FlushPolicy>(buffer: &EventBuffer, policy: &mut P) -> FlushResult<usize> {
    if buffer.current_owner().is_none() {
        return Err(ProtocolError::NotOwned.into());
    }

    let pos = buffer.acquired_pos();
    let frontier = buffer.top();

    if frontier > pos {
        debug_assert!(false, "top ahead of pos");
        return Err(ProtocolError::FrontierOverrun.into());
    }

    let unflushed = pos - frontier;
    if unflushed == 0 {
        return Ok(0);
    }

    // SAFETY: range berakhir di snapshot acquired pos
    let data = unsafe { buffer.flushable_slice(frontier, unflushed) };

    let processed = policy.apply(buffer, data)?;
    debug_assert!(processed == unflushed);

    buffer.set_top(pos);
    Ok(processed)
}

/// Rebut ownership lalu flush mutexed.
///
/// Ownership TIDAK dilepas di sini: satu critical section bisa memuat
/// beberapa operasi (flush lalu retire). Kontrak: kalau hasilnya bukan
/// `AlreadyRetired` (termasuk `Err` dari policy), ownership sudah
/// dipegang `requester` dan wajib dilepas lewat [`release_exclusive`].
pub fn exclusive_write<P: FlushPolicy>(
    buffer: &EventBuffer,
    policy: &mut P,
    requester: OwnerId,
) -> FlushResult<ExclusiveFlush> {
    match acquire_exclusive(buffer, requester) {
        AcquireOutcome::Retired => Ok(ExclusiveFlush::AlreadyRetired),
        AcquireOutcome::Acquired => {
            // Frontier exclusive mulai dari titik terjauh yang sudah
            // dikuras concurrent flusher; tanpa ini bytes yang sama
            // ter-flush dua kali
            buffer.promote_top();

            let processed = mutexed_write(buffer, policy)?;

            // Sejajarkan frontier concurrent supaya flusher yang lanjut
            // setelah section ini tidak mengulang range yang sama
            buffer.seal_concurrent_top(buffer.top());
            Ok(ExclusiveFlush::Flushed(processed))
        }
    }
}

/// Buang unflushed region lewat [`DiscardPolicy`]; sink tidak disentuh.
pub fn discard(buffer: &EventBuffer, mode: FlushMode) -> FlushResult<usize> {
    let mut policy = DiscardPolicy;
    match mode {
        FlushMode::Concurrent => concurrent_write(buffer, &mut policy),
        FlushMode::Mutexed => mutexed_write(buffer, &mut policy),
    }
}

/// Jalur retirement lengkap dalam satu exclusive section:
/// acquire → flush terakhir sampai `pos` → segel frontier → retire →
/// release. Returns bytes yang dikuras flush terakhir; `Ok(0)` juga
/// untuk buffer yang ternyata sudah retired.
pub fn drain_and_retire<P: FlushPolicy>(
    buffer: &EventBuffer,
    policy: &mut P,
    requester: OwnerId,
) -> FlushResult<usize> {
    match exclusive_write(buffer, policy, requester) {
        Ok(ExclusiveFlush::AlreadyRetired) => Ok(0),
        Ok(ExclusiveFlush::Flushed(processed)) => {
            let retired = buffer.retire(requester);
            release_exclusive(buffer, requester)?;
            retired?;
            Ok(processed)
        }
        Err(e) => {
            // Policy gagal setelah acquisition; ownership tetap harus
            // dilepas supaya retry berikutnya tidak livelock
            let _ = release_exclusive(buffer, requester);
            Err(e)
        }
    }
}
