//! Cross-Modification Fence
//!
//! Fence data biasa TIDAK menjamin koherensi instruction cache: core yang
//! sedang mengeksekusi kode yang baru dimodifikasi (breakpoint patching,
//! deopt) bisa memakai instruksi basi dari pipeline-nya. Dibutuhkan
//! serializing operation khusus:
//! - Linux 4.16+: membarrier(PRIVATE_EXPEDITED_SYNC_CORE): kernel
//!   mengirim IPI yang men-serialize semua core dari proses ini
//! - Fallback: full SeqCst fence, serialization terbaik yang tersedia
//!   tanpa inline assembly

use std::sync::atomic::{fence, Ordering};

#[cfg(target_os = "linux")]
mod sys {
    use std::sync::atomic::{AtomicI32, Ordering};

    // Konstanta membarrier(2); libc belum mengekspos semuanya
    const MEMBARRIER_CMD_QUERY: libc::c_long = 0;
    const MEMBARRIER_CMD_PRIVATE_EXPEDITED_SYNC_CORE: libc::c_long = 1 << 5;
    const MEMBARRIER_CMD_REGISTER_PRIVATE_EXPEDITED_SYNC_CORE: libc::c_long = 1 << 6;

    const STATE_UNKNOWN: i32 = 0;
    const STATE_READY: i32 = 1;
    const STATE_UNAVAILABLE: i32 = 2;

    /// Hasil registrasi lazy; registrasi hanya dicoba sekali.
    static STATE: AtomicI32 = AtomicI32::new(STATE_UNKNOWN);

    #[inline]
    fn membarrier(cmd: libc::c_long) -> libc::c_long {
        // SAFETY: membarrier tidak menyentuh memory user-space
        unsafe { libc::syscall(libc::SYS_membarrier, cmd, 0 as libc::c_long, 0 as libc::c_long) }
    }

    fn register() -> bool {
        let supported = membarrier(MEMBARRIER_CMD_QUERY);
        if supported < 0 {
            return false;
        }
        if (supported & MEMBARRIER_CMD_PRIVATE_EXPEDITED_SYNC_CORE) == 0 {
            return false;
        }
        membarrier(MEMBARRIER_CMD_REGISTER_PRIVATE_EXPEDITED_SYNC_CORE) == 0
    }

    pub(super) fn sync_core() -> bool {
        match STATE.load(Ordering::Relaxed) {
            STATE_READY => membarrier(MEMBARRIER_CMD_PRIVATE_EXPEDITED_SYNC_CORE) == 0,
            STATE_UNAVAILABLE => false,
            _ => {
                let ready = register();
                STATE.store(
                    if ready { STATE_READY } else { STATE_UNAVAILABLE },
                    Ordering::Relaxed,
                );
                ready && membarrier(MEMBARRIER_CMD_PRIVATE_EXPEDITED_SYNC_CORE) == 0
            }
        }
    }

    pub(super) fn accelerated() -> bool {
        STATE.load(Ordering::Relaxed) == STATE_READY
    }
}

/// Membuang view basi atas instruksi executable di semua core proses ini.
///
/// Wajib dipanggil setelah memodifikasi kode yang mungkin sedang
/// dieksekusi thread lain, SEBELUM mempublikasikan entry point baru.
/// Ini bukan urusan data-memory ordering; [`super::fence`] saja tidak cukup.
#[inline]
pub fn cross_modify_fence() {
    #[cfg(target_os = "linux")]
    {
        if sys::sync_core() {
            return;
        }
    }
    fence(Ordering::SeqCst);
}

/// `true` kalau kernel menyediakan sync-core membarrier dan registrasi
/// berhasil; `false` berarti [`cross_modify_fence`] jatuh ke fallback.
#[cfg(target_os = "linux")]
#[inline]
pub fn sync_core_accelerated() -> bool {
    sys::accelerated()
}

/// `true` kalau kernel menyediakan sync-core membarrier dan registrasi
/// berhasil; `false` berarti [`cross_modify_fence`] jatuh ke fallback.
#[cfg(not(target_os = "linux"))]
#[inline]
pub fn sync_core_accelerated() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_modify_fence_does_not_crash() {
        // Jalan di kernel lama (fallback) maupun baru (sync-core)
        cross_modify_fence();
        cross_modify_fence();
    }

    #[test]
    fn test_accelerated_is_stable_after_first_call() {
        cross_modify_fence();
        let first = sync_core_accelerated();
        cross_modify_fence();
        assert_eq!(first, sync_core_accelerated());
    }
}
