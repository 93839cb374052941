//! Event Buffer dengan tiga frontier monotonic
//!
//! Layout state:
//! ┌─────────────────────────────────────────────────────┐
//! │ 0 ─── top/concurrent_top ─── pos ─── capacity       │
//! │        (sudah di-flush)  (unflushed)  (kosong)      │
//! └─────────────────────────────────────────────────────┘
//!
//! `pos` hanya dimajukan oleh producer pemilik buffer; `top` hanya oleh
//! pemegang exclusive ownership; `concurrent_top` oleh maksimal satu
//! concurrent flusher (kontrak eksternal dari pool). Semua visibility
//! antar-thread lewat layer ordering.

use std::cell::UnsafeCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};

use crate::error::ProtocolError;
use crate::ordering::{
    acquire, ordered_store_u8, storestore, OrderedScope, StoreOrdering, PUBLISH_SCOPE,
};

/// Padding untuk cache line isolation (64 bytes pada x86-64)
#[repr(C, align(64))]
struct CacheLinePadded<T> {
    value: T,
}

impl<T> CacheLinePadded<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

/// Identity eksplisit dari thread yang meminta exclusive ownership.
///
/// Selalu dioper sebagai parameter, tidak pernah diambil dari ambient
/// state. Nol dipakai sebagai sentinel "unowned" di field owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    /// # Panics
    /// Panic kalau `raw == 0` (nol adalah sentinel unowned).
    pub fn new(raw: u64) -> Self {
        assert!(raw != 0, "OwnerId must be non-zero");
        Self(raw)
    }

    #[inline(always)]
    pub fn raw(self) -> u64 {
        self.0
    }
}

const UNOWNED: u64 = 0;

/// Buffer event per-thread dengan flush protocol lock-free.
///
/// Satu producer menulis lewat [`append`](Self::append); background
/// flusher menguras lewat operator di [`crate::flush`]; retirement
/// menyegel buffer setelah drain terakhir.
pub struct EventBuffer {
    // Producer side - cache line sendiri supaya store pos tidak
    // false-sharing dengan frontier flusher
    pos: CacheLinePadded<AtomicUsize>,
    // Concurrent flusher side
    concurrent_top: CacheLinePadded<AtomicUsize>,
    // Frontier exclusive; akses diserialisasi oleh ownership CAS
    top: AtomicUsize,
    // 0 = unowned, selain itu OwnerId pemegang exclusive ownership
    owner: AtomicU64,
    // One-way flag: 0 = hidup, 1 = retired
    retired: AtomicU8,
    // Akumulasi bytes yang diproses policy; diagnostik, bukan correctness
    processed: AtomicU64,
    capacity: usize,
    data: Box<[UnsafeCell<u8>]>,
}

// SAFETY: EventBuffer aman untuk Send/Sync karena:
// - Region [pos, capacity) hanya ditulis producer tunggal dan belum
//   dipublikasikan ke reader manapun
// - Region [0, pos) immutable setelah store pos yang dipublikasikan
//   dengan release barrier
// - Semua field state adalah atomic
unsafe impl Send for EventBuffer {}
unsafe impl Sync for EventBuffer {}

impl EventBuffer {
    /// Membuat buffer bebas: unowned, belum retired, semua frontier 0.
    ///
    /// Alokasi hanya sekali di sini; tidak ada alokasi di hot path.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be non-zero");

        let mut data = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            data.push(UnsafeCell::new(0u8));
        }

        Self {
            pos: CacheLinePadded::new(AtomicUsize::new(0)),
            concurrent_top: CacheLinePadded::new(AtomicUsize::new(0)),
            top: AtomicUsize::new(0),
            owner: AtomicU64::new(UNOWNED),
            retired: AtomicU8::new(0),
            processed: AtomicU64::new(0),
            capacity,
            data: data.into_boxed_slice(),
        }
    }

    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Write frontier apa adanya (tanpa barrier). Cukup untuk pembacaan
    /// dari thread producer sendiri atau untuk diagnostik.
    #[inline(always)]
    pub fn pos(&self) -> usize {
        self.pos.value.load(Ordering::Relaxed)
    }

    /// Snapshot `pos` dengan acquire barrier.
    ///
    /// Pair dengan release barrier di [`append`](Self::append): semua
    /// bytes di bawah snapshot dijamin sudah lengkap ditulis.
    #[inline(always)]
    pub fn acquired_pos(&self) -> usize {
        let pos = self.pos.value.load(Ordering::Relaxed);
        acquire();
        pos
    }

    #[inline(always)]
    pub fn top(&self) -> usize {
        self.top.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn concurrent_top(&self) -> usize {
        self.concurrent_top.value.load(Ordering::Relaxed)
    }

    /// Akumulasi bytes yang pernah diproses FlushPolicy (write maupun
    /// discard).
    #[inline(always)]
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire) != 0
    }

    /// Pemegang exclusive ownership saat ini, kalau ada.
    #[inline(always)]
    pub fn current_owner(&self) -> Option<OwnerId> {
        match self.owner.load(Ordering::Relaxed) {
            UNOWNED => None,
            raw => Some(OwnerId(raw)),
        }
    }

    /// `true` kalau tidak ada unflushed bytes tersisa.
    #[inline(always)]
    pub fn fully_flushed(&self) -> bool {
        let pos = self.pos.value.load(Ordering::Relaxed);
        self.top.load(Ordering::Relaxed) == pos
            && self.concurrent_top.value.load(Ordering::Relaxed) == pos
    }

    /// Append satu record mentah ke buffer.
    ///
    /// HANYA boleh dipanggil oleh producer pemilik buffer (kontrak
    /// eksternal dari pool: satu producer per buffer). Returns `false`
    /// kalau record tidak muat; keputusan rotate/discard ada di pool.
    #[inline(always)]
    pub fn append(&self, record: &[u8]) -> bool {
        if record.is_empty() {
            return true;
        }

        let pos = self.pos.value.load(Ordering::Relaxed);
        if pos + record.len() > self.capacity {
            return false;
        }

        // SAFETY: region [pos, pos+len) belum dipublikasikan; tidak ada
        // reader yang menyentuhnya sebelum store pos di bawah
        unsafe {
            std::ptr::copy_nonoverlapping(record.as_ptr(), self.data[pos].get(), record.len());
        }

        // Publish: release dulu supaya flusher yang acquire snapshot
        // pos melihat bytes lengkap di bawah snapshot itu
        let _publish = OrderedScope::enter(PUBLISH_SCOPE);
        self.pos.value.store(pos + record.len(), Ordering::Relaxed);
        true
    }

    /// Slice unflushed region `[start, start + len)`.
    ///
    /// # Safety
    /// `start + len` tidak boleh melewati snapshot
    /// [`acquired_pos`](Self::acquired_pos) yang diambil pemanggil;
    /// region di bawah snapshot itu immutable.
    #[inline(always)]
    pub(crate) unsafe fn flushable_slice(&self, start: usize, len: usize) -> &[u8] {
        debug_assert!(start + len <= self.capacity);
        std::slice::from_raw_parts(self.data.as_ptr().add(start) as *const u8, len)
    }

    /// Majukan frontier concurrent sebesar bytes yang benar-benar
    /// diproses, bukan lompat absolut ke `pos`: producer bisa saja
    /// sudah maju lagi di tengah flush.
    #[inline(always)]
    pub(crate) fn advance_concurrent_top(&self, delta: usize) {
        let frontier = self.concurrent_top.value.load(Ordering::Relaxed);
        debug_assert!(
            frontier + delta <= self.pos.value.load(Ordering::Relaxed),
            "concurrent_top would overrun pos"
        );
        // Hasil pemrosesan harus tercatat sebelum frontier terlihat maju
        storestore();
        self.concurrent_top.value.store(frontier + delta, Ordering::Relaxed);
    }

    /// Set absolut `top` ke snapshot `pos`. Hanya sah di bawah exclusive
    /// ownership (tidak ada owner lain yang bisa jalan bersamaan, jadi
    /// absolute set setara dengan advance-by-delta).
    #[inline(always)]
    pub(crate) fn set_top(&self, to: usize) {
        debug_assert!(
            to >= self.top.load(Ordering::Relaxed),
            "top is monotonic, must never move backwards"
        );
        debug_assert!(
            to <= self.pos.value.load(Ordering::Relaxed),
            "top would overrun pos"
        );
        // Akses diserialisasi oleh ownership CAS; cukup relaxed
        self.top.store(to, Ordering::Relaxed);
    }

    /// Naikkan `top` sampai sejajar `concurrent_top`.
    ///
    /// Dipanggil tepat setelah exclusive acquisition: bytes yang sudah
    /// dikuras concurrent flusher tidak boleh di-flush ulang oleh jalur
    /// mutexed, jadi frontier exclusive mulai dari yang terjauh.
    #[inline(always)]
    pub(crate) fn promote_top(&self) {
        let frontier = self.concurrent_top.value.load(Ordering::Relaxed);
        // Pair dengan storestore di advance_concurrent_top: hasil kuras
        // flusher sebelumnya harus terlihat sebelum frontier naik
        acquire();
        if frontier > self.top.load(Ordering::Relaxed) {
            self.top.store(frontier, Ordering::Relaxed);
        }
    }

    /// Samakan `concurrent_top` dengan `pos` di jalur retirement. Hanya
    /// sah di bawah exclusive ownership setelah flush terakhir.
    #[inline(always)]
    pub(crate) fn seal_concurrent_top(&self, to: usize) {
        debug_assert!(to >= self.concurrent_top.value.load(Ordering::Relaxed));
        debug_assert!(to <= self.pos.value.load(Ordering::Relaxed));
        storestore();
        self.concurrent_top.value.store(to, Ordering::Relaxed);
    }

    /// Catat bytes yang diproses sebuah FlushPolicy.
    #[inline(always)]
    pub fn add_processed(&self, bytes: u64) {
        self.processed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Satu percobaan CAS merebut ownership (unowned → requester).
    #[inline(always)]
    pub(crate) fn try_claim(&self, requester: OwnerId) -> bool {
        self.owner
            .compare_exchange(UNOWNED, requester.0, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Lepaskan ownership yang dipegang `owner`.
    pub(crate) fn release_claim(&self, owner: OwnerId) -> Result<(), ProtocolError> {
        match self
            .owner
            .compare_exchange(owner.0, UNOWNED, Ordering::Release, Ordering::Relaxed)
        {
            Ok(_) => Ok(()),
            Err(_) => Err(ProtocolError::ForeignRelease),
        }
    }

    /// Segel buffer. Mensyaratkan exclusive ownership dan buffer yang
    /// sudah terkuras penuh (`top == pos == concurrent_top`); flag
    /// retired satu arah, tidak pernah kembali.
    pub fn retire(&self, owner: OwnerId) -> Result<(), ProtocolError> {
        if self.current_owner() != Some(owner) {
            return Err(ProtocolError::NotOwned);
        }
        if self.is_retired() {
            return Err(ProtocolError::AlreadyRetired);
        }
        if !self.fully_flushed() {
            return Err(ProtocolError::RetiredNotEmpty);
        }

        // Fenced store: flag harus terlihat sebelum load frontier
        // berikutnya dari thread manapun (store→load ordering)
        ordered_store_u8(&self.retired, 1, StoreOrdering::Fenced);
        Ok(())
    }
}

impl fmt::Debug for EventBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBuffer")
            .field("capacity", &self.capacity)
            .field("pos", &self.pos())
            .field("top", &self.top())
            .field("concurrent_top", &self.concurrent_top())
            .field("owner", &self.current_owner())
            .field("retired", &self.is_retired())
            .field("processed", &self.processed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_free() {
        let buf = EventBuffer::new(1024);
        assert_eq!(buf.pos(), 0);
        assert_eq!(buf.top(), 0);
        assert_eq!(buf.concurrent_top(), 0);
        assert_eq!(buf.current_owner(), None);
        assert!(!buf.is_retired());
        assert!(buf.fully_flushed());
    }

    #[test]
    fn test_append_advances_pos() {
        let buf = EventBuffer::new(64);
        assert!(buf.append(b"hello"));
        assert_eq!(buf.pos(), 5);
        assert!(buf.append(b"world"));
        assert_eq!(buf.pos(), 10);

        let data = unsafe { buf.flushable_slice(0, 10) };
        assert_eq!(data, b"helloworld");
    }

    #[test]
    fn test_append_rejects_overflow() {
        let buf = EventBuffer::new(8);
        assert!(buf.append(b"12345678"));
        assert!(!buf.append(b"x"));
        assert_eq!(buf.pos(), 8);
    }

    #[test]
    fn test_empty_append_is_noop() {
        let buf = EventBuffer::new(4);
        assert!(buf.append(b"1234"));
        // pos == capacity; append kosong tetap sukses tanpa menyentuh data
        assert!(buf.append(b""));
        assert_eq!(buf.pos(), 4);
    }

    #[test]
    fn test_retire_requires_ownership() {
        let buf = EventBuffer::new(16);
        let me = OwnerId::new(7);
        assert_eq!(buf.retire(me), Err(ProtocolError::NotOwned));
    }

    #[test]
    fn test_retire_rejects_unflushed_bytes() {
        let buf = EventBuffer::new(16);
        let me = OwnerId::new(7);
        buf.append(b"data");
        assert!(buf.try_claim(me));
        assert_eq!(buf.retire(me), Err(ProtocolError::RetiredNotEmpty));
    }

    #[test]
    fn test_retire_is_one_way() {
        let buf = EventBuffer::new(16);
        let me = OwnerId::new(7);
        assert!(buf.try_claim(me));
        assert_eq!(buf.retire(me), Ok(()));
        assert!(buf.is_retired());
        assert_eq!(buf.retire(me), Err(ProtocolError::AlreadyRetired));
    }

    #[test]
    fn test_release_by_non_owner_is_rejected() {
        let buf = EventBuffer::new(16);
        assert!(buf.try_claim(OwnerId::new(1)));
        assert_eq!(
            buf.release_claim(OwnerId::new(2)),
            Err(ProtocolError::ForeignRelease)
        );
        assert_eq!(buf.release_claim(OwnerId::new(1)), Ok(()));
        assert_eq!(buf.current_owner(), None);
    }

    #[test]
    #[should_panic]
    fn test_owner_id_zero_is_invalid() {
        let _ = OwnerId::new(0);
    }
}
