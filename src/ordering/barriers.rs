//! Barrier Primitives dengan kontrak portable
//!
//! Semua visibility antar-thread di recorder core melewati fungsi-fungsi
//! di sini. Kontrak setiap barrier berlaku di semua arsitektur; encoding
//! per-arsitektur diturunkan dari [`PROFILE`], tidak pernah ditulis
//! inline di call site.

use std::sync::atomic;
use std::sync::atomic::Ordering;

/// Profil memory model hardware, dipilih saat compile time.
///
/// Strategy table di modul `store` dan cross-modify fence membaca profil
/// ini. Call site cukup memanggil primitive; profil yang menentukan
/// instruksi apa yang sebenarnya dipakai.
#[derive(Debug, Clone, Copy)]
pub struct ModelProfile {
    /// Plain aligned access sudah membawa acquire/release semantics
    /// (total-store-order seperti x86_64).
    pub ordered_plain_access: bool,
    /// Atomic exchange adalah fenced store termurah untuk data sempit
    /// (x86_64: `xchg` implicit lock, lebih murah dari `mov` + `mfence`).
    pub exchange_is_cheap_fenced_store: bool,
    /// OS diharapkan menyediakan serializing operation untuk
    /// cross-modification (Linux membarrier sync-core).
    pub sync_core_expected: bool,
}

#[cfg(target_arch = "x86_64")]
pub const PROFILE: ModelProfile = ModelProfile {
    ordered_plain_access: true,
    exchange_is_cheap_fenced_store: true,
    sync_core_expected: cfg!(target_os = "linux"),
};

#[cfg(not(target_arch = "x86_64"))]
pub const PROFILE: ModelProfile = ModelProfile {
    ordered_plain_access: false,
    exchange_is_cheap_fenced_store: false,
    sync_core_expected: cfg!(target_os = "linux"),
};

/// Full two-way barrier.
///
/// Tidak ada operasi memory sebelum fence yang boleh terlihat sesudahnya,
/// dan sebaliknya. Satu-satunya primitive yang memberi store→load
/// ordering; paling mahal, pakai hanya kalau memang perlu.
#[inline(always)]
pub fn fence() {
    atomic::fence(Ordering::SeqCst);
}

/// One-way barrier: operasi SESUDAH acquire tidak boleh naik ke atasnya.
///
/// Dipanggil tepat setelah membaca published flag/pointer supaya semua
/// read berikutnya melihat data yang mendahului publish tersebut.
#[inline(always)]
pub fn acquire() {
    atomic::fence(Ordering::Acquire);
}

/// One-way barrier: operasi SEBELUM release tidak boleh turun ke bawahnya.
///
/// Dipanggil tepat sebelum menulis published flag/pointer supaya semua
/// write sebelumnya terlihat oleh thread yang acquire pada publish itu.
#[inline(always)]
pub fn release() {
    atomic::fence(Ordering::Release);
}

/// Melarang reorder load→load saja.
///
/// Acquire fence melarang load→load dan load→store; itu encoding
/// termurah yang sound di memory model Rust.
#[inline(always)]
pub fn loadload() {
    atomic::fence(Ordering::Acquire);
}

/// Melarang reorder store→store saja (release fence: store→store dan
/// load→store).
#[inline(always)]
pub fn storestore() {
    atomic::fence(Ordering::Release);
}

/// Melarang reorder load→store saja (acquire fence sudah mencakupnya).
#[inline(always)]
pub fn loadstore() {
    atomic::fence(Ordering::Acquire);
}

/// Barrier yang bisa dipilih secara deklaratif di [`ScopePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Barrier {
    None,
    Acquire,
    Release,
    Full,
}

impl Barrier {
    #[inline(always)]
    fn emit(self) {
        match self {
            Barrier::None => {}
            Barrier::Acquire => acquire(),
            Barrier::Release => release(),
            Barrier::Full => fence(),
        }
    }
}

/// Kebijakan "barrier sebelum, kerjakan, barrier sesudah".
///
/// Pasangan (prefix, postfix) untuk tiap jenis operasi dideklarasikan
/// sekali sebagai const, tidak ditulis tangan per pemakaian.
#[derive(Debug, Clone, Copy)]
pub struct ScopePolicy {
    pub before: Barrier,
    pub after: Barrier,
}

/// Publikasi frontier oleh producer: release sebelum store `pos`,
/// tanpa barrier sesudahnya.
pub const PUBLISH_SCOPE: ScopePolicy = ScopePolicy {
    before: Barrier::Release,
    after: Barrier::None,
};

/// Penulisan flag retirement: release sebelum store, full fence
/// sesudahnya (flag harus terlihat sebelum load frontier berikutnya).
pub const RETIRE_SCOPE: ScopePolicy = ScopePolicy {
    before: Barrier::Release,
    after: Barrier::Full,
};

/// Guard ber-scope untuk [`ScopePolicy`].
///
/// Constructor mengeluarkan barrier prefix; `Drop` mengeluarkan barrier
/// postfix di semua exit path, termasuk early return.
#[must_use = "scope tanpa binding langsung drop, barrier prefix/postfix jadi berdempetan"]
pub struct OrderedScope {
    after: Barrier,
}

impl OrderedScope {
    #[inline(always)]
    pub fn enter(policy: ScopePolicy) -> Self {
        policy.before.emit();
        Self {
            after: policy.after,
        }
    }
}

impl Drop for OrderedScope {
    #[inline(always)]
    fn drop(&mut self) {
        self.after.emit();
    }
}
