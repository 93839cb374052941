//! Sink module: Durable Sink untuk Flush Policy
//!
//! Recorder core tidak peduli format file atau wire protocol; kontrak
//! sink hanya "append bytes, bilang sukses atau gagal". Kegagalan sink
//! dipropagasikan operator tanpa memajukan frontier, jadi range yang
//! sama bisa di-retry.

mod mmap_sink;

use std::io;

pub use mmap_sink::MmapSink;

/// Tujuan durable untuk unflushed bytes.
pub trait Sink {
    /// Append seluruh `data` ke sink. All-or-nothing: kalau gagal, tidak
    /// ada byte yang dianggap tertulis.
    fn append(&mut self, data: &[u8]) -> io::Result<()>;

    /// Paksa data yang sudah di-append sampai ke storage.
    fn sync(&mut self) -> io::Result<()>;
}

/// Sink in-memory untuk test dan demo. Tumbuh tanpa batas.
#[derive(Debug, Default)]
pub struct MemorySink {
    data: Vec<u8>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Buang isi yang sudah terkumpul (dipakai bench supaya sink tidak
    /// tumbuh tanpa batas).
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

impl Sink for MemorySink {
    fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}
