//! Flush Policy: apa yang terjadi pada unflushed bytes
//!
//! Dua varian: tulis ke durable sink, atau buang (backpressure /
//! shutdown tanpa persistence). Keduanya menambah counter `processed`
//! buffer supaya loss tetap terukur.

use crate::buffer::EventBuffer;
use crate::error::FlushResult;
use crate::sink::Sink;

/// Perilaku pluggable yang diterapkan operator ke satu byte range.
///
/// Kontrak: return `Ok(bytes)` dengan `bytes == data.len()` dan tambah
/// `processed` buffer kalau sukses; return `Err` TANPA side effect pada
/// buffer kalau gagal (operator tidak akan memajukan frontier).
pub trait FlushPolicy {
    fn apply(&mut self, buffer: &EventBuffer, data: &[u8]) -> FlushResult<usize>;
}

/// Append unflushed bytes ke durable sink. Gagal hanya kalau sink gagal.
pub struct WritePolicy<S: Sink> {
    sink: S,
}

impl<S: Sink> WritePolicy<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: Sink> FlushPolicy for WritePolicy<S> {
    #[inline(always)]
    fn apply(&mut self, buffer: &EventBuffer, data: &[u8]) -> FlushResult<usize> {
        self.sink.append(data)?;
        buffer.add_processed(data.len() as u64);
        Ok(data.len())
    }
}

/// Buang unflushed bytes. Selalu sukses; tetap tercatat di `processed`
/// supaya metrik loss bisa dihitung dari selisih dengan sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardPolicy;

impl FlushPolicy for DiscardPolicy {
    #[inline(always)]
    fn apply(&mut self, buffer: &EventBuffer, data: &[u8]) -> FlushResult<usize> {
        buffer.add_processed(data.len() as u64);
        Ok(data.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use std::io;

    /// Sink yang selalu menolak, untuk menguji jalur kegagalan.
    struct FailingSink;

    impl Sink for FailingSink {
        fn append(&mut self, _data: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "injected failure"))
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_policy_accounts_processed() {
        let buf = EventBuffer::new(64);
        let mut policy = WritePolicy::new(MemorySink::new());

        let n = policy.apply(&buf, b"abcdef").unwrap();
        assert_eq!(n, 6);
        assert_eq!(buf.processed(), 6);
        assert_eq!(policy.sink().as_bytes(), b"abcdef");
    }

    #[test]
    fn test_write_policy_failure_has_no_side_effect() {
        let buf = EventBuffer::new(64);
        let mut policy = WritePolicy::new(FailingSink);

        assert!(policy.apply(&buf, b"abcdef").is_err());
        assert_eq!(buf.processed(), 0);
    }

    #[test]
    fn test_discard_policy_always_succeeds() {
        let buf = EventBuffer::new(64);
        let mut policy = DiscardPolicy;

        let n = policy.apply(&buf, b"dropped").unwrap();
        assert_eq!(n, 7);
        assert_eq!(buf.processed(), 7);
    }
}
