use crate::error::Result;

/// Pull-based source of typed records.
///
/// `read` produces at most one record per call, in source order, and returns
/// `Ok(None)` once the underlying stream is exhausted. A row-scoped error
/// does not consume the stream: the next call continues with the following
/// record.
pub trait ItemReader<T> {
    fn read(&self) -> Result<Option<T>>;
}

/// Sink of typed records.
///
/// `write` serializes one record; nothing is guaranteed to reach the
/// underlying sink until `flush` returns.
pub trait ItemWriter<T> {
    fn write(&self, item: &T) -> Result<()>;
    fn flush(&self) -> Result<()>;
}
