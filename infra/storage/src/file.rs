use crate::attributes::Attributes;
use crate::error::{Result, StorageErrorExt};
use async_trait::async_trait;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

/// Byte stream backing an opened [`File`].
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// An opened, readable object.
///
/// The caller owns the stream; dropping it releases the underlying resource
/// without touching the stored object.
pub struct File {
    reader: ByteStream,
    attributes: Attributes,
}

impl File {
    #[must_use]
    pub fn new(reader: ByteStream, attributes: Attributes) -> Self {
        Self { reader, attributes }
    }

    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    #[must_use]
    pub fn into_parts(self) -> (ByteStream, Attributes) {
        (self.reader, self.attributes)
    }

    /// Drains the stream into memory.
    ///
    /// # Errors
    /// Returns [`crate::StorageError::Io`] if the stream fails mid-read.
    pub async fn read_to_end(mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf).await.context("Reading object stream")?;
        Ok(buf)
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File").field("attributes", &self.attributes).finish_non_exhaustive()
    }
}

impl AsyncRead for File {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.reader).poll_read(cx, buf)
    }
}

/// Destination of a `create` call.
///
/// Nothing becomes visible at the target path until [`WriteSink::commit`]
/// succeeds; dropping an uncommitted sink discards the write.
#[async_trait]
pub trait WriteSink: Send {
    async fn write_all(&mut self, buf: &[u8]) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Boxed [`WriteSink`] returned by storage backends.
pub type Writer = Box<dyn WriteSink>;

/// Copies `reader` into `sink` and commits it.
///
/// # Errors
/// Any read, write, or commit failure. The sink is dropped uncommitted on error.
pub async fn copy_into<R>(reader: &mut R, mut sink: Writer) -> Result<u64>
where
    R: AsyncRead + Unpin + Send + ?Sized,
{
    let mut buf = vec![0u8; 64 * 1024];
    let mut copied = 0u64;
    loop {
        let n = reader.read(&mut buf).await.context("Reading copy source")?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n]).await?;
        copied += n as u64;
    }
    sink.commit().await?;
    Ok(copied)
}
