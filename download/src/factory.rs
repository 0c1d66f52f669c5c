use anyhow::Result;
use async_trait::async_trait;
use std::io::{Cursor, SeekFrom};
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWrite, AsyncWriteExt};

/// An AsyncWriterFactory can produce, on demand, an [AsyncWrite] object.  In
/// the event of a transfer failure, the retried attempt asks for a fresh
/// writer and restarts writing at the beginning.
#[async_trait]
pub trait AsyncWriterFactory {
    /// Get a fresh [AsyncWrite] object, positioned where downloaded data
    /// should be written.  Any data from a previous attempt is discarded.
    async fn get_writer<'a>(&'a mut self) -> Result<Box<dyn AsyncWrite + Unpin + Send + 'a>>;
}

/// A CursorWriterFactory buffers the download in memory.  Each fresh writer
/// clears the buffer, so a retried attempt never leaves stale bytes behind.
/// Unexpectedly large objects will exhaust memory; use [FileWriterFactory]
/// when the size is unbounded.
pub struct CursorWriterFactory(Cursor<Vec<u8>>);

#[async_trait]
impl AsyncWriterFactory for CursorWriterFactory {
    async fn get_writer<'a>(&'a mut self) -> Result<Box<dyn AsyncWrite + Unpin + Send + 'a>> {
        self.0.get_mut().clear();
        self.0.set_position(0);
        Ok(Box::new(&mut self.0))
    }
}

impl Default for CursorWriterFactory {
    fn default() -> Self {
        Self(Cursor::new(Vec::new()))
    }
}

impl CursorWriterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the factory, returning the buffered data.
    pub fn into_inner(self) -> Vec<u8> {
        self.0.into_inner()
    }
}

/// A FileWriterFactory creates writers by truncating and rewinding a
/// [tokio::fs::File].  The file must be open in write mode and must be
/// clone-able (that is, [File::try_clone()] must succeed) in order to
/// support retried downloads.
pub struct FileWriterFactory(File);

#[async_trait]
impl AsyncWriterFactory for FileWriterFactory {
    async fn get_writer<'a>(&'a mut self) -> Result<Box<dyn AsyncWrite + Unpin + Send + 'a>> {
        let mut file = self.0.try_clone().await?;
        file.set_len(0).await?;
        file.seek(SeekFrom::Start(0)).await?;
        Ok(Box::new(file))
    }
}

impl FileWriterFactory {
    pub fn new(file: File) -> Self {
        Self(file)
    }

    /// Return the File, after flushing any outstanding writes.  The file
    /// position is unspecified.
    pub async fn into_inner(mut self) -> Result<File> {
        self.0.flush().await?;
        Ok(self.0)
    }
}
