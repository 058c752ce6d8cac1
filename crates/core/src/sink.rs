use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Append-only, line-oriented destination for message payloads.
pub trait Sink: Send {
    /// Buffer one record: the payload followed by `\n`.
    fn write_record(&mut self, payload: &[u8]) -> io::Result<()>;

    /// Push buffered records down to the underlying storage.
    fn flush(&mut self) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write_record(&mut self, payload: &[u8]) -> io::Result<()> {
        (**self).write_record(payload)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// The message log file. Opened in append mode and never created here;
/// the handle closes when the sink is dropped.
pub struct FileSink {
    path: PathBuf,
    writer: RecordWriter<File>,
}

impl FileSink {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: RecordWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Sink for FileSink {
    fn write_record(&mut self, payload: &[u8]) -> io::Result<()> {
        self.writer.write_record(payload)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Buffered line writer that never leaves part of a record in its buffer.
///
/// A failed write leaves the buffer as it was before the record, so a
/// rejected payload cannot be glued onto the next line.
struct RecordWriter<W: Write> {
    inner: BufWriter<W>,
}

impl<W: Write> RecordWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner: BufWriter::new(inner),
        }
    }

    #[cfg(test)]
    fn with_capacity(capacity: usize, inner: W) -> Self {
        Self {
            inner: BufWriter::with_capacity(capacity, inner),
        }
    }

    fn write_record(&mut self, payload: &[u8]) -> io::Result<()> {
        let len = payload.len() + 1;

        if self.inner.capacity() - self.inner.buffer().len() < len {
            self.inner.flush()?;
        }

        if len <= self.inner.capacity() {
            // Both parts fit in the spare capacity, so neither write can fail.
            self.inner.write_all(payload)?;
            return self.inner.write_all(b"\n");
        }

        let mut record = Vec::with_capacity(len);
        record.extend_from_slice(payload);
        record.push(b'\n');
        self.inner.write_all(&record)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
