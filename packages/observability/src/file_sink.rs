//! Append-only JSONL file sink.
//!
//! Multi-process safe via append mode with a flush after every line.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// File writer that appends to the central log file.
#[derive(Clone)]
pub struct CentralLogWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl CentralLogWriter {
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl Write for CentralLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let result = guard.write(buf);
        // Each line must be visible to `tail -f` as soon as it is written.
        guard.flush()?;
        result
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// MakeWriter implementation for tracing-subscriber.
#[derive(Clone)]
pub struct WriterFactory {
    writer: CentralLogWriter,
}

impl WriterFactory {
    pub fn new(writer: CentralLogWriter) -> Self {
        Self { writer }
    }
}

impl<'a> MakeWriter<'a> for WriterFactory {
    type Writer = CentralLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_central_log_writer_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("test.jsonl");

        let mut writer = CentralLogWriter::new(&path).unwrap();
        writer.write_all(b"test line\n").unwrap();

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "test line\n");
    }

    #[test]
    fn test_writer_appends_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("append.jsonl");

        CentralLogWriter::new(&path)
            .unwrap()
            .write_all(b"first\n")
            .unwrap();
        CentralLogWriter::new(&path)
            .unwrap()
            .write_all(b"second\n")
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_factory_hands_out_shared_writer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shared.jsonl");
        let factory = WriterFactory::new(CentralLogWriter::new(&path).unwrap());

        factory.make_writer().write_all(b"a\n").unwrap();
        factory.make_writer().write_all(b"b\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "a\nb\n");
    }
}
