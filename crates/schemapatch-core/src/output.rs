//! Where patched manifests go
//!
//! An [`OutputRule`] opens one writer per file name. Writers must be closed
//! explicitly; a writer dropped without `close` leaves its target untouched.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

use tempfile::NamedTempFile;

/// A writer for one output file
pub trait OutputWriter: Write {
    /// Finish the file
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Opens writers for output files
pub trait OutputRule {
    fn open(&self, file_name: &str) -> io::Result<Box<dyn OutputWriter + '_>>;
}

/// Write files into a directory, replacing each file atomically
#[derive(Debug, Clone)]
pub struct DirectoryOutput {
    dir: PathBuf,
}

impl DirectoryOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl OutputRule for DirectoryOutput {
    fn open(&self, file_name: &str) -> io::Result<Box<dyn OutputWriter + '_>> {
        std::fs::create_dir_all(&self.dir)?;
        let target = self.dir.join(file_name);
        let file = NamedTempFile::new_in(&self.dir)?;
        if let Ok(metadata) = std::fs::metadata(&target) {
            file.as_file().set_permissions(metadata.permissions())?;
        }
        Ok(Box::new(DirectoryWriter { file, target }))
    }
}

struct DirectoryWriter {
    file: NamedTempFile,
    target: PathBuf,
}

impl Write for DirectoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl OutputWriter for DirectoryWriter {
    fn close(mut self: Box<Self>) -> io::Result<()> {
        self.file.flush()?;
        self.file.as_file().sync_all()?;
        let DirectoryWriter { file, target } = *self;
        file.persist(&target).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Write every file to standard output, separated by `---`
#[derive(Debug, Default)]
pub struct StdoutOutput {
    started: Cell<bool>,
}

impl StdoutOutput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputRule for StdoutOutput {
    fn open(&self, _file_name: &str) -> io::Result<Box<dyn OutputWriter + '_>> {
        let separator = self.started.replace(true);
        Ok(Box::new(StdoutWriter {
            buf: Vec::new(),
            separator,
        }))
    }
}

struct StdoutWriter {
    buf: Vec<u8>,
    separator: bool,
}

impl Write for StdoutWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputWriter for StdoutWriter {
    fn close(self: Box<Self>) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        if self.separator {
            stdout.write_all(b"---\n")?;
        }
        stdout.write_all(&self.buf)?;
        stdout.flush()
    }
}

/// Keep files in memory, keyed by file name
#[derive(Debug, Default)]
pub struct MemoryOutput {
    files: RefCell<BTreeMap<String, String>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of a closed file
    pub fn get(&self, file_name: &str) -> Option<String> {
        self.files.borrow().get(file_name).cloned()
    }

    /// Names of all closed files
    pub fn file_names(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl OutputRule for MemoryOutput {
    fn open(&self, file_name: &str) -> io::Result<Box<dyn OutputWriter + '_>> {
        Ok(Box::new(MemoryWriter {
            name: file_name.to_string(),
            buf: Vec::new(),
            files: &self.files,
        }))
    }
}

struct MemoryWriter<'a> {
    name: String,
    buf: Vec<u8>,
    files: &'a RefCell<BTreeMap<String, String>>,
}

impl Write for MemoryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl OutputWriter for MemoryWriter<'_> {
    fn close(self: Box<Self>) -> io::Result<()> {
        let content = String::from_utf8(self.buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.files.borrow_mut().insert(self.name, content);
        Ok(())
    }
}
