//! Durable destinations for serialized records.

use std::{
    fs::{self, OpenOptions},
    io::{self, Write as _},
    path::{Path, PathBuf},
};

use chrono::Utc;

/// An append-only destination for serialized records.
///
/// The dispatcher points the sink at the configured log destination right
/// before every write, and writes at most once per fault.
pub trait LogSink: Send + 'static {
    /// Directs subsequent writes to `directory`.
    fn set_directory(&mut self, directory: &Path) -> io::Result<()>;

    /// Appends one serialized record.
    fn write(&mut self, serialized: &str) -> io::Result<()>;
}

/// Appends records to one file per day, `<directory>/<YYYY-MM-DD>.log`.
///
/// Each record is written as a single line. The directory is created on
/// [`set_directory`](LogSink::set_directory) if it does not exist yet.
#[derive(Clone, Debug, Default)]
pub struct FileSink {
    directory: Option<PathBuf>,
}

impl FileSink {
    /// Creates a sink with no directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// The file records are currently appended to.
    pub fn current_file(&self) -> Option<PathBuf> {
        let directory = self.directory.as_ref()?;
        Some(directory.join(format!("{}.log", Utc::now().format("%Y-%m-%d"))))
    }
}

impl LogSink for FileSink {
    fn set_directory(&mut self, directory: &Path) -> io::Result<()> {
        if self.directory.as_deref() != Some(directory) {
            fs::create_dir_all(directory)?;
            self.directory = Some(directory.to_path_buf());
        }
        Ok(())
    }

    fn write(&mut self, serialized: &str) -> io::Result<()> {
        let path = self
            .current_file()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no log directory set"))?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut line = String::with_capacity(serialized.len() + 1);
        line.push_str(serialized);
        line.push('\n');
        file.write_all(line.as_bytes())
    }
}
