//! Output management module
//!
//! Accepted lines are collected into a fixed-capacity [`Batch`] and appended
//! to the output file one batch at a time. Flushed lines are never rewritten.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{FilterError, Result};

/// Default number of lines per batch
pub const DEFAULT_BATCH_SIZE: usize = 50_000;

/// Accepted lines waiting for a flush, stored newline-terminated in one buffer
#[derive(Debug)]
pub struct Batch {
    data: Vec<u8>,
    lines: usize,
    capacity: usize,
}

impl Batch {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            lines: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: &[u8]) {
        self.data.extend_from_slice(line);
        self.data.push(b'\n');
        self.lines += 1;
    }

    pub fn len(&self) -> usize {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines == 0
    }

    pub fn is_full(&self) -> bool {
        self.lines >= self.capacity
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Empty the batch, keeping its allocation
    pub fn clear(&mut self) {
        self.data.clear();
        self.lines = 0;
    }
}

/// Appends accepted lines to a file in batches
pub struct BatchedWriter {
    path: PathBuf,
    batch: Batch,
    dir_ready: bool,
    lines_written: u64,
    bytes_written: u64,
    flushes: u64,
}

impl BatchedWriter {
    /// Create a writer. Nothing touches the filesystem until the first flush.
    pub fn new(path: PathBuf, batch_size: usize) -> Self {
        Self {
            path,
            batch: Batch::new(batch_size),
            dir_ready: false,
            lines_written: 0,
            bytes_written: 0,
            flushes: 0,
        }
    }

    /// Queue a line, flushing when the batch reaches capacity
    pub fn append(&mut self, line: &[u8]) -> Result<()> {
        self.batch.push(line);
        if self.batch.is_full() {
            self.flush()?;
        }
        Ok(())
    }

    /// Queue several lines in order
    pub fn append_all<'a, I>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        for line in lines {
            self.append(line)?;
        }
        Ok(())
    }

    /// Append the pending batch to the output file and clear it
    pub fn flush(&mut self) -> Result<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        if !self.dir_ready {
            if let Some(parent) = self.path.parent() {
                ensure_output_dir(parent)?;
            }
            self.dir_ready = true;
        }

        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| FilterError::open(&self.path, e))?;

        file.write_all(self.batch.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| FilterError::write(&self.path, e))?;

        self.flushes += 1;
        self.lines_written += self.batch.len() as u64;
        self.bytes_written += self.batch.as_bytes().len() as u64;
        log::debug!(
            "flushed {} lines to {:?} (batch #{})",
            self.batch.len(),
            self.path,
            self.flushes
        );

        self.batch.clear();
        Ok(())
    }

    /// Flush the final partial batch and return the number of lines written
    pub fn finish(&mut self) -> Result<u64> {
        self.flush()?;
        Ok(self.lines_written)
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn flushes(&self) -> u64 {
        self.flushes
    }
}

/// Ensure output directory exists
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        fs::create_dir_all(path).map_err(|e| FilterError::create_dir(path, e))?;
    }
    Ok(())
}

/// Pick the output file for a run.
///
/// An existing file is deleted when `overwrite` is set, since the writer
/// appends. Otherwise the first free `<stem>_<n>.<ext>` name is used.
pub fn resolve_output_path(dir: &Path, name: &str, overwrite: bool) -> Result<PathBuf> {
    let path = dir.join(name);
    if !path.exists() {
        return Ok(path);
    }

    if overwrite {
        fs::remove_file(&path).map_err(|e| FilterError::write(&path, e))?;
        return Ok(path);
    }

    let name_path = Path::new(name);
    let stem = name_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let ext = name_path.extension().and_then(|e| e.to_str());

    let mut n = 1u32;
    loop {
        let candidate = match ext {
            Some(ext) => dir.join(format!("{}_{}.{}", stem, n, ext)),
            None => dir.join(format!("{}_{}", stem, n)),
        };
        if !candidate.exists() {
            return Ok(candidate);
        }
        n += 1;
    }
}
