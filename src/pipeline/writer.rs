//! Append-only output writer.

use log::warn;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use super::checkpoint::Checkpoint;
use crate::file_utils::FileManager;

/// Appends translated chunks to the output file, flushing after each one
#[derive(Debug)]
pub struct OutputWriter {
    file: File,
}

impl OutputWriter {
    /// Open `path` for appending, creating it and its parent directory if needed
    ///
    /// A torn last line left by an interrupted write is cut off first, so the
    /// file again ends on a record boundary.
    pub fn open<P: AsRef<Path>>(path: P, checkpoint: &Checkpoint) -> io::Result<Self> {
        let path = path.as_ref();
        FileManager::ensure_parent_dir(path).map_err(io::Error::other)?;

        if checkpoint.has_torn_tail() {
            warn!(
                "Discarding {} bytes of incomplete output after record {}",
                checkpoint.file_len - checkpoint.valid_len,
                checkpoint.records
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(checkpoint.valid_len)?;
            file.sync_all()?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }

    /// Append the lines of one chunk and flush them to disk
    pub fn append_chunk(&mut self, lines: &[String]) -> io::Result<()> {
        if lines.is_empty() {
            return Ok(());
        }
        let mut block = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            block.push_str(line);
            block.push('\n');
        }
        self.file.write_all(block.as_bytes())?;
        self.file.flush()?;
        self.file.sync_data()
    }
}
