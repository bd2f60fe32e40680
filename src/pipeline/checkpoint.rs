//! Resume state derived from the output file itself.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Resume position read back from an output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checkpoint {
    /// Newline-terminated records already written
    pub records: usize,
    /// Byte length of the newline-terminated prefix
    pub valid_len: u64,
    /// Byte length of the whole file
    pub file_len: u64,
}

impl Checkpoint {
    /// A partial last line left behind by an interrupted write
    pub fn has_torn_tail(&self) -> bool {
        self.file_len > self.valid_len
    }
}

/// Count the records already present in `output`; a missing file is an empty checkpoint
pub fn resolve_checkpoint<P: AsRef<Path>>(output: P) -> io::Result<Checkpoint> {
    let file = match File::open(output.as_ref()) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Checkpoint::default()),
        Err(e) => return Err(e),
    };

    let mut reader = BufReader::new(file);
    let mut checkpoint = Checkpoint::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            break;
        }
        checkpoint.file_len += read as u64;
        if buf.ends_with(b"\n") {
            checkpoint.records += 1;
            checkpoint.valid_len = checkpoint.file_len;
        }
    }
    Ok(checkpoint)
}
