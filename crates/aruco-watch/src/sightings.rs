//! First-sighting log: one `Frame N: Detected ID: K` line per marker id,
//! written the first time the id shows up.

use log::info;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

pub struct SightingLog<W: Write = BufWriter<File>> {
    out: W,
    seen: HashSet<u32>,
}

impl SightingLog {
    /// Create (or truncate) the log file, creating missing parent
    /// directories.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        info!("logging first sightings to {}", path.display());
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl SightingLog<Vec<u8>> {
    pub fn in_memory() -> Self {
        Self::new(Vec::new())
    }

    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }
}

impl<W: Write> SightingLog<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            seen: HashSet::new(),
        }
    }

    /// Log every id in `ids` that has not been seen before, in the given
    /// order, and return them. Repeats within one frame are logged once.
    pub fn record(&mut self, frame_index: u64, ids: &[u32]) -> io::Result<Vec<u32>> {
        let mut fresh = Vec::new();
        for &id in ids {
            if self.seen.insert(id) {
                writeln!(self.out, "Frame {frame_index}: Detected ID: {id}")?;
                fresh.push(id);
            }
        }
        if !fresh.is_empty() {
            self.out.flush()?;
        }
        Ok(fresh)
    }

    /// Number of distinct ids logged.
    pub fn seen(&self) -> usize {
        self.seen.len()
    }

    pub fn has_seen(&self, id: u32) -> bool {
        self.seen.contains(&id)
    }
}
