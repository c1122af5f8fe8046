//! Shared output handles: standard output and append-mode files, with
//! line-atomic per-entry emission and optional global deduplication.

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

/// Where one emitted line goes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Stdout,
    File(PathBuf),
}

enum Backend {
    Real {
        files: HashMap<PathBuf, BufWriter<File>>,
    },
    /// Captures emissions for tests instead of touching the filesystem.
    Memory {
        lines: HashMap<Target, Vec<String>>,
    },
}

struct Inner {
    backend: Backend,
    dedup: Option<HashSet<String>>,
}

/// All output file handles and the stdout stream, behind one mutex so a
/// whole entry's emissions land contiguously even under parallel workers.
pub struct OutputHub {
    inner: Mutex<Inner>,
}

impl OutputHub {
    pub fn new(dedup: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                backend: Backend::Real {
                    files: HashMap::new(),
                },
                dedup: dedup.then(HashSet::new),
            }),
        }
    }

    /// An in-memory hub for tests.
    pub fn in_memory(dedup: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                backend: Backend::Memory {
                    lines: HashMap::new(),
                },
                dedup: dedup.then(HashSet::new),
            }),
        }
    }

    /// `create "path"`: truncate the file and keep the handle for appends.
    pub fn create(&self, path: &str) -> io::Result<()> {
        let mut inner = self.lock();
        match &mut inner.backend {
            Backend::Real { files } => {
                let path = PathBuf::from(path);
                let file = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&path)?;
                files.insert(path, BufWriter::new(file));
            }
            Backend::Memory { lines } => {
                lines.insert(Target::File(PathBuf::from(path)), Vec::new());
            }
        }
        Ok(())
    }

    /// Writes one entry's buffered emissions under a single lock.
    /// Returns the number of lines actually written after deduplication.
    pub fn emit_entry(&self, emissions: &[(Target, String)]) -> io::Result<u64> {
        if emissions.is_empty() {
            return Ok(0);
        }
        let mut inner = self.lock();
        let mut written = 0;
        for (target, line) in emissions {
            if let Some(seen) = &mut inner.dedup {
                if !seen.insert(line.clone()) {
                    continue;
                }
            }
            match &mut inner.backend {
                Backend::Real { files } => match target {
                    Target::Stdout => {
                        let stdout = io::stdout();
                        let mut handle = stdout.lock();
                        handle.write_all(line.as_bytes())?;
                        handle.write_all(b"\n")?;
                    }
                    Target::File(path) => {
                        let writer = match files.entry(path.clone()) {
                            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                            std::collections::hash_map::Entry::Vacant(e) => {
                                let file = OpenOptions::new()
                                    .create(true)
                                    .append(true)
                                    .open(path)?;
                                e.insert(BufWriter::new(file))
                            }
                        };
                        writer.write_all(line.as_bytes())?;
                        writer.write_all(b"\n")?;
                    }
                },
                Backend::Memory { lines } => {
                    lines.entry(target.clone()).or_default().push(line.clone());
                }
            }
            written += 1;
        }
        Ok(written)
    }

    /// Flushes every open file handle. Called on all exit paths.
    pub fn flush_all(&self) -> io::Result<()> {
        let mut inner = self.lock();
        if let Backend::Real { files } = &mut inner.backend {
            for writer in files.values_mut() {
                writer.flush()?;
            }
        }
        io::stdout().flush()
    }

    /// Test helper: lines captured for a target by an in-memory hub.
    pub fn captured(&self, target: &Target) -> Vec<String> {
        let inner = self.lock();
        match &inner.backend {
            Backend::Memory { lines } => lines.get(target).cloned().unwrap_or_default(),
            Backend::Real { .. } => Vec::new(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_capture() {
        let hub = OutputHub::in_memory(false);
        hub.emit_entry(&[
            (Target::Stdout, "a".to_string()),
            (Target::Stdout, "b".to_string()),
        ])
        .unwrap();
        assert_eq!(hub.captured(&Target::Stdout), ["a", "b"]);
    }

    #[test]
    fn test_global_dedup() {
        let hub = OutputHub::in_memory(true);
        hub.emit_entry(&[(Target::Stdout, "a".to_string())]).unwrap();
        hub.emit_entry(&[
            (Target::Stdout, "a".to_string()),
            (Target::Stdout, "b".to_string()),
        ])
        .unwrap();
        assert_eq!(hub.captured(&Target::Stdout), ["a", "b"]);
    }

    #[test]
    fn test_create_resets_capture() {
        let hub = OutputHub::in_memory(false);
        let target = Target::File(PathBuf::from("out.txt"));
        hub.emit_entry(&[(target.clone(), "x".to_string())]).unwrap();
        hub.create("out.txt").unwrap();
        assert!(hub.captured(&target).is_empty());
    }
}
