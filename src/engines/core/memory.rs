//! Memory-mapped inputs
//!
//! Large FASTA files are mapped read-only and fed to the tokenizer as a
//! plain byte slice, which avoids copying them through a read buffer.

use std::fs::File;
use std::io;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

/// Read-only memory-mapped file
///
/// Empty files are represented without a mapping, since a zero-length
/// `mmap` is rejected by some platforms.
#[derive(Debug)]
pub struct MemoryMapped {
    mmap: Option<Mmap>,
}

impl MemoryMapped {
    /// Map a file read-only
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(Self { mmap: None });
        }

        // Safety: the mapping is read-only; concurrent truncation of the file
        // by another process is outside what this crate can guard against.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        Ok(Self { mmap: Some(mmap) })
    }

    /// Get a reference to the underlying memory-mapped data
    pub fn as_slice(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }

    /// Get the length of the memory-mapped data
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Check if the memory-mapped data is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_memory_mapped_file() -> io::Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("test_mmap.fasta");
        let test_data = b">chr1\nGGGCCC\n";
        {
            let mut file = File::create(&file_path)?;
            file.write_all(test_data)?;
        }

        let mapped = MemoryMapped::open(&file_path)?;
        assert_eq!(mapped.len(), test_data.len());
        assert_eq!(mapped.as_slice(), test_data);
        Ok(())
    }

    #[test]
    fn test_empty_file_maps_to_empty_slice() -> io::Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("empty.fasta");
        File::create(&file_path)?;

        let mapped = MemoryMapped::open(&file_path)?;
        assert!(mapped.is_empty());
        assert_eq!(mapped.as_slice(), b"");
        Ok(())
    }

    #[test]
    fn test_missing_file_errors() {
        let dir = tempdir().unwrap();
        assert!(MemoryMapped::open(dir.path().join("nope.fasta")).is_err());
    }
}
