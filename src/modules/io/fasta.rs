//! FASTA file reading and writing
//!
//! These helpers materialize whole records. For large inputs prefer the
//! streaming operations in [`crate::modules::stats`].

use std::io::{Read, Write};
use std::path::Path;

use crate::engines::core::io::MeteredReader;
use crate::engines::storage::formats::{FastaTokenizer, SequenceRecord};
use crate::engines::EngineResult;

/// Payload characters per line when writing
pub const LINE_WIDTH: usize = 60;

/// Read every record from a FASTA file
pub fn read_fasta<P: AsRef<Path>>(path: P) -> EngineResult<Vec<SequenceRecord>> {
    let reader = MeteredReader::open(path.as_ref())?;
    let stats = reader.stats();
    let records = read_fasta_from(reader)?;

    log::debug!(
        "read {} records ({} bytes) from {}",
        records.len(),
        stats.bytes_read(),
        path.as_ref().display()
    );
    Ok(records)
}

/// Read every record from any byte source
pub fn read_fasta_from<R: Read>(reader: R) -> EngineResult<Vec<SequenceRecord>> {
    FastaTokenizer::new(reader).collect()
}

/// Write records in FASTA format, wrapping payloads at [`LINE_WIDTH`]
pub fn write_fasta<W: Write>(mut writer: W, records: &[SequenceRecord]) -> EngineResult<()> {
    for record in records {
        match &record.description {
            Some(description) => writeln!(writer, ">{} {}", record.accession, description)?,
            None => writeln!(writer, ">{}", record.accession)?,
        }
        for line in record.payload.chunks(LINE_WIDTH) {
            writer.write_all(line)?;
            writer.write_all(b"\n")?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_write_then_read_file() -> EngineResult<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.fasta");
        let records = vec![
            SequenceRecord {
                accession: "chr1".into(),
                description: Some("long contig".into()),
                payload: b"ACGT".repeat(40),
            },
            SequenceRecord::with_payload("chr2", b"GG".to_vec()),
        ];

        write_fasta(File::create(&path)?, &records)?;
        let text = std::fs::read_to_string(&path)?;
        assert!(text.starts_with(">chr1 long contig\n"));
        assert_eq!(text.lines().filter(|l| !l.starts_with('>')).count(), 4);
        assert!(text.lines().all(|l| l.len() <= LINE_WIDTH || l.starts_with('>')));

        assert_eq!(read_fasta(&path)?, records);
        Ok(())
    }

    #[test]
    fn test_read_from_slice() {
        let records = read_fasta_from(&b">a\nAC\nGT\n>b\n"[..]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].payload, b"ACGT");
        assert!(records[1].is_empty());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(read_fasta(dir.path().join("absent.fasta")).is_err());
    }
}
