//! Streaming FASTA tokenizer
//!
//! FASTA input is consumed in fixed-size read chunks. Header lines may be
//! split across chunks, so the scanner carries an explicit [`ScanState`]
//! from one read to the next instead of relying on line-at-a-time reads.
//!
//! Two layers are provided:
//!
//! * [`FastaScanner`] emits [`ScanEvent`]s: complete headers, and payload
//!   fragments (at most one per record per read chunk). Memory use is bounded
//!   by the read buffer regardless of record length.
//! * [`FastaTokenizer`] assembles those events into whole
//!   [`SequenceRecord`]s.

use std::collections::VecDeque;
use std::io::Read;
use std::mem;

use memchr::memchr;

use crate::engines::core::io::{read_chunk, DEFAULT_READ_BUFFER_SIZE};
use crate::engines::EngineResult;

/// A FASTA record: accession, optional description and raw payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SequenceRecord {
    /// First whitespace-delimited token of the header
    pub accession: String,
    /// Remainder of the header line, if any
    pub description: Option<String>,
    /// Concatenated sequence lines, terminators removed
    pub payload: Vec<u8>,
}

impl SequenceRecord {
    /// Create a record with an empty payload
    pub fn new(accession: impl Into<String>, description: Option<String>) -> Self {
        Self {
            accession: accession.into(),
            description,
            payload: Vec::new(),
        }
    }

    /// Create a record with the given payload
    pub fn with_payload(accession: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            accession: accession.into(),
            description: None,
            payload,
        }
    }

    /// Get the length of the payload
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Check if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Where the scanner is within the current line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Inside sequence data (or at the start of a line)
    ScanningPayload,
    /// Inside a header line whose terminator has not been seen yet
    ScanningHeader,
}

/// A unit of scanner output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    /// A complete header line
    Header {
        accession: String,
        description: Option<String>,
    },
    /// Payload bytes belonging to the most recent header
    Payload(Vec<u8>),
}

/// Chunked FASTA scanner
pub struct FastaScanner<R> {
    reader: R,
    buffer: Vec<u8>,
    state: ScanState,
    // previous byte was '\n', or nothing has been read yet
    at_line_start: bool,
    // a payload chunk ended in '\r'; it is a terminator if '\n' follows
    pending_cr: bool,
    header: Vec<u8>,
    events: VecDeque<ScanEvent>,
    finished: bool,
}

impl<R: Read> FastaScanner<R> {
    /// Create a scanner with the default read buffer size
    pub fn new(reader: R) -> Self {
        Self::with_buffer_size(reader, DEFAULT_READ_BUFFER_SIZE)
    }

    /// Create a scanner reading `buffer_size` bytes at a time (minimum 1)
    pub fn with_buffer_size(reader: R, buffer_size: usize) -> Self {
        Self {
            reader,
            buffer: vec![0; buffer_size.max(1)],
            state: ScanState::ScanningPayload,
            at_line_start: true,
            pending_cr: false,
            header: Vec::new(),
            events: VecDeque::new(),
            finished: false,
        }
    }

    /// Current scanner state
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Next event, or `None` at end of stream
    ///
    /// A read failure is returned once; events buffered from the failing
    /// chunk are discarded and the scanner reports end of stream afterwards.
    pub fn next_event(&mut self) -> EngineResult<Option<ScanEvent>> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Ok(Some(event));
            }
            if self.finished {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    fn fill(&mut self) -> EngineResult<()> {
        let n = match read_chunk(&mut self.reader, &mut self.buffer) {
            Ok(n) => n,
            Err(err) => {
                self.finished = true;
                self.events.clear();
                self.header.clear();
                return Err(err.into());
            }
        };

        if n == 0 {
            self.finish();
            return Ok(());
        }

        let chunk = mem::take(&mut self.buffer);
        self.scan(&chunk[..n]);
        self.buffer = chunk;
        Ok(())
    }

    fn scan(&mut self, chunk: &[u8]) {
        let mut payload = Vec::new();
        let mut i = 0;

        if mem::take(&mut self.pending_cr) && chunk[0] != b'\n' {
            payload.push(b'\r');
        }

        while i < chunk.len() {
            match self.state {
                ScanState::ScanningHeader => match memchr(b'\n', &chunk[i..]) {
                    Some(offset) => {
                        self.header.extend_from_slice(&chunk[i..i + offset]);
                        self.emit_header();
                        self.state = ScanState::ScanningPayload;
                        self.at_line_start = true;
                        i += offset + 1;
                    }
                    None => {
                        self.header.extend_from_slice(&chunk[i..]);
                        i = chunk.len();
                    }
                },
                ScanState::ScanningPayload => {
                    if self.at_line_start && chunk[i] == b'>' {
                        self.flush_payload(&mut payload);
                        self.state = ScanState::ScanningHeader;
                        self.at_line_start = false;
                        i += 1;
                        continue;
                    }

                    match memchr(b'\n', &chunk[i..]) {
                        Some(offset) => {
                            let line = &chunk[i..i + offset];
                            payload.extend_from_slice(line.strip_suffix(b"\r").unwrap_or(line));
                            self.at_line_start = true;
                            i += offset + 1;
                        }
                        None => {
                            let mut line = &chunk[i..];
                            if let Some(stripped) = line.strip_suffix(b"\r") {
                                line = stripped;
                                self.pending_cr = true;
                            }
                            payload.extend_from_slice(line);
                            self.at_line_start = false;
                            i = chunk.len();
                        }
                    }
                }
            }
        }

        self.flush_payload(&mut payload);
    }

    fn finish(&mut self) {
        self.finished = true;
        // a trailing '\r' at end of stream is a terminator
        self.pending_cr = false;
        if self.state == ScanState::ScanningHeader {
            self.emit_header();
            self.state = ScanState::ScanningPayload;
        }
    }

    fn emit_header(&mut self) {
        let text = String::from_utf8_lossy(&self.header);
        let text = text.trim();
        let (accession, description) = match text.split_once(char::is_whitespace) {
            Some((accession, rest)) => {
                let rest = rest.trim();
                (accession, (!rest.is_empty()).then(|| rest.to_string()))
            }
            None => (text, None),
        };

        self.events.push_back(ScanEvent::Header {
            accession: accession.to_string(),
            description,
        });
        self.header.clear();
    }

    fn flush_payload(&mut self, payload: &mut Vec<u8>) {
        if !payload.is_empty() {
            self.events.push_back(ScanEvent::Payload(mem::take(payload)));
        }
    }
}

/// Iterator of whole FASTA records
///
/// Every header starts a record, even if no payload follows it. Payload
/// appearing before the first header is reported under an empty accession.
/// After a read error the iterator yields that error once and then ends;
/// the partially assembled record is dropped.
pub struct FastaTokenizer<R> {
    scanner: FastaScanner<R>,
    current: Option<SequenceRecord>,
    done: bool,
}

impl<R: Read> FastaTokenizer<R> {
    /// Create a tokenizer with the default read buffer size
    pub fn new(reader: R) -> Self {
        Self::from_scanner(FastaScanner::new(reader))
    }

    /// Create a tokenizer reading `buffer_size` bytes at a time
    pub fn with_buffer_size(reader: R, buffer_size: usize) -> Self {
        Self::from_scanner(FastaScanner::with_buffer_size(reader, buffer_size))
    }

    /// Wrap an existing scanner
    pub fn from_scanner(scanner: FastaScanner<R>) -> Self {
        Self {
            scanner,
            current: None,
            done: false,
        }
    }
}

impl<R: Read> Iterator for FastaTokenizer<R> {
    type Item = EngineResult<SequenceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.scanner.next_event() {
                Err(err) => {
                    self.done = true;
                    self.current = None;
                    return Some(Err(err));
                }
                Ok(None) => {
                    self.done = true;
                    return self.current.take().map(Ok);
                }
                Ok(Some(ScanEvent::Header {
                    accession,
                    description,
                })) => {
                    let next = SequenceRecord::new(accession, description);
                    if let Some(previous) = self.current.replace(next) {
                        return Some(Ok(previous));
                    }
                }
                Ok(Some(ScanEvent::Payload(bytes))) => {
                    let record = self.current.get_or_insert_with(SequenceRecord::default);
                    if record.payload.is_empty() {
                        record.payload = bytes;
                    } else {
                        record.payload.extend_from_slice(&bytes);
                    }
                }
            }
        }
    }
}
