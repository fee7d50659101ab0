//! Line sources and encoding detection
//!
//! Input files are memory-mapped and split into records on `\n`. A record
//! loses a trailing `\r`; a final record without a newline still counts.
//! Records are handed out as raw bytes so output keeps the input encoding,
//! and are decoded only for classification.

use bstr::ByteSlice;
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use memmap2::Mmap;
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

use crate::error::{FilterError, Result};

/// Bytes sampled for encoding detection
const DETECTION_SAMPLE: usize = 64 * 1024;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Result of encoding detection
#[derive(Debug, Clone)]
pub struct EncodingInfo {
    /// Detected encoding name
    pub name: &'static str,
    /// Confidence level (0.0 - 1.0)
    pub confidence: f32,
    /// The encoding_rs Encoding reference
    pub encoding: &'static Encoding,
}

impl Default for EncodingInfo {
    fn default() -> Self {
        Self {
            name: "UTF-8",
            confidence: 1.0,
            encoding: encoding_rs::UTF_8,
        }
    }
}

impl From<&'static Encoding> for EncodingInfo {
    fn from(encoding: &'static Encoding) -> Self {
        Self {
            name: encoding.name(),
            confidence: 1.0,
            encoding,
        }
    }
}

/// Detect the encoding of `content` from its first 64KB
pub fn detect_encoding(content: &[u8]) -> EncodingInfo {
    if content.is_empty() {
        return EncodingInfo::default();
    }

    if let Some(encoding) = detect_bom(content) {
        return encoding.into();
    }

    let sample = &content[..content.len().min(DETECTION_SAMPLE)];

    // A multi-byte sequence cut by the sample boundary is still UTF-8
    match std::str::from_utf8(sample) {
        Ok(_) => return EncodingInfo::default(),
        Err(e) if e.error_len().is_none() => return EncodingInfo::default(),
        Err(_) => {}
    }

    let mut detector = EncodingDetector::new();
    detector.feed(sample, sample.len() == content.len());
    let encoding = detector.guess(None, true);

    EncodingInfo {
        name: encoding.name(),
        confidence: if encoding == encoding_rs::UTF_8 { 0.5 } else { 0.8 },
        encoding,
    }
}

/// Detect BOM (Byte Order Mark) at the start of content
fn detect_bom(content: &[u8]) -> Option<&'static Encoding> {
    if content.starts_with(UTF8_BOM) {
        return Some(encoding_rs::UTF_8);
    }
    if content.starts_with(&[0xFE, 0xFF]) {
        return Some(encoding_rs::UTF_16BE);
    }
    if content.starts_with(&[0xFF, 0xFE]) {
        return Some(encoding_rs::UTF_16LE);
    }
    None
}

/// A memory-mapped input file
pub struct LineSource {
    mmap: Option<Mmap>,
    start: usize,
    encoding: EncodingInfo,
}

impl LineSource {
    /// Map `path` and detect its encoding.
    ///
    /// UTF-16 input is rejected: its newlines are not single `\n` bytes.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| FilterError::open(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| FilterError::read(path, e))?
            .len();

        // Zero-length files cannot be mapped on every platform
        let mmap = if len == 0 {
            None
        } else {
            // The file is only read; concurrent truncation by another
            // process is outside what this tool supports.
            Some(unsafe { Mmap::map(&file) }.map_err(|e| FilterError::read(path, e))?)
        };

        let content: &[u8] = mmap.as_deref().unwrap_or(&[]);
        let encoding = detect_encoding(content);

        if encoding.encoding == encoding_rs::UTF_16BE || encoding.encoding == encoding_rs::UTF_16LE {
            return Err(FilterError::UnsupportedEncoding {
                path: path.to_path_buf(),
                encoding: encoding.name,
            });
        }

        let start = if content.starts_with(UTF8_BOM) { UTF8_BOM.len() } else { 0 };

        log::debug!(
            "opened {:?} ({} bytes, {} at {:.0}% confidence)",
            path,
            len,
            encoding.name,
            encoding.confidence * 100.0
        );

        Ok(Self {
            mmap,
            start,
            encoding,
        })
    }

    /// File content after any byte order mark
    pub fn bytes(&self) -> &[u8] {
        match self.mmap {
            Some(ref mmap) => &mmap[self.start..],
            None => &[],
        }
    }

    /// Size of the content in bytes
    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    pub fn encoding(&self) -> &EncodingInfo {
        &self.encoding
    }

    /// Iterate over the records of the file
    pub fn lines(&self) -> Lines<'_> {
        Lines::new(self.bytes())
    }

    /// Decode a record for classification.
    ///
    /// Records that are valid UTF-8 are taken as is. Any other record goes
    /// through the detected encoding, or lossy UTF-8 (U+FFFD for invalid
    /// sequences) when nothing else was detected.
    pub fn decode<'a>(&self, line: &'a [u8]) -> Cow<'a, str> {
        if let Ok(text) = std::str::from_utf8(line) {
            return Cow::Borrowed(text);
        }

        if self.encoding.encoding == encoding_rs::UTF_8 {
            line.to_str_lossy()
        } else {
            self.encoding.encoding.decode_without_bom_handling(line).0
        }
    }
}

/// Iterator over newline-delimited records of a byte slice
pub struct Lines<'a> {
    rest: &'a [u8],
}

impl<'a> Lines<'a> {
    pub fn new(content: &'a [u8]) -> Self {
        Self { rest: content }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }

        let line = match memchr::memchr(b'\n', self.rest) {
            Some(i) => {
                let line = &self.rest[..i];
                self.rest = &self.rest[i + 1..];
                line
            }
            None => std::mem::take(&mut self.rest),
        };

        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }
}
