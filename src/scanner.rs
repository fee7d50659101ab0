//! Record counting for progress reporting
//!
//! Counts records with the same rule the line iterator applies, so the
//! reported total always equals the number of lines the pipeline processes.

use std::path::Path;

use crate::encoding::LineSource;
use crate::error::Result;

/// Count the records in `content` without splitting it
pub fn count_records(content: &[u8]) -> u64 {
    if content.is_empty() {
        return 0;
    }

    let newlines = memchr::memchr_iter(b'\n', content).count() as u64;
    match content.last() {
        Some(b'\n') => newlines,
        _ => newlines + 1,
    }
}

/// Count the records of the file at `path`.
///
/// Any failure to open or map the file is returned; no partial count is
/// reported.
pub fn count_lines(path: &Path) -> Result<u64> {
    let source = LineSource::open(path)?;
    Ok(count_records(source.bytes()))
}
