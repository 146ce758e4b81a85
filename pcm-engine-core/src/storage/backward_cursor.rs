use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

use crate::models::error::EngineError;

/// Reads a file from its end toward its start in fixed-size windows.
///
/// The cursor starts at the file length and moves down by `window` bytes per
/// step. The final window shrinks to whatever remains, so the cursor lands
/// exactly on 0 and every byte of `[0, len)` is read exactly once.
pub struct BackwardCursor<R> {
    reader: R,
    position: u64,
    window: u64,
    len: u64,
}

impl BackwardCursor<File> {
    pub fn open(path: &Path, window: usize) -> Result<Self, EngineError> {
        let file = File::open(path).map_err(|e| EngineError::io("failed to open source", e))?;
        let len = file
            .metadata()
            .map_err(|e| EngineError::io("failed to stat source", e))?
            .len();
        Self::new(file, len, window)
    }
}

impl<R: Read + Seek> BackwardCursor<R> {
    pub fn new(reader: R, len: u64, window: usize) -> Result<Self, EngineError> {
        if window == 0 {
            return Err(EngineError::Configuration("window must be at least one byte".into()));
        }
        Ok(Self {
            reader,
            position: len,
            window: window as u64,
            len,
        })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current cursor position; everything at or after it has been read.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next window toward the start of the file into `buf`.
    ///
    /// `buf` is resized to the window length. Returns the byte range read, or
    /// `None` once the cursor has reached 0.
    pub fn next_window(&mut self, buf: &mut Vec<u8>) -> Result<Option<Range<u64>>, EngineError> {
        if self.position == 0 {
            return Ok(None);
        }
        let take = self.window.min(self.position);
        let start = self.position - take;

        buf.resize(take as usize, 0);
        self.reader
            .seek(SeekFrom::Start(start))
            .map_err(|e| EngineError::io("seek failed", e))?;
        self.reader
            .read_exact(buf)
            .map_err(|e| EngineError::io("read failed", e))?;

        self.position = start;
        Ok(Some(start..start + take))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn windows(len: u64, window: usize) -> Vec<Range<u64>> {
        let data: Vec<u8> = (0..len).map(|b| b as u8).collect();
        let mut cursor = BackwardCursor::new(Cursor::new(data), len, window).unwrap();
        let mut buf = Vec::new();
        let mut ranges = Vec::new();
        while let Some(range) = cursor.next_window(&mut buf).unwrap() {
            assert_eq!(buf.len() as u64, range.end - range.start);
            assert_eq!(buf[0], range.start as u8);
            ranges.push(range);
        }
        assert_eq!(cursor.position(), 0);
        ranges
    }

    #[test]
    fn walks_back_to_front_with_clamped_last_window() {
        assert_eq!(windows(40, 16), vec![24..40, 8..24, 0..8]);
    }

    #[test]
    fn exact_multiple_needs_no_clamp() {
        assert_eq!(windows(32, 16), vec![16..32, 0..16]);
    }

    #[test]
    fn window_larger_than_file() {
        assert_eq!(windows(10, 64), vec![0..10]);
    }

    #[test]
    fn empty_file_yields_nothing() {
        assert!(windows(0, 16).is_empty());
    }

    #[test]
    fn ranges_cover_file_exactly_once() {
        let ranges = windows(1001, 64);
        let covered: u64 = ranges.iter().map(|r| r.end - r.start).sum();
        assert_eq!(covered, 1001);
        assert!(ranges.iter().all(|r| r.end <= 1001));
        assert_eq!(ranges.last().unwrap().start, 0);
    }

    #[test]
    fn zero_window_is_rejected() {
        assert!(BackwardCursor::new(Cursor::new(Vec::new()), 0, 0).is_err());
    }
}
