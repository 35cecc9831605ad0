use std::io::{Read, Seek, SeekFrom};

use super::{ByteSource, ReadMode, ReadResult};
use crate::error::SourceError;

/// Default size of the resident window, in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Default physical read granularity, in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024;

/// Concrete [`ByteSource`] over a seekable stream, backed by a sliding
/// look-ahead/look-back window.
///
/// Access pattern: heavy forward look-ahead (streaming through `NEW`, and
/// the pre-scan of `ORIGINAL`) punctuated by short backward reads used to
/// byte-verify candidate matches. The policy below is asymmetric to match
/// that pattern: small backward jumps scroll the window by one block;
/// everything else (forward jumps past the resident window, or large
/// backward jumps) resets and refills.
pub struct BufferedByteSource<R> {
    inner: R,
    /// Resident bytes; `buf[i]` corresponds to file position `window_start + i`.
    buf: Vec<u8>,
    window_start: u64,
    capacity: usize,
    block_size: usize,
    cursor: u64,
    /// First position known to be past true end-of-file, once observed.
    eof_position: Option<u64>,
    seeks: u64,
}

impl<R: Read + Seek> BufferedByteSource<R> {
    pub fn new(inner: R) -> Self {
        Self::with_sizes(inner, DEFAULT_BUFFER_SIZE, DEFAULT_BLOCK_SIZE)
    }

    pub fn with_sizes(inner: R, capacity: usize, block_size: usize) -> Self {
        let capacity = capacity.max(block_size).max(1);
        let block_size = block_size.max(1);
        Self {
            inner,
            buf: Vec::new(),
            window_start: 0,
            capacity,
            block_size,
            cursor: 0,
            eof_position: None,
            seeks: 0,
        }
    }

    fn resident_end(&self) -> u64 {
        self.window_start + self.buf.len() as u64
    }

    fn is_resident(&self, pos: u64) -> bool {
        pos >= self.window_start && pos < self.resident_end()
    }

    fn known_eof(&self, pos: u64) -> bool {
        matches!(self.eof_position, Some(eof) if pos >= eof)
    }

    fn serve_resident(&mut self, pos: u64) -> ReadResult {
        let byte = self.buf[(pos - self.window_start) as usize];
        self.cursor = pos + 1;
        ReadResult::Byte(byte)
    }

    /// Reset the window so it starts at `start`, refilling up to `capacity`
    /// bytes (or fewer, at true EOF).
    fn reset_forward(&mut self, start: u64) -> Result<(), SourceError> {
        self.inner
            .seek(SeekFrom::Start(start))
            .map_err(SourceError::Seek)?;
        self.seeks += 1;

        let mut tmp = vec![0u8; self.capacity];
        let mut total = 0usize;
        loop {
            let n = self
                .inner
                .read(&mut tmp[total..])
                .map_err(SourceError::Read)?;
            if n == 0 {
                break;
            }
            total += n;
            if total == tmp.len() {
                break;
            }
        }
        tmp.truncate(total);
        if total < self.capacity {
            self.eof_position = Some(start + total as u64);
        }
        self.buf = tmp;
        self.window_start = start;
        Ok(())
    }

    /// Scroll the window back by one block, discarding the tail to stay
    /// within `capacity`.
    fn scroll_back(&mut self) -> Result<(), SourceError> {
        let new_start = self.window_start.saturating_sub(self.block_size as u64);
        let read_len = (self.window_start - new_start) as usize;
        if read_len == 0 {
            return Ok(());
        }

        self.inner
            .seek(SeekFrom::Start(new_start))
            .map_err(SourceError::Seek)?;
        self.seeks += 1;

        let mut block = vec![0u8; read_len];
        self.inner.read_exact(&mut block).map_err(SourceError::Read)?;

        block.extend_from_slice(&self.buf);
        block.truncate(self.capacity);
        self.buf = block;
        self.window_start = new_start;
        Ok(())
    }
}

impl<R: Read + Seek> ByteSource for BufferedByteSource<R> {
    fn get(&mut self, position: u64, mode: ReadMode) -> Result<ReadResult, SourceError> {
        if self.is_resident(position) {
            return Ok(self.serve_resident(position));
        }
        if self.known_eof(position) {
            return Ok(ReadResult::Eof);
        }

        if mode == ReadMode::SoftAhead {
            return Ok(ReadResult::Eob);
        }

        let within_one_block_back =
            position < self.window_start && self.window_start - position <= self.block_size as u64;

        if within_one_block_back {
            self.scroll_back()?;
            if self.is_resident(position) {
                return Ok(self.serve_resident(position));
            }
        }

        self.reset_forward(position)?;
        if self.is_resident(position) {
            return Ok(self.serve_resident(position));
        }
        Ok(ReadResult::Eof)
    }

    fn seek_count(&self) -> u64 {
        self.seeks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn source(data: &[u8], capacity: usize, block: usize) -> BufferedByteSource<Cursor<Vec<u8>>> {
        BufferedByteSource::with_sizes(Cursor::new(data.to_vec()), capacity, block)
    }

    #[test]
    fn sequential_forward_read() {
        let data: Vec<u8> = (0..=255u8).collect();
        let mut src = source(&data, 16, 4);
        for (i, &b) in data.iter().enumerate() {
            assert_eq!(src.get(i as u64, ReadMode::Normal).unwrap(), ReadResult::Byte(b));
        }
    }

    #[test]
    fn true_eof_past_end() {
        let data = vec![1, 2, 3];
        let mut src = source(&data, 16, 4);
        assert_eq!(src.get(3, ReadMode::Normal).unwrap(), ReadResult::Eof);
        assert_eq!(src.get(100, ReadMode::Normal).unwrap(), ReadResult::Eof);
    }

    #[test]
    fn small_backward_scroll_does_not_reset() {
        let data: Vec<u8> = (0..64u8).collect();
        let mut src = source(&data, 16, 4);
        src.get(40, ReadMode::Normal).unwrap();
        let seeks_before = src.seek_count();
        assert_eq!(src.get(38, ReadMode::Normal).unwrap(), ReadResult::Byte(38));
        assert!(src.seek_count() > seeks_before);
    }

    #[test]
    fn soft_ahead_misses_without_io() {
        let data: Vec<u8> = (0..255u8).collect();
        let mut src = source(&data, 16, 4);
        src.get(0, ReadMode::Normal).unwrap();
        let seeks_before = src.seek_count();
        assert_eq!(src.get(200, ReadMode::SoftAhead).unwrap(), ReadResult::Eob);
        assert_eq!(src.seek_count(), seeks_before);
    }

    #[test]
    fn soft_ahead_hits_when_resident() {
        let data: Vec<u8> = (0..32u8).collect();
        let mut src = source(&data, 16, 4);
        src.get(5, ReadMode::Normal).unwrap();
        assert_eq!(src.get(6, ReadMode::SoftAhead).unwrap(), ReadResult::Byte(6));
    }

    #[test]
    fn soft_ahead_known_eof_without_io() {
        let data = vec![1, 2, 3];
        let mut src = source(&data, 16, 4);
        src.get(0, ReadMode::Normal).unwrap();
        assert_eq!(src.get(50, ReadMode::SoftAhead).unwrap(), ReadResult::Eof);
    }
}
