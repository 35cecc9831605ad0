use super::{ByteSource, ReadMode, ReadResult};
use crate::error::SourceError;

/// In-memory [`ByteSource`] over an owned byte buffer. Soft-ahead reads
/// always hit (the whole buffer is "resident"), matching the degenerate
/// case of an infinitely large buffer.
#[derive(Debug, Clone)]
pub struct SliceSource {
    data: Vec<u8>,
    seeks: u64,
}

impl SliceSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, seeks: 0 }
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ByteSource for SliceSource {
    fn get(&mut self, position: u64, _mode: ReadMode) -> Result<ReadResult, SourceError> {
        match usize::try_from(position) {
            Ok(idx) if idx < self.data.len() => Ok(ReadResult::Byte(self.data[idx])),
            _ => Ok(ReadResult::Eof),
        }
    }

    fn seek_count(&self) -> u64 {
        self.seeks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_in_bounds_bytes() {
        let mut src = SliceSource::new(vec![1, 2, 3]);
        assert_eq!(
            src.get(0, ReadMode::Normal).unwrap(),
            ReadResult::Byte(1)
        );
        assert_eq!(
            src.get(2, ReadMode::Normal).unwrap(),
            ReadResult::Byte(3)
        );
    }

    #[test]
    fn reads_past_end_are_eof() {
        let mut src = SliceSource::new(vec![1, 2, 3]);
        assert_eq!(src.get(3, ReadMode::Normal).unwrap(), ReadResult::Eof);
        assert_eq!(src.get(1000, ReadMode::SoftAhead).unwrap(), ReadResult::Eof);
    }
}
