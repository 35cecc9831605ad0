//! Incremental 32-bit rolling hash over a sliding SMPSZE-byte window, plus
//! the equality-run counter used to flag low-quality (repetitive) samples.

use crate::error::SourceError;
use crate::source::{ByteSource, ReadMode, ReadResult};

/// Sample window size, in bytes.
pub const SMPSZE: u32 = 32;

/// Advance a hash by one byte: `h' = h * 2 + b (mod 2^32)`.
#[inline]
pub fn update_hash(hash: u32, byte: u8) -> u32 {
    hash.wrapping_mul(2).wrapping_add(byte as u32)
}

/// Mutable state threaded through the diff engine's two cursors (original
/// and new): the rolling hash itself, the previously read byte (to detect
/// equal-byte runs), the equality counter, and the logical position.
///
/// Modeled as an owned struct per the "mutable previous byte threading"
/// design note, rather than passing `&mut` scalars around.
#[derive(Debug, Clone, Copy)]
pub struct RollingState {
    pub hash: u32,
    prev_byte: Option<u8>,
    pub eql_cnt: u32,
    pub pos: u64,
}

impl RollingState {
    pub fn new(pos: u64) -> Self {
        Self {
            hash: 0,
            prev_byte: None,
            eql_cnt: 0,
            pos,
        }
    }

    /// Feed one byte into the hash, updating the equality counter: `+1`
    /// (capped at `SMPSZE`) if equal to the previous byte, else `-2`
    /// (floored at 0).
    fn advance(&mut self, byte: u8) {
        match self.prev_byte {
            Some(p) if p == byte => self.eql_cnt = (self.eql_cnt + 1).min(SMPSZE),
            Some(_) => self.eql_cnt = self.eql_cnt.saturating_sub(2),
            None => {}
        }
        self.hash = update_hash(self.hash, byte);
        self.prev_byte = Some(byte);
        self.pos += 1;
    }

    /// Prime the state by feeding `SMPSZE - 1` bytes starting at `pos`,
    /// without yet producing a usable sample key. Used when restarting the
    /// hash at a new base position.
    pub fn prime<S: ByteSource>(
        pos: u64,
        source: &mut S,
        mode: ReadMode,
    ) -> Result<Self, SourceError> {
        let mut state = Self::new(pos);
        for _ in 0..SMPSZE - 1 {
            match source.get(state.pos, mode)? {
                ReadResult::Byte(b) => state.advance(b),
                ReadResult::Eof | ReadResult::Eob => break,
            }
        }
        Ok(state)
    }
}

/// Read one byte at `state.pos` and fold it into the rolling hash and
/// equality counter. Returns the raw [`ReadResult`] so callers can react to
/// `Eof`/`Eob` without the state having been mutated for a byte that was
/// never actually read.
pub fn ahead_get<S: ByteSource>(
    source: &mut S,
    state: &mut RollingState,
    mode: ReadMode,
) -> Result<ReadResult, SourceError> {
    let result = source.get(state.pos, mode)?;
    if let ReadResult::Byte(b) = result {
        state.advance(b);
    }
    Ok(result)
}
