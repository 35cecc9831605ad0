//! Turns the diff engine's operator callbacks into the escape-based wire
//! format. State (current open section, byte counters) lives on the
//! `PatchEncoder` instance rather than file-scope statics.

use std::io::{self, Write};

use super::varint::encode_varint;
use super::{BKT, DEL, EQL, ESC, INS, MOD};

/// Equal runs of this length or shorter are candidates for compacting into
/// the surrounding `MOD` run instead of opening their own `EQL` section.
pub const EQL_COMPACT_MAX: u64 = 4;

/// Callback surface the diff engine drives while producing a patch.
///
/// `eql`'s `bytes` gives the run's own byte values when `len <= 4` (used to
/// compact the run into a surrounding `MOD` section); for longer runs the
/// slice may be empty.
pub trait Sink {
    fn eql(&mut self, len: u64, bytes: &[u8]) -> io::Result<()>;
    fn mod_byte(&mut self, byte: u8) -> io::Result<()>;
    fn ins_byte(&mut self, byte: u8) -> io::Result<()>;
    fn del(&mut self, len: u64) -> io::Result<()>;
    fn bkt(&mut self, len: u64) -> io::Result<()>;
    fn finish(&mut self) -> io::Result<()>;
}

/// Running counts of bytes/sections emitted, surfaced to the `io` layer's
/// stats structs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    pub eql_bytes: u64,
    pub mod_bytes: u64,
    pub ins_bytes: u64,
    pub del_bytes: u64,
    pub bkt_bytes: u64,
    pub sections: u64,
}

pub struct PatchEncoder<W> {
    writer: W,
    /// The data section currently open (`MOD` or `INS`), if any — avoids
    /// re-emitting `ESC <op>` for consecutive bytes of the same run.
    current: Option<u8>,
    /// An `EQL` run held back until the next operator is known, so a short
    /// run sandwiched between `MOD` runs can be folded into them instead of
    /// opening its own section.
    pending_eql: Option<(u64, Vec<u8>)>,
    finished: bool,
    stats: EncoderStats,
}

impl<W: Write> PatchEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            current: None,
            pending_eql: None,
            finished: false,
            stats: EncoderStats::default(),
        }
    }

    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn open_data(&mut self, op: u8) -> io::Result<()> {
        if self.current != Some(op) {
            self.writer.write_all(&[ESC, op])?;
            self.current = Some(op);
            self.stats.sections += 1;
        }
        Ok(())
    }

    fn write_data_byte(&mut self, op: u8, byte: u8) -> io::Result<()> {
        self.open_data(op)?;
        if byte == ESC {
            self.writer.write_all(&[ESC, ESC])?;
        } else {
            self.writer.write_all(&[byte])?;
        }
        Ok(())
    }

    fn write_control(&mut self, op: u8, len: u64) -> io::Result<()> {
        self.current = None;
        self.writer.write_all(&[ESC, op])?;
        self.writer.write_all(&encode_varint(len))?;
        self.stats.sections += 1;
        Ok(())
    }

    /// Resolve a held-back `EQL` run now that the next operator (`next_is_mod`
    /// says whether it's `MOD`) is known. Longer than [`EQL_COMPACT_MAX`], or
    /// adjacent to `MOD` on neither side, it's written as a real `EQL`
    /// section; otherwise its bytes become more `MOD` data.
    fn flush_pending_eql(&mut self, next_is_mod: bool) -> io::Result<()> {
        let Some((len, bytes)) = self.pending_eql.take() else {
            return Ok(());
        };
        let prev_is_mod = self.current == Some(MOD);
        if len > EQL_COMPACT_MAX || (!prev_is_mod && !next_is_mod) {
            self.stats.eql_bytes += len;
            self.write_control(EQL, len)
        } else {
            self.stats.mod_bytes += len;
            for byte in bytes {
                self.write_data_byte(MOD, byte)?;
            }
            Ok(())
        }
    }
}

impl<W: Write> Sink for PatchEncoder<W> {
    fn eql(&mut self, len: u64, bytes: &[u8]) -> io::Result<()> {
        self.flush_pending_eql(false)?;
        if len == 0 {
            return Ok(());
        }
        let held = if len <= EQL_COMPACT_MAX {
            bytes.to_vec()
        } else {
            Vec::new()
        };
        self.pending_eql = Some((len, held));
        Ok(())
    }

    fn mod_byte(&mut self, byte: u8) -> io::Result<()> {
        self.flush_pending_eql(true)?;
        self.stats.mod_bytes += 1;
        self.write_data_byte(MOD, byte)
    }

    fn ins_byte(&mut self, byte: u8) -> io::Result<()> {
        self.flush_pending_eql(false)?;
        self.stats.ins_bytes += 1;
        self.write_data_byte(INS, byte)
    }

    fn del(&mut self, len: u64) -> io::Result<()> {
        self.flush_pending_eql(false)?;
        if len == 0 {
            return Ok(());
        }
        self.stats.del_bytes += len;
        self.write_control(DEL, len)
    }

    fn bkt(&mut self, len: u64) -> io::Result<()> {
        self.flush_pending_eql(false)?;
        if len == 0 {
            return Ok(());
        }
        self.stats.bkt_bytes += len;
        self.write_control(BKT, len)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.flush_pending_eql(false)?;
        if !self.finished {
            self.writer.write_all(&[ESC, ESC])?;
            self.finished = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_stream_is_just_eql_and_terminator() {
        let mut buf = Vec::new();
        {
            let mut enc = PatchEncoder::new(&mut buf);
            enc.eql(11, &[]).unwrap();
            enc.finish().unwrap();
        }
        assert_eq!(buf, vec![ESC, EQL, 0x0A, ESC, ESC]);
    }

    #[test]
    fn long_eql_runs_stay_real_sections_even_next_to_mod() {
        let mut buf = Vec::new();
        {
            let mut enc = PatchEncoder::new(&mut buf);
            enc.eql(5, &[]).unwrap();
            enc.mod_byte(b'X').unwrap();
            enc.mod_byte(b'X').unwrap();
            enc.eql(6, &[]).unwrap();
            enc.finish().unwrap();
        }
        assert_eq!(
            buf,
            vec![
                ESC, EQL, 0x04, ESC, MOD, b'X', b'X', ESC, EQL, 0x05, ESC, ESC
            ]
        );
    }

    #[test]
    fn short_eql_sandwiched_between_mod_runs_compacts_into_one_mod_section() {
        let mut buf = Vec::new();
        {
            let mut enc = PatchEncoder::new(&mut buf);
            enc.mod_byte(b'A').unwrap();
            enc.mod_byte(b'B').unwrap();
            enc.eql(2, b"CD").unwrap();
            enc.mod_byte(b'E').unwrap();
            enc.mod_byte(b'F').unwrap();
            enc.finish().unwrap();
        }
        assert_eq!(
            buf,
            vec![ESC, MOD, b'A', b'B', b'C', b'D', b'E', b'F', ESC, ESC]
        );
    }

    #[test]
    fn short_eql_not_adjacent_to_mod_stays_a_real_section() {
        let mut buf = Vec::new();
        {
            let mut enc = PatchEncoder::new(&mut buf);
            enc.eql(2, b"CD").unwrap();
            enc.ins_byte(b'Z').unwrap();
            enc.finish().unwrap();
        }
        assert_eq!(
            buf,
            vec![ESC, EQL, 0x01, ESC, INS, b'Z', ESC, ESC]
        );
    }

    #[test]
    fn escapes_literal_esc_bytes_in_data() {
        let mut buf = Vec::new();
        {
            let mut enc = PatchEncoder::new(&mut buf);
            enc.mod_byte(ESC).unwrap();
            enc.finish().unwrap();
        }
        assert_eq!(buf, vec![ESC, MOD, ESC, ESC, ESC, ESC]);
    }

    #[test]
    fn insert_run() {
        let mut buf = Vec::new();
        {
            let mut enc = PatchEncoder::new(&mut buf);
            enc.eql(9, &[]).unwrap();
            for b in b"ZZZ" {
                enc.ins_byte(*b).unwrap();
            }
            enc.finish().unwrap();
        }
        assert_eq!(
            buf,
            vec![ESC, EQL, 0x08, ESC, INS, b'Z', b'Z', b'Z', ESC, ESC]
        );
    }
}
