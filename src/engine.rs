//! Orchestrates the two byte sources, the sample index, and the match
//! table into the operator stream a [`crate::codec::Sink`] turns into
//! bytes.
//!
//! The main loop and its look-ahead step are a direct, single-threaded
//! translation of the "compare, and when they differ, look ahead for the
//! nearest resynchronization point" algorithm: advance both cursors while
//! they agree; once they disagree, either keep consuming a look-ahead
//! budget accumulated by a previous search (emitting `MOD`/`INS` one byte
//! at a time) or run a fresh search and act on what it returns.

use crate::codec::Sink;
use crate::config::DiffOptions;
use crate::error::CoreError;
use crate::hash::{ahead_get, RollingState, SampleIndex, SMPSZE};
use crate::source::{ByteSource, ReadMode, ReadResult};

/// Whether `ORIGINAL` has been (or should be) fully indexed up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrescanState {
    Disabled,
    Pending,
    Done,
}

pub struct DiffEngine<O, N> {
    org: O,
    new: N,
    opts: DiffOptions,

    index: SampleIndex,
    table: crate::hash::MatchTable,

    read_org: u64,
    read_new: u64,

    /// Look-ahead cursor state on ORIGINAL. Only advanced by `find_ahead`
    /// when prescan is disabled; a position of 0 doubles as "never primed"
    /// (position 0 itself is never a meaningful look-ahead base, so this
    /// loses nothing).
    hash_org: RollingState,
    /// Look-ahead cursor state on NEW.
    hash_new: RollingState,

    scan_state: PrescanState,
}

impl<O: ByteSource, N: ByteSource> DiffEngine<O, N> {
    pub fn new(org: O, new: N, opts: DiffOptions) -> Self {
        let index = SampleIndex::new(opts.hash_capacity);
        let scan_state = if opts.prescan {
            PrescanState::Pending
        } else {
            PrescanState::Disabled
        };
        Self {
            org,
            new,
            opts,
            index,
            table: crate::hash::MatchTable::new(),
            read_org: 0,
            read_new: 0,
            hash_org: RollingState::new(0),
            hash_new: RollingState::new(0),
            scan_state,
        }
    }

    /// Run the full diff, driving `sink` with the operator stream. Returns
    /// `true` if any data bytes (`MOD`/`INS`/`DEL`/`BKT`) were emitted —
    /// `false` means the inputs were byte-identical.
    pub fn diff<S: Sink>(&mut self, sink: &mut S) -> Result<bool, CoreError> {
        let mut eql_run: u64 = 0;
        let mut eql_buf: Vec<u8> = Vec::with_capacity(crate::codec::EQL_COMPACT_MAX as usize);
        let mut ahead: i64 = 0;
        let mut found_previously = false;
        let mut any_difference = false;

        loop {
            let new_byte = self.new.get(self.read_new, ReadMode::Normal)?;
            let Some(nb) = new_byte.byte() else { break };
            let org_byte = self.org.get(self.read_org, ReadMode::Normal)?;

            if let Some(ob) = org_byte.byte() {
                if ob == nb {
                    eql_run += 1;
                    if eql_buf.len() < crate::codec::EQL_COMPACT_MAX as usize {
                        eql_buf.push(nb);
                    }
                    self.read_org += 1;
                    self.read_new += 1;
                    ahead -= 1;
                    continue;
                }
            }

            any_difference = true;

            if ahead > 0 {
                flush_eql(sink, &mut eql_run, &mut eql_buf)?;
                if org_byte.byte().is_some() {
                    sink.mod_byte(nb).map_err(wrap_write)?;
                    self.read_org += 1;
                } else {
                    sink.ins_byte(nb).map_err(wrap_write)?;
                }
                self.read_new += 1;
                ahead -= 1;
            } else if found_previously && ahead == 0 {
                // The previous search reported a match but the bytes right
                // here don't agree — a false positive survived
                // verification. Force a fixed-size advance instead of
                // immediately re-searching from the same position, which
                // could repeat the same bad match forever.
                ahead = SMPSZE as i64;
                found_previously = false;
            } else {
                flush_eql(sink, &mut eql_run, &mut eql_buf)?;
                let (skip_org, skip_new, next_ahead) = self.find_ahead()?;
                found_previously = true;

                if skip_org > 0 {
                    sink.del(skip_org as u64).map_err(wrap_write)?;
                    self.read_org += skip_org as u64;
                } else if skip_org < 0 {
                    sink.bkt((-skip_org) as u64).map_err(wrap_write)?;
                    self.read_org -= (-skip_org) as u64;
                }

                let mut remaining = skip_new;
                while remaining > 0 {
                    match self.new.get(self.read_new, ReadMode::Normal)? {
                        ReadResult::Byte(b) => {
                            sink.ins_byte(b).map_err(wrap_write)?;
                            self.read_new += 1;
                            remaining -= 1;
                        }
                        _ => break,
                    }
                }

                ahead = next_ahead;
            }
        }

        flush_eql(sink, &mut eql_run, &mut eql_buf)?;
        sink.finish().map_err(wrap_write)?;
        Ok(any_difference)
    }

    /// Look ahead from `(read_org, read_new)` for the nearest
    /// resynchronization point. Returns `(skip_org, skip_new, ahead)`:
    /// `skip_org` is the signed number of bytes to skip in ORIGINAL
    /// (positive `DEL`, negative `BKT`), `skip_new` the number of bytes to
    /// emit as `INS` before resuming comparison, and `ahead` the number of
    /// subsequent bytes the caller may trust as already aligned.
    fn find_ahead(&mut self) -> Result<(i64, u64, i64), CoreError> {
        if self.scan_state == PrescanState::Pending {
            self.prescan_original()?;
            self.scan_state = PrescanState::Done;
        }

        let reliability = self.index.reliability();
        let ahd_max = self.opts.ahd_max as i64;

        let mut max_bytes: i64 = if self.scan_state == PrescanState::Done {
            if self.hash_new.pos == 0 || (self.hash_new.pos as i64) < self.read_new as i64 {
                ahd_max
            } else if self.hash_new.pos as i64 > self.read_new as i64 + ahd_max {
                ahd_max
            } else {
                ahd_max - (self.hash_new.pos as i64 - self.read_new as i64)
            }
        } else {
            i64::MAX / 2
        };

        let back = if reliability < ahd_max {
            reliability / 2
        } else {
            ahd_max / 2
        };

        if self.scan_state == PrescanState::Disabled
            && (self.hash_org.pos == 0 || (self.hash_org.pos as i64) + back < self.read_org as i64)
        {
            let start = (self.read_org as i64 - back).max(0) as u64;
            self.hash_org = RollingState::prime(start, &mut self.org, ReadMode::HardAhead)?;
        }

        if self.hash_new.pos == 0 || (self.hash_new.pos as i64) + back < self.read_new as i64 {
            let start = (self.read_new as i64 - back).max(0) as u64;
            self.hash_new = RollingState::prime(start, &mut self.new, ReadMode::HardAhead)?;
            max_bytes += back - SMPSZE as i64;
        }

        let mut org_active = self.scan_state != PrescanState::Done;
        let mut new_active = true;

        if self.table.cleanup(self.read_new.saturating_sub(reliability.max(0) as u64)) {
            let base_org: u64 = if self.opts.allow_backtrack {
                0
            } else {
                self.read_org
            };
            let mut found_count: i64 = 0;

            while max_bytes > 0 && (org_active || new_active) {
                if org_active {
                    let prev_pos = self.hash_org.pos;
                    match ahead_get(&mut self.org, &mut self.hash_org, ReadMode::HardAhead)? {
                        ReadResult::Byte(_) => {
                            self.index.add(self.hash_org.hash, prev_pos, self.hash_org.eql_cnt);
                        }
                        _ => org_active = false,
                    }
                }

                if new_active {
                    let prev_pos = self.hash_new.pos;
                    match ahead_get(&mut self.new, &mut self.hash_new, ReadMode::HardAhead)? {
                        ReadResult::Byte(_) => {
                            if let Some(found_org) = self.index.get(self.hash_new.hash) {
                                if found_org > base_org {
                                    let outcome = self.table.add(
                                        found_org,
                                        prev_pos,
                                        self.read_new,
                                        self.hash_new.eql_cnt,
                                    );
                                    let counts = match outcome {
                                        crate::hash::AddResult::Full => {
                                            if back > 0 && self.table.cleanup(self.read_new) {
                                                true
                                            } else {
                                                max_bytes = 0;
                                                false
                                            }
                                        }
                                        crate::hash::AddResult::Added => true,
                                        crate::hash::AddResult::Enlarged => false,
                                    };
                                    if counts && prev_pos > self.read_new {
                                        found_count += 1;
                                        if found_count == self.opts.mch_max as i64 {
                                            max_bytes = 0;
                                        } else if found_count == self.opts.mch_min as i64
                                            && max_bytes > reliability
                                        {
                                            max_bytes = reliability;
                                        }
                                    }
                                }
                            }
                            max_bytes -= 1;
                        }
                        _ => new_active = false,
                    }
                } else {
                    max_bytes = 0;
                }
            }
        }

        let soft = !self.opts.compare_all;
        let found = self
            .table
            .get(self.read_org, self.read_new, reliability, soft, &mut self.org, &mut self.new)?;

        match found {
            None => {
                let raw = (self.hash_new.pos as i64 - self.read_new as i64) - reliability;
                Ok((0, 0, raw.max(SMPSZE as i64)))
            }
            Some((fnd_org, fnd_new)) => {
                let fnd_org = fnd_org as i64;
                let fnd_new = fnd_new as i64;
                let read_org = self.read_org as i64;
                let read_new = self.read_new as i64;

                if fnd_org >= read_org {
                    if fnd_org - read_org >= fnd_new - read_new {
                        let skip_org = (fnd_org - read_org) + (read_new - fnd_new);
                        Ok((skip_org, 0, fnd_new - read_new))
                    } else {
                        let skip_new = (fnd_new - read_new) + (read_org - fnd_org);
                        Ok((0, skip_new as u64, fnd_org - read_org))
                    }
                } else {
                    let raw_skip_org = (read_org - fnd_org) + (fnd_new - read_new);
                    self.hash_org = RollingState::new(0); // force reprime on next call
                    if raw_skip_org < read_org {
                        Ok((-raw_skip_org, 0, fnd_new - read_new))
                    } else {
                        let skip_new = raw_skip_org - read_org;
                        Ok((-read_org, skip_new as u64, (fnd_new - read_new) - skip_new))
                    }
                }
            }
        }
    }

    /// Physical seeks performed on the `ORIGINAL` source so far (statistics
    /// only).
    pub fn original_seeks(&self) -> u64 {
        self.org.seek_count()
    }

    /// Physical seeks performed on the `NEW` source so far (statistics
    /// only).
    pub fn new_seeks(&self) -> u64 {
        self.new.seek_count()
    }

    /// Stream all of ORIGINAL through the rolling hash, indexing every
    /// primed sample. Run once, before the first [`Self::find_ahead`]
    /// call, when prescan is enabled.
    fn prescan_original(&mut self) -> Result<(), CoreError> {
        let mut state = RollingState::prime(0, &mut self.org, ReadMode::HardAhead)?;
        loop {
            let prev_pos = state.pos;
            match ahead_get(&mut self.org, &mut state, ReadMode::HardAhead)? {
                ReadResult::Byte(_) => self.index.add(state.hash, prev_pos, state.eql_cnt),
                _ => break,
            }
        }
        self.hash_org = state;
        Ok(())
    }
}

fn flush_eql<S: Sink>(sink: &mut S, run: &mut u64, buf: &mut Vec<u8>) -> Result<(), CoreError> {
    if *run > 0 {
        sink.eql(*run, buf.as_slice()).map_err(wrap_write)?;
        *run = 0;
    }
    buf.clear();
    Ok(())
}

fn wrap_write(e: std::io::Error) -> CoreError {
    CoreError::Source(crate::error::SourceError::Write(e))
}
