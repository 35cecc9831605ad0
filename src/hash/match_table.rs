//! Bounded working set of candidate matches discovered during look-ahead,
//! and the selection logic that picks the "nearest-best" one.
//!
//! Match records live in a flat arena (`Vec<MatchRecord>`) addressed by
//! small integer indices rather than raw pointers: buckets and the free
//! list both thread through each record's `next` field, which serves one
//! role or the other depending on whether the record is currently in use.

use crate::error::SourceError;
use crate::source::{ByteSource, ReadMode, ReadResult};

use super::rolling::SMPSZE;

/// Hashtable-on-delta bucket count.
pub const MCH_PME: usize = 127;
/// Maximum number of live match records.
pub const MCH_MAX: usize = 256;

/// Length of the equal-byte streak that confirms a candidate match.
const CONFIRM_STREAK: i64 = SMPSZE as i64 - 8;

/// Selection fuzz: two candidates within this many bytes of `readNew` are
/// considered equally near.
const FZY: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Unknown,
    Colliding,
    Gliding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    Full,
    Added,
    Enlarged,
}

/// Outcome of a byte-compare verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    Equal { org: u64, new: u64 },
    SoftEob,
    Unequal,
}

#[derive(Debug, Clone, Copy)]
struct MatchRecord {
    /// Next record in this delta-bucket's chain, or (when this record sits
    /// on the free list instead) the next free index.
    next: Option<u32>,
    in_use: bool,
    hit_count: i32,
    kind: MatchKind,
    first_new: u64,
    last_new: u64,
    /// Set on creation or a colliding hit; a gliding hit never updates this.
    last_org: u64,
    delta: i64,
}

impl Default for MatchRecord {
    fn default() -> Self {
        Self {
            next: None,
            in_use: false,
            hit_count: 0,
            kind: MatchKind::Unknown,
            first_new: 0,
            last_new: 0,
            last_org: 0,
            delta: 0,
        }
    }
}

pub struct MatchTable {
    records: Vec<MatchRecord>,
    buckets: [Option<u32>; MCH_PME],
    free_head: Option<u32>,
    gliding: Option<u32>,
    gliding_delta: i64,
}

impl MatchTable {
    pub fn new() -> Self {
        let mut records = vec![MatchRecord::default(); MCH_MAX];
        for i in 0..MCH_MAX - 1 {
            records[i].next = Some((i + 1) as u32);
        }
        Self {
            records,
            buckets: [None; MCH_PME],
            free_head: Some(0),
            gliding: None,
            gliding_delta: 0,
        }
    }

    fn alloc(&mut self) -> Option<u32> {
        let idx = self.free_head?;
        self.free_head = self.records[idx as usize].next;
        Some(idx)
    }

    fn free(&mut self, idx: u32) {
        self.records[idx as usize] = MatchRecord {
            next: self.free_head,
            ..MatchRecord::default()
        };
        self.free_head = Some(idx);
    }

    /// Register one hash hit at `(org_pos, new_pos)`, with `base_new` the
    /// look-ahead base used only to decide `foundCount` bookkeeping at the
    /// call site (not consulted here) and `_eql_cnt` carried for parity
    /// with the source algorithm's signature.
    pub fn add(&mut self, org_pos: u64, new_pos: u64, _base_new: u64, _eql_cnt: u32) -> AddResult {
        let delta = org_pos as i64 - new_pos as i64;

        if let Some(g) = self.gliding {
            if delta == self.gliding_delta {
                let rec = &mut self.records[g as usize];
                rec.kind = MatchKind::Gliding;
                rec.hit_count += 1;
                rec.last_new = new_pos;
                self.gliding_delta -= 1;
                return AddResult::Enlarged;
            }
        }
        self.gliding = None;

        let bucket = (delta.unsigned_abs() as usize) % MCH_PME;
        let mut cur = self.buckets[bucket];
        while let Some(idx) = cur {
            let next = self.records[idx as usize].next;
            if self.records[idx as usize].delta == delta {
                let rec = &mut self.records[idx as usize];
                rec.hit_count += 1;
                rec.kind = MatchKind::Colliding;
                rec.last_new = new_pos;
                rec.last_org = org_pos;
                return AddResult::Enlarged;
            }
            cur = next;
        }

        let Some(idx) = self.alloc() else {
            return AddResult::Full;
        };
        self.records[idx as usize] = MatchRecord {
            next: self.buckets[bucket],
            in_use: true,
            hit_count: 1,
            kind: MatchKind::Unknown,
            first_new: new_pos,
            last_new: new_pos,
            last_org: org_pos,
            delta,
        };
        self.buckets[bucket] = Some(idx);
        self.gliding = Some(idx);
        self.gliding_delta = delta - 1;
        AddResult::Added
    }

    /// Remove stale or dead records (`hitCount == 0` or `lastNewPos <
    /// min_new_pos`). Returns whether any free slot remains afterward.
    pub fn cleanup(&mut self, min_new_pos: u64) -> bool {
        for bucket in 0..MCH_PME {
            let mut cur = self.buckets[bucket];
            let mut prev: Option<u32> = None;
            while let Some(idx) = cur {
                let next = self.records[idx as usize].next;
                let dead = self.records[idx as usize].hit_count == 0
                    || self.records[idx as usize].last_new < min_new_pos;
                if dead {
                    match prev {
                        Some(p) => self.records[p as usize].next = next,
                        None => self.buckets[bucket] = next,
                    }
                    if self.gliding == Some(idx) {
                        self.gliding = None;
                    }
                    self.free(idx);
                    cur = next;
                } else {
                    prev = Some(idx);
                    cur = next;
                }
            }
        }
        self.free_head.is_some()
    }

    /// Select the best surviving candidate near `(read_org, read_new)`,
    /// verifying each with [`check`].
    pub fn get<O: ByteSource, N: ByteSource>(
        &mut self,
        read_org: u64,
        read_new: u64,
        reliability: i64,
        soft: bool,
        org_src: &mut O,
        new_src: &mut N,
    ) -> Result<Option<(u64, u64)>, SourceError> {
        // Sentinel worse than any real status (0 = exact, 1 = degraded via
        // SoftEob); see the open-question note on uninitialized best-status.
        const WORSE_THAN_ANY: i32 = i32::MAX;

        let mut best: Option<(u64, u64, i32, i32)> = None; // (org, new, hit_count, status)

        for bucket in 0..MCH_PME {
            let mut cur = self.buckets[bucket];
            while let Some(idx) = cur {
                let next = self.records[idx as usize].next;
                let rec = self.records[idx as usize];

                if rec.hit_count == 0 || (rec.last_new as i64) + reliability < read_new as i64 {
                    cur = next;
                    continue;
                }

                let test_new_floor = rec.first_new.saturating_sub(reliability.max(0) as u64);
                let test_new = test_new_floor.max(read_new);
                let distance =
                    reliability.max(rec.first_new as i64 - test_new as i64).max(1);

                let mut test_org = test_new as i64 + rec.delta;
                let mut adj_test_new = test_new;
                if test_org < 0 {
                    adj_test_new = (test_new as i64 - test_org) as u64;
                    test_org = 0;
                }
                if rec.kind == MatchKind::Gliding
                    && adj_test_new >= rec.first_new
                    && adj_test_new <= rec.last_new
                {
                    test_org = rec.last_org as i64;
                }

                let result = check(
                    org_src,
                    new_src,
                    test_org as u64,
                    adj_test_new,
                    distance,
                    soft,
                )?;

                let (candidate, status) = match result {
                    CheckResult::Equal { org, new } => (Some((org, new)), 0),
                    CheckResult::SoftEob if rec.hit_count >= 2 => {
                        (Some((test_org as u64, adj_test_new)), 1)
                    }
                    CheckResult::SoftEob => (None, WORSE_THAN_ANY),
                    CheckResult::Unequal => {
                        self.records[idx as usize].hit_count -= 1;
                        (None, WORSE_THAN_ANY)
                    }
                };

                if let Some((cand_org, cand_new)) = candidate {
                    let hit_count = self.records[idx as usize].hit_count;
                    let better = match best {
                        None => true,
                        Some((_, best_new, best_hits, best_status)) => {
                            let cand_dist = (cand_new as i64 - read_new as i64).abs();
                            let best_dist = (best_new as i64 - read_new as i64).abs();
                            if cand_dist + FZY < best_dist {
                                true
                            } else if best_dist + FZY < cand_dist {
                                false
                            } else {
                                hit_count > best_hits && status <= best_status
                            }
                        }
                    };
                    if better {
                        best = Some((cand_org, cand_new, hit_count, status));
                    }
                }

                cur = next;
            }
        }

        Ok(best.map(|(org, new, _, _)| (org, new)))
    }
}

impl Default for MatchTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify a candidate match by byte-comparing `length` bytes starting at
/// `(org, new)`, confirming on a run of `CONFIRM_STREAK` consecutive equal
/// bytes.
pub fn check<O: ByteSource, N: ByteSource>(
    org_src: &mut O,
    new_src: &mut N,
    org: u64,
    new: u64,
    length: i64,
    soft: bool,
) -> Result<CheckResult, SourceError> {
    let mode = if soft {
        ReadMode::SoftAhead
    } else {
        ReadMode::HardAhead
    };

    let mut org_pos = org;
    let mut new_pos = new;
    let mut streak: i64 = 0;
    let mut remaining = length;

    while remaining > 0 {
        let ro = org_src.get(org_pos, mode)?;
        let rn = new_src.get(new_pos, mode)?;

        match (ro, rn) {
            (ReadResult::Byte(a), ReadResult::Byte(b)) if a == b => {
                streak += 1;
                org_pos += 1;
                new_pos += 1;
                remaining -= 1;
                if streak >= CONFIRM_STREAK {
                    return Ok(CheckResult::Equal {
                        org: org_pos - streak as u64,
                        new: new_pos - streak as u64,
                    });
                }
            }
            (ReadResult::Eob, _) | (_, ReadResult::Eob) => return Ok(CheckResult::SoftEob),
            _ => return Ok(CheckResult::Unequal),
        }
    }
    Ok(CheckResult::Unequal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SliceSource;

    #[test]
    fn add_first_hit_creates_record_and_gliding_candidate() {
        let mut table = MatchTable::new();
        assert_eq!(table.add(100, 10, 0, 0), AddResult::Added);
    }

    #[test]
    fn repeated_delta_collides() {
        let mut table = MatchTable::new();
        assert_eq!(table.add(100, 10, 0, 0), AddResult::Added);
        assert_eq!(table.add(100, 10, 0, 0), AddResult::Enlarged);
    }

    #[test]
    fn decreasing_delta_glides() {
        let mut table = MatchTable::new();
        assert_eq!(table.add(100, 10, 0, 0), AddResult::Added);
        // Next hit one byte further along NEW but ORIGINAL also one byte
        // further keeps the same delta -> that's a collision, not a glide.
        // A glide is when org stays while new advances, decreasing delta.
        assert_eq!(table.add(100, 11, 0, 0), AddResult::Enlarged);
    }

    #[test]
    fn cleanup_removes_stale_and_frees_slot() {
        let mut table = MatchTable::new();
        table.add(100, 10, 0, 0);
        assert!(table.cleanup(1000));
    }

    #[test]
    fn full_table_reports_full() {
        let mut table = MatchTable::new();
        for i in 0..MCH_MAX {
            let res = table.add(1_000_000 + i as u64 * 131, i as u64, 0, 0);
            assert_ne!(res, AddResult::Full, "ran out of slots early at {i}");
        }
        let res = table.add(99_999_999, 99_999, 0, 0);
        assert_eq!(res, AddResult::Full);
    }

    #[test]
    fn check_confirms_on_streak() {
        let data: Vec<u8> = (0..64u8).collect();
        let mut org = SliceSource::new(data.clone());
        let mut new = SliceSource::new(data);
        let result = check(&mut org, &mut new, 0, 0, 40, false).unwrap();
        assert!(matches!(result, CheckResult::Equal { org: 0, new: 0 }));
    }

    #[test]
    fn check_reports_unequal_on_mismatched_data() {
        let mut org = SliceSource::new(vec![1, 2, 3, 4]);
        let mut new = SliceSource::new(vec![9, 9, 9, 9]);
        let result = check(&mut org, &mut new, 0, 0, 4, false).unwrap();
        assert_eq!(result, CheckResult::Unequal);
    }

    #[test]
    fn get_selects_nearest_confirmed_candidate() {
        let mut table = MatchTable::new();
        let data: Vec<u8> = (0..200u8).collect();
        // delta = org - new = 50 for a long run starting near position 0.
        table.add(50, 0, 0, 0);
        table.add(50, 0, 0, 0);
        table.add(50, 0, 0, 0);

        let mut org = SliceSource::new(data.clone());
        let mut new_data = vec![0u8; 200];
        new_data[0..150].copy_from_slice(&data[50..200]);
        let mut new = SliceSource::new(new_data);

        let found = table.get(0, 0, 48, false, &mut org, &mut new).unwrap();
        assert!(found.is_some());
    }
}
