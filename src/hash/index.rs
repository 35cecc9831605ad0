//! Open-addressed, one-probe sample index over `ORIGINAL`'s rolling-hash
//! keys. Deliberately lossy: collisions silently overwrite according to a
//! throttled acceptance policy so that, as the table fills, sampling stays
//! roughly uniform across the whole file rather than front-loaded.

use super::rolling::SMPSZE;

/// Descending list of primes; the largest prime not exceeding the
/// requested capacity is chosen as the table size.
const PRIMES: &[u64] = &[
    134_217_689,
    67_108_859,
    33_554_393,
    16_777_213,
    8_388_593,
    4_194_301,
    2_097_143,
    1_048_573,
    524_287,
    262_139,
    131_071,
    65_521,
    32_749,
    16_381,
    8_191,
    4_093,
    2_039,
    1_021,
    509,
    251,
];

fn prime_for_capacity(requested: u64) -> u64 {
    PRIMES
        .iter()
        .copied()
        .find(|&p| p <= requested)
        .unwrap_or(*PRIMES.last().unwrap())
}

/// A single sample-index slot: `(hash key, ORIGINAL position)`. The all-zero
/// slot means "empty" (position 0 of ORIGINAL is never legitimately
/// indexed, so this is an acceptable loss rather than an ambiguity).
#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    key: u32,
    pos: u64,
}

pub struct SampleIndex {
    slots: Vec<Slot>,
    prime: u64,
    col_thr: i64,
    col_cnt: i64,
    reliability: i64,
    load_cnt: u64,
}

impl SampleIndex {
    /// Build an index sized to the largest prime at or below
    /// `requested_capacity`.
    pub fn new(requested_capacity: usize) -> Self {
        let prime = prime_for_capacity(requested_capacity as u64);
        Self {
            slots: vec![Slot::default(); prime as usize],
            prime,
            col_thr: 4,
            col_cnt: 0,
            reliability: 48,
            load_cnt: 0,
        }
    }

    pub fn capacity(&self) -> u64 {
        self.prime
    }

    pub fn reliability(&self) -> i64 {
        self.reliability
    }

    /// Insert `(key, position)`, subject to a collision-override throttle:
    /// the insertion rate decreases as the table fills, so sampling stays
    /// approximately uniform regardless of input size.
    pub fn add(&mut self, key: u32, position: u64, eql_cnt: u32) {
        self.load_cnt += 1;
        if self.load_cnt % self.prime == 0 {
            self.col_thr += 4;
            self.reliability += 4;
        }

        if eql_cnt <= SMPSZE - 4 {
            self.col_cnt += 4;
        } else {
            self.col_cnt += 1;
        }

        if self.col_cnt >= self.col_thr {
            let idx = (key as u64 % self.prime) as usize;
            self.slots[idx] = Slot { key, pos: position };
            self.col_cnt = 0;
        }
    }

    /// Single-probe lookup: the stored key must match exactly. Collisions
    /// are never chained — a caller must verify via byte-compare, since
    /// equal keys do not imply equal windows.
    pub fn get(&self, key: u32) -> Option<u64> {
        let idx = (key as u64 % self.prime) as usize;
        let slot = self.slots[idx];
        if slot.key == key { Some(slot.pos) } else { None }
    }
}
