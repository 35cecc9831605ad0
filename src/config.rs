//! Tunables consumed by the diff engine. No named speed presets — callers
//! set fields directly or take the defaults.

/// Default sample-index capacity requested from [`crate::hash::SampleIndex`].
pub const DEFAULT_HASH_CAPACITY: usize = 1_048_573;

/// Default per-file look-ahead buffer size, in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

/// Default physical read block size, in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024;

/// Default bytes to look ahead per `find_ahead` call.
pub const DEFAULT_AHEAD_MAX: u64 = 256 * 1024;

#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Requested sample-index capacity; rounded down to a prime from the
    /// fixed list.
    pub hash_capacity: usize,
    /// Per-file look-ahead buffer size.
    pub buffer_size: usize,
    /// Physical read block size.
    pub block_size: usize,
    /// Minimum number of hits gathered before selection truncates its
    /// remaining look-ahead budget.
    pub mch_min: usize,
    /// Maximum number of hits gathered before look-ahead stops early.
    pub mch_max: usize,
    /// Bytes to look ahead per `find_ahead` call.
    pub ahd_max: u64,
    /// If false, suppresses `BKT` emission (matches are never sought
    /// behind the current read cursor).
    pub allow_backtrack: bool,
    /// If true, fully index `ORIGINAL` before the first `find_ahead` call.
    pub prescan: bool,
    /// If true, verification byte-compares use `HardAhead`; if false,
    /// `SoftAhead` (faster, occasionally misses).
    pub compare_all: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            hash_capacity: DEFAULT_HASH_CAPACITY,
            buffer_size: DEFAULT_BUFFER_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
            mch_min: 4,
            mch_max: 8,
            ahd_max: DEFAULT_AHEAD_MAX,
            allow_backtrack: true,
            prescan: true,
            compare_all: true,
        }
    }
}
