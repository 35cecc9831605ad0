//! Rolling-hash sample index and the look-ahead match table built on top
//! of it.

mod index;
mod match_table;
mod rolling;

pub use index::SampleIndex;
pub use match_table::{AddResult, CheckResult, MatchKind, MatchTable};
pub use rolling::{RollingState, SMPSZE, ahead_get, update_hash};
