//! Bindelta: heuristic binary diff/patch encoding in Rust.
//!
//! The crate provides:
//! - A rolling-hash look-ahead matcher (`engine`, `hash`)
//! - Random-access byte sources with hard/soft look-ahead (`source`)
//! - The escape-based patch wire format (`codec`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use bindelta::codec::{PatchEncoder, PatchApplier};
//! use bindelta::config::DiffOptions;
//! use bindelta::engine::DiffEngine;
//! use bindelta::source::SliceSource;
//!
//! let original = SliceSource::new(b"hello old world".to_vec());
//! let new = SliceSource::new(b"hello new world".to_vec());
//!
//! let mut patch = Vec::new();
//! let mut engine = DiffEngine::new(original, new, DiffOptions::default());
//! let mut encoder = PatchEncoder::new(&mut patch);
//! engine.diff(&mut encoder).unwrap();
//!
//! let mut reconstructed = Vec::new();
//! let mut original_reader = std::io::Cursor::new(b"hello old world".to_vec());
//! let mut patch_reader = std::io::Cursor::new(patch);
//! PatchApplier::apply(&mut patch_reader, &mut original_reader, &mut reconstructed).unwrap();
//! assert_eq!(reconstructed, b"hello new world");
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod io;
pub mod source;

#[cfg(feature = "cli")]
pub mod cli;
