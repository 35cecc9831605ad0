//! File-level convenience layer around the diff engine and patch codec.
//!
//! Opens files with buffered I/O, drives the streaming core, and hands back
//! a stats struct the CLI can print or serialize.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::{debug, info};

use crate::codec::{PatchApplier, PatchEncoder};
use crate::config::DiffOptions;
use crate::engine::DiffEngine;
use crate::error::{CoreError, SourceError};
use crate::source::BufferedByteSource;

const OUTPUT_BUFFER: usize = 64 * 1024;

/// Statistics returned by [`diff_files`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub original_size: u64,
    pub new_size: u64,
    pub patch_size: u64,
    pub eql_bytes: u64,
    pub mod_bytes: u64,
    pub ins_bytes: u64,
    pub del_bytes: u64,
    pub bkt_bytes: u64,
    pub sections: u64,
    pub original_seeks: u64,
    pub new_seeks: u64,
    /// `false` if the two inputs were byte-identical (no data bytes written).
    pub changed: bool,
}

/// Statistics returned by [`patch_files`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub original_size: u64,
    pub patch_size: u64,
    pub output_size: u64,
}

fn open_read(path: &Path) -> Result<File, CoreError> {
    File::open(path).map_err(|e| CoreError::Source(SourceError::Read(e)))
}

fn create_write(path: &Path) -> Result<File, CoreError> {
    File::create(path).map_err(|e| CoreError::Source(SourceError::Write(e)))
}

fn file_size(file: &File) -> Result<u64, CoreError> {
    file.metadata()
        .map(|m| m.len())
        .map_err(|e| CoreError::Source(SourceError::Read(e)))
}

/// Diff `original_path` against `new_path`, writing the patch to
/// `patch_path`.
pub fn diff_files(
    original_path: &Path,
    new_path: &Path,
    patch_path: &Path,
    opts: &DiffOptions,
) -> Result<DiffStats, CoreError> {
    let original_file = open_read(original_path)?;
    let new_file = open_read(new_path)?;
    let original_size = file_size(&original_file)?;
    let new_size = file_size(&new_file)?;

    debug!(
        "diffing {} ({original_size} bytes) against {} ({new_size} bytes)",
        original_path.display(),
        new_path.display()
    );

    let org_src = BufferedByteSource::with_sizes(original_file, opts.buffer_size, opts.block_size);
    let new_src = BufferedByteSource::with_sizes(new_file, opts.buffer_size, opts.block_size);
    let mut engine = DiffEngine::new(org_src, new_src, opts.clone());

    let patch_file = create_write(patch_path)?;
    let mut writer = BufWriter::with_capacity(OUTPUT_BUFFER, patch_file);
    let (changed, stats, original_seeks, new_seeks) = {
        let mut encoder = PatchEncoder::new(&mut writer);
        let changed = engine.diff(&mut encoder)?;
        (changed, encoder.stats(), engine.original_seeks(), engine.new_seeks())
    };
    writer
        .flush()
        .map_err(|e| CoreError::Source(SourceError::Write(e)))?;
    let patch_size = file_size(&open_read(patch_path)?)?;

    info!(
        "{}: eql={} mod={} ins={} del={} bkt={} sections={} patch_size={patch_size}",
        patch_path.display(),
        stats.eql_bytes,
        stats.mod_bytes,
        stats.ins_bytes,
        stats.del_bytes,
        stats.bkt_bytes,
        stats.sections,
    );

    Ok(DiffStats {
        original_size,
        new_size,
        patch_size,
        eql_bytes: stats.eql_bytes,
        mod_bytes: stats.mod_bytes,
        ins_bytes: stats.ins_bytes,
        del_bytes: stats.del_bytes,
        bkt_bytes: stats.bkt_bytes,
        sections: stats.sections,
        original_seeks,
        new_seeks,
        changed,
    })
}

/// Apply `patch_path` against `original_path`, writing the reconstructed
/// bytes to `output_path`.
pub fn patch_files(
    original_path: &Path,
    patch_path: &Path,
    output_path: &Path,
) -> Result<PatchStats, CoreError> {
    let mut original_file = open_read(original_path)?;
    let original_size = file_size(&original_file)?;
    let patch_file = open_read(patch_path)?;
    let patch_size = file_size(&patch_file)?;
    let mut patch_reader = BufReader::with_capacity(OUTPUT_BUFFER, patch_file);

    debug!(
        "patching {} ({original_size} bytes) with {} ({patch_size} bytes)",
        original_path.display(),
        patch_path.display()
    );

    let output_file = create_write(output_path)?;
    let mut writer = BufWriter::with_capacity(OUTPUT_BUFFER, output_file);

    PatchApplier::apply(&mut patch_reader, &mut original_file, &mut writer)?;
    writer
        .flush()
        .map_err(|e| CoreError::Source(SourceError::Write(e)))?;

    let output_size = file_size(&File::open(output_path).map_err(|e| CoreError::Source(SourceError::Read(e)))?)?;

    info!("{}: output_size={output_size}", output_path.display());

    Ok(PatchStats {
        original_size,
        patch_size,
        output_size,
    })
}
