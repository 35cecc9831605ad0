//! Command-line front end: `diff`, `patch`, and `info` subcommands, built on
//! clap's derive API and wired to `io::diff_files`/`io::patch_files`.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::codec::{self, decode_varint};
use crate::config::DiffOptions;
use crate::error::CoreError;
use crate::io::{self, DiffStats, PatchStats};

const DEFAULT_HASH_CAPACITY: u64 = crate::config::DEFAULT_HASH_CAPACITY as u64;
const DEFAULT_BUFFER_SIZE: u64 = crate::config::DEFAULT_BUFFER_SIZE as u64;
const DEFAULT_BLOCK_SIZE: u64 = crate::config::DEFAULT_BLOCK_SIZE as u64;
const DEFAULT_AHEAD_MAX: u64 = crate::config::DEFAULT_AHEAD_MAX;

// ---------------------------------------------------------------------------
// Byte size parsing (supports K, M, G suffixes)
// ---------------------------------------------------------------------------

fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty size string".into());
    }
    let (num_part, multiplier) = match s.as_bytes().last() {
        Some(b'k' | b'K') => (&s[..s.len() - 1], 1024u64),
        Some(b'm' | b'M') => (&s[..s.len() - 1], 1024 * 1024),
        Some(b'g' | b'G') => (&s[..s.len() - 1], 1024 * 1024 * 1024),
        _ => (s, 1u64),
    };
    let num: u64 = num_part
        .trim()
        .parse()
        .map_err(|e| format!("invalid size '{s}': {e}"))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("size overflow: '{s}'"))
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Heuristic binary diff/patch tool.
#[derive(Parser, Debug)]
#[command(
    name = "bindelta",
    version,
    about = "Heuristic binary diff/patch tool",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print stats as JSON to stdout.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Produce a patch turning ORIGINAL into NEW.
    Diff(DiffArgs),
    /// Apply PATCH to ORIGINAL, writing OUTPUT.
    Patch(PatchArgs),
    /// Print a summary of a patch file's operator sections.
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Original (source) file.
    #[arg(value_hint = ValueHint::FilePath)]
    original: PathBuf,
    /// New (target) file.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,
    /// Patch output file.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,

    /// Requested sample-index capacity (rounded down to a fixed prime).
    #[arg(long = "hash-capacity", value_parser = parse_byte_size, default_value_t = DEFAULT_HASH_CAPACITY)]
    hash_capacity: u64,
    /// Per-file look-ahead buffer size (supports K/M/G suffix).
    #[arg(long = "buffer-size", value_parser = parse_byte_size, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: u64,
    /// Physical read block size (supports K/M/G suffix).
    #[arg(long = "block-size", value_parser = parse_byte_size, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u64,
    /// Minimum hits gathered before look-ahead selection truncates its budget.
    #[arg(long = "mch-min", default_value_t = 4)]
    mch_min: usize,
    /// Maximum hits gathered before look-ahead stops early.
    #[arg(long = "mch-max", default_value_t = 8)]
    mch_max: usize,
    /// Bytes to look ahead per search (supports K/M/G suffix).
    #[arg(long = "ahead-max", value_parser = parse_byte_size, default_value_t = DEFAULT_AHEAD_MAX)]
    ahead_max: u64,
    /// Never seek behind the current read cursor for a match (suppresses `BKT`).
    #[arg(long = "no-backtrack")]
    no_backtrack: bool,
    /// Skip fully indexing ORIGINAL before the first search.
    #[arg(long = "no-prescan")]
    no_prescan: bool,
    /// Use faster, occasionally-missing verification reads.
    #[arg(long = "soft-compare")]
    soft_compare: bool,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Original (source) file.
    #[arg(value_hint = ValueHint::FilePath)]
    original: PathBuf,
    /// Patch file to apply.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
    /// Reconstructed output file.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Patch file to summarize.
    #[arg(value_hint = ValueHint::FilePath)]
    patch: PathBuf,
}

impl DiffArgs {
    fn to_options(&self) -> DiffOptions {
        DiffOptions {
            hash_capacity: self.hash_capacity as usize,
            buffer_size: self.buffer_size as usize,
            block_size: self.block_size as usize,
            mch_min: self.mch_min,
            mch_max: self.mch_max,
            ahd_max: self.ahead_max,
            allow_backtrack: !self.no_backtrack,
            prescan: !self.no_prescan,
            compare_all: !self.soft_compare,
        }
    }
}

// ---------------------------------------------------------------------------
// diff
// ---------------------------------------------------------------------------

fn cmd_diff(args: &DiffArgs, json: bool, verbose: u8, quiet: bool) -> i32 {
    let opts = args.to_options();
    match io::diff_files(&args.original, &args.new, &args.patch, &opts) {
        Ok(stats) => {
            if verbose > 0 && !quiet {
                print_diff_stats(&stats);
            }
            if json {
                println!("{}", diff_stats_json(&stats));
            }
            if stats.changed { 0 } else { 1 }
        }
        Err(e) => report_error("diff", &e),
    }
}

fn print_diff_stats(stats: &DiffStats) {
    eprintln!(
        "bindelta: diff: original={} new={} patch={} eql={} mod={} ins={} del={} bkt={} sections={}",
        stats.original_size,
        stats.new_size,
        stats.patch_size,
        stats.eql_bytes,
        stats.mod_bytes,
        stats.ins_bytes,
        stats.del_bytes,
        stats.bkt_bytes,
        stats.sections,
    );
}

fn diff_stats_json(stats: &DiffStats) -> String {
    let json = serde_json::json!({
        "command": "diff",
        "original_size": stats.original_size,
        "new_size": stats.new_size,
        "patch_size": stats.patch_size,
        "eql_bytes": stats.eql_bytes,
        "mod_bytes": stats.mod_bytes,
        "ins_bytes": stats.ins_bytes,
        "del_bytes": stats.del_bytes,
        "bkt_bytes": stats.bkt_bytes,
        "sections": stats.sections,
        "changed": stats.changed,
    });
    serde_json::to_string_pretty(&json).unwrap()
}

// ---------------------------------------------------------------------------
// patch
// ---------------------------------------------------------------------------

fn cmd_patch(args: &PatchArgs, json: bool, verbose: u8, quiet: bool) -> i32 {
    match io::patch_files(&args.original, &args.patch, &args.output) {
        Ok(stats) => {
            if verbose > 0 && !quiet {
                eprintln!(
                    "bindelta: patch: original={} patch={} output={}",
                    stats.original_size, stats.patch_size, stats.output_size
                );
            }
            if json {
                println!("{}", patch_stats_json(&stats));
            }
            0
        }
        Err(e) => report_error("patch", &e),
    }
}

fn patch_stats_json(stats: &PatchStats) -> String {
    let json = serde_json::json!({
        "command": "patch",
        "original_size": stats.original_size,
        "patch_size": stats.patch_size,
        "output_size": stats.output_size,
    });
    serde_json::to_string_pretty(&json).unwrap()
}

// ---------------------------------------------------------------------------
// info
// ---------------------------------------------------------------------------

fn cmd_info(args: &InfoArgs) -> i32 {
    let file = match File::open(&args.patch) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("bindelta: {}: {e}", args.patch.display());
            return 8;
        }
    };
    match summarize_patch(BufReader::new(file)) {
        Ok(summary) => {
            println!("sections:  {}", summary.sections);
            println!("eql bytes: {}", summary.eql_bytes);
            println!("mod bytes: {}", summary.mod_bytes);
            println!("ins bytes: {}", summary.ins_bytes);
            println!("del bytes: {}", summary.del_bytes);
            println!("bkt bytes: {}", summary.bkt_bytes);
            0
        }
        Err(e) => report_error("info", &e),
    }
}

#[derive(Debug, Default)]
struct PatchSummary {
    sections: u64,
    eql_bytes: u64,
    mod_bytes: u64,
    ins_bytes: u64,
    del_bytes: u64,
    bkt_bytes: u64,
}

/// One byte of push-back over a `Read`, needed to resolve the same `ESC ESC`
/// ambiguity `PatchApplier` resolves (see `codec::applier`).
struct PeekCursor<R> {
    inner: R,
    pending: Option<u8>,
}

impl<R: Read> PeekCursor<R> {
    fn new(inner: R) -> Self {
        Self { inner, pending: None }
    }

    fn next(&mut self) -> Result<Option<u8>, CoreError> {
        if let Some(b) = self.pending.take() {
            return Ok(Some(b));
        }
        let mut buf = [0u8; 1];
        match self
            .inner
            .read(&mut buf)
            .map_err(|e| CoreError::Source(crate::error::SourceError::Read(e)))?
        {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    fn push_back(&mut self, b: u8) {
        self.pending = Some(b);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    AwaitingSection,
    InData(u8),
}

/// Stream a patch file's section headers, without needing ORIGINAL on hand.
/// Flat state machine mirroring `codec::applier::PatchApplier::apply`'s,
/// counting bytes instead of writing them.
fn summarize_patch<R: Read>(reader: R) -> Result<PatchSummary, CoreError> {
    let mut cur = PeekCursor::new(reader);
    let mut summary = PatchSummary::default();
    let mut state = ScanState::AwaitingSection;

    loop {
        let Some(b) = cur.next()? else {
            return Err(CoreError::MalformedPatch(
                "patch stream ended without a terminator".into(),
            ));
        };

        match state {
            ScanState::AwaitingSection => {
                if b != codec::ESC {
                    return Err(CoreError::MalformedPatch(format!(
                        "expected ESC at section boundary, got {b:#04x}"
                    )));
                }
                let Some(op) = cur.next()? else {
                    return Err(CoreError::MalformedPatch("patch stream ended after ESC".into()));
                };
                if op == codec::ESC {
                    break;
                }
                state = enter_section(op, &mut cur, &mut summary)?;
            }
            ScanState::InData(op) => {
                if b != codec::ESC {
                    bump(&mut summary, op, 1);
                    continue;
                }
                let Some(next) = cur.next()? else {
                    return Err(CoreError::MalformedPatch(
                        "patch stream ended after ESC inside a data section".into(),
                    ));
                };
                if next != codec::ESC {
                    state = enter_section(next, &mut cur, &mut summary)?;
                    continue;
                }
                match cur.next()? {
                    None => break, // true terminator
                    Some(byte3) => {
                        bump(&mut summary, op, 1);
                        cur.push_back(byte3);
                    }
                }
            }
        }
    }
    Ok(summary)
}

/// Handle an op byte just seen after `ESC`: open a data section, fully
/// consume a control section, or tolerate an unknown op as a no-op.
fn enter_section<R: Read>(op: u8, cur: &mut PeekCursor<R>, summary: &mut PatchSummary) -> Result<ScanState, CoreError> {
    match op {
        codec::MOD | codec::INS => {
            summary.sections += 1;
            Ok(ScanState::InData(op))
        }
        codec::DEL | codec::BKT | codec::EQL => {
            let len = read_stream_varint(cur)?;
            summary.sections += 1;
            match op {
                codec::DEL => summary.del_bytes += len,
                codec::BKT => summary.bkt_bytes += len,
                _ => summary.eql_bytes += len,
            }
            Ok(ScanState::AwaitingSection)
        }
        _ => Ok(ScanState::AwaitingSection),
    }
}

fn bump(summary: &mut PatchSummary, op: u8, n: u64) {
    if op == codec::MOD {
        summary.mod_bytes += n;
    } else {
        summary.ins_bytes += n;
    }
}

fn read_stream_varint<R: Read>(cur: &mut PeekCursor<R>) -> Result<u64, CoreError> {
    let eof = || CoreError::MalformedPatch("patch stream ended while reading a varint".into());
    let tag = cur.next()?.ok_or_else(eof)?;
    let mut read_width = |n: usize| -> Result<Vec<u8>, CoreError> {
        let mut buf = Vec::with_capacity(n);
        for _ in 0..n {
            buf.push(cur.next()?.ok_or_else(eof)?);
        }
        Ok(buf)
    };
    let mut encoded = vec![tag];
    let width = match tag {
        0..=251 => 0,
        252 => 1,
        253 => 2,
        254 => 4,
        255 => 8,
    };
    if width > 0 {
        encoded.extend(read_width(width)?);
    }
    Ok(decode_varint(&encoded)?.0)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn report_error(op: &str, e: &CoreError) -> i32 {
    eprintln!("bindelta: {op}: {e}");
    e.exit_code()
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let exit_code = match &cli.command {
        Cmd::Diff(args) => cmd_diff(args, cli.json_output, cli.verbose, cli.quiet),
        Cmd::Patch(args) => cmd_patch(args, cli.json_output, cli.verbose, cli.quiet),
        Cmd::Info(args) => cmd_info(args),
    };
    process::exit(exit_code);
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("bindelta".to_string())
        .chain(args.iter().cloned())
        .collect();
    let _ = Cli::try_parse_from(argv);
}
