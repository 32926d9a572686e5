//! Command-line argument parsing for the `zseek` binary.
//!
//! Two operating modes:
//!
//! - `zseek -b FILE` — build the index sidecar `FILE.idx`;
//! - `zseek FILE RANGE` — write an uncompressed byte range to stdout.
//!
//! Range grammar: `BEGIN-END` (half-open), `-END` (from the start),
//! `BEGIN-` (to the end of the stream), or a bare `N` (one byte, `N-N+1`).
//!
//! The entry points are [`parse_args`] (reads `std::env::args()`) and
//! [`parse_args_from`] (takes an explicit slice, suitable for unit-testing).
//! Bad or unrecognised input returns an `Err` with a human-readable message
//! that begins with `"bad usage: "`.

use anyhow::{anyhow, bail, Result};

use crate::cli::constants::{display_level, set_display_level, TOOL_NAME, TOOL_VERSION};
use crate::displayout;

/// Operation selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    /// `-b`: one forward pass, write the sidecar.
    Build,
    /// Default: extract a range to stdout.
    Extract,
}

/// A half-open uncompressed byte range `[begin, end)`.
///
/// `end == None` means "to the end of the stream".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub begin: i64,
    pub end: Option<i64>,
}

/// Everything the dispatch phase needs, produced by the parsing loop.
#[derive(Debug)]
pub struct ParsedArgs {
    /// Resolved operation mode.
    pub op_mode: OpMode,
    /// The gzip file to index or extract from.
    pub input: String,
    /// Extraction range (always `Some` in extract mode).
    pub range: Option<ByteRange>,
    /// When `true`, a help/version flag was processed; the caller should
    /// exit 0 without performing any I/O operation.
    pub exit_early: bool,
}

/// Parse `std::env::args()` (skipping argv[0]).
pub fn parse_args() -> Result<ParsedArgs> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    parse_args_from(&argv)
}

/// Parse an explicit argument list. Callable from tests without touching
/// `std::env`.
pub fn parse_args_from(argv: &[String]) -> Result<ParsedArgs> {
    let mut op_mode = OpMode::Extract;
    let mut positional: Vec<&str> = Vec::new();
    let mut options_done = false;

    for arg in argv {
        let arg = arg.as_str();
        if options_done || !arg.starts_with('-') || arg == "-" {
            positional.push(arg);
            continue;
        }
        match arg {
            "--" => options_done = true,
            "-b" | "--build" => op_mode = OpMode::Build,
            "-q" | "--quiet" => set_display_level(display_level().saturating_sub(1)),
            "-v" | "--verbose" => set_display_level(display_level() + 1),
            "-h" | "--help" => {
                print_usage();
                return Ok(exit_early());
            }
            "-V" | "--version" => {
                displayout!("{} v{}\n", TOOL_NAME, TOOL_VERSION);
                return Ok(exit_early());
            }
            // A leading dash can also open a range ("-END"); only treat it
            // as a range when it parses as one.
            _ if parse_range(arg).is_ok() => positional.push(arg),
            _ => bail!("bad usage: unknown option '{}'", arg),
        }
    }

    match (op_mode, positional.as_slice()) {
        (OpMode::Build, [input]) => Ok(ParsedArgs {
            op_mode,
            input: (*input).to_owned(),
            range: None,
            exit_early: false,
        }),
        (OpMode::Build, _) => bail!("bad usage: -b expects exactly one file argument"),
        (OpMode::Extract, [input, range]) => Ok(ParsedArgs {
            op_mode,
            input: (*input).to_owned(),
            range: Some(parse_range(range)?),
            exit_early: false,
        }),
        (OpMode::Extract, _) => bail!("bad usage: expected a file and a byte range"),
    }
}

/// Parse the extraction range grammar.
pub fn parse_range(text: &str) -> Result<ByteRange> {
    let bad = || anyhow!("bad usage: invalid range '{}'", text);

    if text == "-" {
        return Err(bad());
    }
    let range = match text.split_once('-') {
        None => {
            // Bare N: the single byte [N, N+1).
            let begin = parse_offset(text).ok_or_else(bad)?;
            ByteRange {
                begin,
                end: Some(begin.checked_add(1).ok_or_else(bad)?),
            }
        }
        Some((begin, end)) => {
            let begin = if begin.is_empty() {
                0
            } else {
                parse_offset(begin).ok_or_else(bad)?
            };
            let end = if end.is_empty() {
                None
            } else {
                Some(parse_offset(end).ok_or_else(bad)?)
            };
            if end.is_some_and(|e| e < begin) {
                return Err(bad());
            }
            ByteRange { begin, end }
        }
    };
    Ok(range)
}

fn parse_offset(text: &str) -> Option<i64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<i64>().ok()
}

fn exit_early() -> ParsedArgs {
    ParsedArgs {
        op_mode: OpMode::Extract,
        input: String::new(),
        range: None,
        exit_early: true,
    }
}

fn print_usage() {
    displayout!(
        "usage: {0} -b FILE.gz        build the index sidecar FILE.gz.idx\n\
         \x20      {0} FILE.gz RANGE    write an uncompressed range to stdout\n\
         \n\
         RANGE is BEGIN-END (half-open), -END, BEGIN-, or a single offset N.\n\
         \n\
         options:\n\
         \x20 -b, --build      build mode\n\
         \x20 -q, --quiet      less verbose output\n\
         \x20 -v, --verbose    more verbose output\n\
         \x20 -h, --help       show this message\n\
         \x20 -V, --version    show the version\n",
        TOOL_NAME
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn range_grammar_forms() {
        assert_eq!(
            parse_range("5-10").unwrap(),
            ByteRange {
                begin: 5,
                end: Some(10)
            }
        );
        assert_eq!(
            parse_range("-10").unwrap(),
            ByteRange {
                begin: 0,
                end: Some(10)
            }
        );
        assert_eq!(parse_range("5-").unwrap(), ByteRange { begin: 5, end: None });
        assert_eq!(
            parse_range("7").unwrap(),
            ByteRange {
                begin: 7,
                end: Some(8)
            }
        );
    }

    #[test]
    fn range_grammar_rejects_junk() {
        for bad in ["", "-", "a-b", "5-2", "1.5-2", "5--7", "0x10-20"] {
            assert!(parse_range(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn build_mode_takes_one_file() {
        let parsed = parse_args_from(&args(&["-b", "data.gz"])).unwrap();
        assert_eq!(parsed.op_mode, OpMode::Build);
        assert_eq!(parsed.input, "data.gz");
        assert!(parsed.range.is_none());

        assert!(parse_args_from(&args(&["-b"])).is_err());
        assert!(parse_args_from(&args(&["-b", "a.gz", "b.gz"])).is_err());
    }

    #[test]
    fn extract_mode_takes_file_and_range() {
        let parsed = parse_args_from(&args(&["data.gz", "100-200"])).unwrap();
        assert_eq!(parsed.op_mode, OpMode::Extract);
        assert_eq!(
            parsed.range,
            Some(ByteRange {
                begin: 100,
                end: Some(200)
            })
        );
    }

    #[test]
    fn leading_dash_range_is_not_an_option() {
        let parsed = parse_args_from(&args(&["data.gz", "-200"])).unwrap();
        assert_eq!(
            parsed.range,
            Some(ByteRange {
                begin: 0,
                end: Some(200)
            })
        );
    }

    #[test]
    fn double_dash_ends_options() {
        let parsed = parse_args_from(&args(&["--", "data.gz", "3"])).unwrap();
        assert_eq!(parsed.input, "data.gz");
        assert!(parse_args_from(&args(&["--bogus", "data.gz", "3"])).is_err());
    }
}
