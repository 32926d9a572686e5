//! Binary entry point for the `zseek` command-line tool.
//!
//! Dispatches the two operations after argument parsing: build writes the
//! sidecar next to the input file; extract streams an uncompressed byte
//! range to stdout. All failures print the stable error phrasing to stderr
//! and exit 1.

use std::io::{self, Write};

use zseek::cli::args::{parse_args, ByteRange, OpMode, ParsedArgs};
use zseek::cli::constants::TOOL_NAME;
use zseek::{build_index, display, displaylevel, sidecar_path, write_index, GzSeekFile, SPAN};

/// Per-iteration read size for extraction. Each stateless read re-decodes
/// from the nearest access point, so the chunk is kept at one span to bound
/// the redundant work on open-ended ranges.
const EXTRACT_CHUNK: usize = SPAN as usize;

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            display!("{}: {}\n", TOOL_NAME, err);
            display!("try '{} --help' for usage\n", TOOL_NAME);
            std::process::exit(1);
        }
    };
    if args.exit_early {
        return;
    }
    std::process::exit(run(args));
}

/// Execute the operation selected by argument parsing.
///
/// Returns the process exit code (0 = success, 1 = error).
fn run(args: ParsedArgs) -> i32 {
    match args.op_mode {
        OpMode::Build => build(&args.input),
        OpMode::Extract => {
            // Parsing guarantees a range in extract mode.
            let range = args.range.expect("extract mode always carries a range");
            extract(&args.input, range)
        }
    }
}

/// `-b FILE`: one forward pass over `FILE`, sidecar written to `FILE.idx`.
fn build(input: &str) -> i32 {
    let index = match build_index(input, SPAN) {
        Ok(index) => index,
        Err(err) => {
            display!("{}: {}: {}\n", TOOL_NAME, input, err);
            return 1;
        }
    };
    let sidecar = sidecar_path(input);
    if let Err(err) = write_index(&index, &sidecar) {
        display!("{}: {}: {}\n", TOOL_NAME, sidecar.display(), err);
        return 1;
    }
    displaylevel!(
        2,
        "{}: {} access point(s) -> {}\n",
        input,
        index.len(),
        sidecar.display()
    );
    0
}

/// `FILE RANGE`: stream the uncompressed range to stdout.
fn extract(input: &str, range: ByteRange) -> i32 {
    let mut handle = match GzSeekFile::open(input) {
        Ok(handle) => handle,
        Err(err) => {
            display!("{}: {}: {}\n", TOOL_NAME, input, err);
            return 1;
        }
    };
    handle.seek(range.begin);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut buf = vec![0u8; EXTRACT_CHUNK];
    let mut remaining = range.end.map(|end| end - range.begin);

    loop {
        let want = match remaining {
            Some(left) if left < buf.len() as i64 => left as usize,
            _ => buf.len(),
        };
        if want == 0 {
            break;
        }
        let got = match handle.read(&mut buf[..want]) {
            Ok(got) => got,
            Err(err) => {
                display!("{}: {}: {}\n", TOOL_NAME, input, err);
                return 1;
            }
        };
        if got == 0 {
            break;
        }
        if out.write_all(&buf[..got]).is_err() {
            display!("{}: {}\n", TOOL_NAME, zseek::Error::Write);
            return 1;
        }
        if let Some(left) = remaining.as_mut() {
            *left -= got as i64;
        }
        if got < want {
            break;
        }
    }
    if out.flush().is_err() {
        display!("{}: {}\n", TOOL_NAME, zseek::Error::Write);
        return 1;
    }
    0
}
