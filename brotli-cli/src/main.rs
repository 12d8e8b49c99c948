//! Command-line front-end for `brotli-core`.
//!
//! Deliberately subcommand-free, mirroring the reference `brotli` CLI: one
//! binary, a handful of flags, and stdin/stdout as the default pipe.

use brotli_core::decoder::decompress;
use brotli_core::encoder::{compress, EncoderParams};
use clap::Parser;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "brotli-rs")]
#[command(author, version, about = "A from-scratch Brotli-family (de)compressor")]
#[command(long_about = "
brotli-rs reads from --input (or stdin) and writes to --output (or stdout).

Examples:
  brotli-rs -q 2 --input file.txt --output file.br
  brotli-rs -d --input file.br --output file.txt
  cat file.txt | brotli-rs -q 2 > file.br
")]
struct Cli {
    /// Decompress instead of compress.
    #[arg(short = 'd', long)]
    decompress: bool,

    /// Force overwriting an existing output file.
    #[arg(short = 'f', long)]
    force: bool,

    /// Compression quality, 0 (fastest) to 11 (best); ignored when decompressing.
    #[arg(short = 'q', long, default_value_t = brotli_core::encoder::DEFAULT_QUALITY, value_parser = clap::value_parser!(u8).range(0..=11))]
    quality: u8,

    /// Window size in bits, 10..=24.
    #[arg(short = 'w', long, default_value_t = brotli_core::ringbuffer::sizes::DEFAULT_WINDOW_BITS)]
    window: u32,

    /// Input file; defaults to stdin.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output file; defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Repeat the operation this many times (for crude throughput timing).
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("brotli-rs: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> io::Result<()> {
    if cli.window < brotli_core::ringbuffer::sizes::MIN_WINDOW_BITS
        || cli.window > brotli_core::ringbuffer::sizes::MAX_WINDOW_BITS
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("--window must be in 10..=24, got {}", cli.window),
        ));
    }

    if let Some(output) = &cli.output {
        if output.exists() && !cli.force {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists (use -f to overwrite)", output.display()),
            ));
        }
    }

    let input = read_input(cli.input.as_deref())?;

    let mut last = Vec::new();
    for _ in 0..cli.repeat.max(1) {
        last = process(cli, &input)?;
    }
    write_output(cli.output.as_deref(), &last)
}

fn process(cli: &Cli, input: &[u8]) -> io::Result<Vec<u8>> {
    let params = EncoderParams::new().with_lgwin(cli.window).with_quality(cli.quality);

    let result = if cli.decompress {
        decompress(input)
    } else {
        compress(input, &params)
    };

    result.map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
}

fn read_input(path: Option<&std::path::Path>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    match path {
        Some(path) => {
            buf = fs::read(path)?;
        }
        None => {
            io::stdin().read_to_end(&mut buf)?;
        }
    }
    Ok(buf)
}

fn write_output(path: Option<&std::path::Path>, data: &[u8]) -> io::Result<()> {
    match path {
        Some(path) => fs::write(path, data),
        None => io::stdout().write_all(data),
    }
}
