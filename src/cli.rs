// Command-line front end for lz4arc.
//
// Explicit subcommands with long-form options. File-to-file runs go through
// the `io` helpers; stdin/stdout runs drive the streaming pipelines directly.
// Every failure exits with `ArchiveError::exit_code()`.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::compress::block::{BlockCodec, LZ4_MAX_INPUT_SIZE, Lz4Block};
use crate::compress::decoder::ArchiveDecoder;
use crate::compress::encoder::ArchiveEncoder;
use crate::compress::options::ArchiveOptions;
use crate::error::ArchiveError;
use crate::format::{ARCHIVE_MAGIC, CHUNK_SIZE};
use crate::io as file_io;
use crate::safe_output::{AliasPolicy, with_safe_output};

const BUF_SIZE: usize = 64 * 1024;
const ARCHIVE_SUFFIX: &str = "lz4";

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

/// Chunked LZ4 archiver (legacy frame layout).
#[derive(Parser, Debug)]
#[command(
    name = "lz4arc",
    version,
    about = "Chunked LZ4 archiver",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,

    /// Uncompressed bytes per frame; must match between compress and decompress.
    #[arg(long = "chunk-size", global = true, value_parser = parse_byte_size, default_value = "8M")]
    chunk_size: u64,

    /// How to compare input and output paths when detecting in-place runs.
    #[arg(long = "path-case", global = true, value_enum, default_value_t = PathCaseArg::Auto)]
    path_case: PathCaseArg,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Compress a file or stdin into an archive.
    Compress(StreamArgs),
    /// Decompress an archive.
    Decompress(DecompressArgs),
    /// List the frames of an archive.
    Info(InfoArgs),
    /// Print build/configuration details.
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PathCaseArg {
    Auto,
    Sensitive,
    Insensitive,
}

#[derive(Args, Debug)]
struct StreamArgs {
    /// Write output to stdout.
    #[arg(short = 'c', long)]
    stdout: bool,

    /// Input file (default: stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,

    /// Output file (default: derived from the input name).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct DecompressArgs {
    /// Check/compute only (do not write output).
    #[arg(long = "check-only")]
    no_output: bool,

    #[command(flatten)]
    stream: StreamArgs,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Archive to inspect.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

// ---------------------------------------------------------------------------
// Resolved command + options (flattened from Cli)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Compress,
    Decompress,
    Info,
    Config,
}

#[derive(Debug)]
struct Options {
    command: Command,
    use_stdout: bool,
    force: bool,
    quiet: bool,
    verbose: u8,
    no_output: bool,
    chunk_size: u64,
    path_case: PathCaseArg,
    input_file: Option<PathBuf>,
    output_file: Option<PathBuf>,
    json_output: bool,
}

fn resolve_options(cli: Cli) -> Options {
    let (command, stream, no_output, info_input) = match cli.command {
        Cmd::Compress(args) => (Command::Compress, Some(args), false, None),
        Cmd::Decompress(args) => (Command::Decompress, Some(args.stream), args.no_output, None),
        Cmd::Info(args) => (Command::Info, None, false, Some(args.input)),
        Cmd::Config => (Command::Config, None, false, None),
    };
    let (use_stdout, input_file, output_file) = match stream {
        Some(args) => (args.stdout, args.input, args.output),
        None => (false, info_input, None),
    };

    Options {
        command,
        use_stdout,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        no_output,
        chunk_size: cli.chunk_size,
        path_case: cli.path_case,
        input_file,
        output_file,
        json_output: cli.json_output,
    }
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("lz4arc".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let opts = resolve_options(cli);
        let _ = build_archive_options(&opts);
        let _ = resolve_destination(&opts);
    }
}

fn build_archive_options(opts: &Options) -> Result<ArchiveOptions, ArchiveError> {
    let chunk_size = usize::try_from(opts.chunk_size).map_err(|_| {
        ArchiveError::InvalidOptions(format!("chunk size {} is too large", opts.chunk_size))
    })?;
    let alias_policy = match opts.path_case {
        PathCaseArg::Auto => AliasPolicy::default(),
        PathCaseArg::Sensitive => AliasPolicy::CaseSensitive,
        PathCaseArg::Insensitive => AliasPolicy::CaseInsensitive,
    };
    let archive_opts = ArchiveOptions {
        chunk_size,
        alias_policy,
    };
    archive_opts.validate(&Lz4Block)?;
    Ok(archive_opts)
}

// ---------------------------------------------------------------------------
// Output destination
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Destination {
    Stdout,
    File(PathBuf),
    Discard,
}

/// Output name used when none is given: `name` -> `name.lz4` when
/// compressing, `name.lz4` -> `name` when decompressing.
fn default_output_name(input: &Path, command: Command) -> Option<PathBuf> {
    match command {
        Command::Compress => {
            let mut name = OsString::from(input.as_os_str());
            name.push(".");
            name.push(ARCHIVE_SUFFIX);
            Some(PathBuf::from(name))
        }
        Command::Decompress => {
            if input.extension()? != ARCHIVE_SUFFIX {
                return None;
            }
            Some(input.with_extension(""))
        }
        Command::Info | Command::Config => None,
    }
}

fn resolve_destination(opts: &Options) -> Result<Destination, String> {
    if opts.no_output {
        return Ok(Destination::Discard);
    }
    if opts.use_stdout {
        return Ok(Destination::Stdout);
    }
    match (&opts.output_file, &opts.input_file) {
        (Some(path), _) => Ok(Destination::File(path.clone())),
        (None, None) => Ok(Destination::Stdout),
        (None, Some(input)) => default_output_name(input, opts.command)
            .map(Destination::File)
            .ok_or_else(|| {
                format!(
                    "cannot derive an output name from {} (expected a .{ARCHIVE_SUFFIX} suffix)",
                    input.display()
                )
            }),
    }
}

/// Open the input file, or stdin when none was given.
fn open_reader(input: Option<&Path>) -> Result<Box<dyn Read>, ArchiveError> {
    match input {
        Some(path) => {
            let file = File::open(path).map_err(|source| ArchiveError::OpenInput {
                path: path.to_path_buf(),
                source,
            })?;
            Ok(Box::new(BufReader::with_capacity(BUF_SIZE, file)))
        }
        None => Ok(Box::new(BufReader::with_capacity(BUF_SIZE, io::stdin()))),
    }
}

/// Run `f` against the destination writer, flushing it afterwards.
fn with_writer<T>(
    input: Option<&Path>,
    dest: &Destination,
    policy: AliasPolicy,
    f: impl FnOnce(&mut dyn Write) -> Result<T, ArchiveError>,
) -> Result<T, ArchiveError> {
    match dest {
        Destination::Stdout => {
            let mut writer = BufWriter::with_capacity(BUF_SIZE, io::stdout().lock());
            let value = f(&mut writer)?;
            writer.flush()?;
            Ok(value)
        }
        Destination::Discard => f(&mut io::sink()),
        Destination::File(path) => with_safe_output(input, path, policy, |file| {
            let mut writer = BufWriter::with_capacity(BUF_SIZE, file);
            let value = f(&mut writer)?;
            writer.into_inner().map_err(|e| e.into_error())?;
            Ok(value)
        }),
    }
}

/// Counts bytes pulled from a reader of unknown length.
struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

/// What a compress or decompress run did, independent of where it wrote.
struct Report {
    bytes_in: u64,
    bytes_out: u64,
    frames: u64,
    sha256: Option<[u8; 32]>,
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn print_report(opts: &Options, command: &str, report: &Report) {
    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "lz4arc: {command}: {} -> {} bytes, frames: {}",
            report.bytes_in, report.bytes_out, report.frames
        );
        if let Some(sha) = &report.sha256 {
            eprintln!("lz4arc: {command}: sha256 of uncompressed data: {}", hex(sha));
        }
    }

    if opts.json_output {
        let json = serde_json::json!({
            "command": command,
            "input_size": report.bytes_in,
            "output_size": report.bytes_out,
            "frames": report.frames,
            "chunk_size": opts.chunk_size,
            "sha256": report.sha256.as_ref().map(|s| hex(s)),
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => eprintln!("{text}"),
            Err(e) => log::warn!("could not render JSON stats: {e}"),
        }
    }
}

fn fail(e: &ArchiveError) -> i32 {
    eprintln!("lz4arc: {e}");
    e.exit_code()
}

/// Refuse to replace an existing file unless `--force` was given.
fn check_overwrite(opts: &Options, dest: &Destination) -> Result<(), i32> {
    if let Destination::File(path) = dest {
        if path.exists() && !opts.force {
            eprintln!(
                "lz4arc: output file exists, use -f to overwrite: {}",
                path.display()
            );
            return Err(1);
        }
    }
    Ok(())
}

fn prepare(opts: &Options) -> Result<(ArchiveOptions, Destination), i32> {
    let archive_opts = build_archive_options(opts).map_err(|e| fail(&e))?;
    let dest = resolve_destination(opts).map_err(|msg| {
        eprintln!("lz4arc: {msg}");
        1
    })?;
    check_overwrite(opts, &dest)?;
    Ok((archive_opts, dest))
}

// ---------------------------------------------------------------------------
// Compress command
// ---------------------------------------------------------------------------

fn run_compress(
    opts: &Options,
    archive_opts: ArchiveOptions,
    dest: &Destination,
) -> Result<Report, ArchiveError> {
    let input = opts.input_file.as_deref();
    if let (Some(input), Destination::File(output)) = (input, dest) {
        let stats = file_io::encode_file(input, output, archive_opts)?;
        return Ok(Report {
            bytes_in: stats.input_size,
            bytes_out: stats.archive_size,
            frames: stats.frames,
            sha256: stats.input_sha256,
        });
    }

    let mut reader = open_reader(input)?;
    with_writer(input, dest, archive_opts.alias_policy, |writer| {
        let mut encoder = ArchiveEncoder::new(writer, archive_opts)?;
        encoder.encode_from(&mut reader)?;
        let (_, summary) = encoder.finish()?;
        Ok(Report {
            bytes_in: summary.bytes_in,
            bytes_out: summary.bytes_out,
            frames: summary.frames,
            sha256: None,
        })
    })
}

fn cmd_compress(opts: &Options) -> i32 {
    let (archive_opts, dest) = match prepare(opts) {
        Ok(p) => p,
        Err(code) => return code,
    };
    match run_compress(opts, archive_opts, &dest) {
        Ok(report) => {
            print_report(opts, "compress", &report);
            0
        }
        Err(e) => fail(&e),
    }
}

// ---------------------------------------------------------------------------
// Decompress command
// ---------------------------------------------------------------------------

fn run_decompress(
    opts: &Options,
    archive_opts: ArchiveOptions,
    dest: &Destination,
) -> Result<Report, ArchiveError> {
    let input = opts.input_file.as_deref();
    if let (Some(input), Destination::File(output)) = (input, dest) {
        let stats = file_io::decode_file(input, output, archive_opts)?;
        return Ok(Report {
            bytes_in: stats.archive_size,
            bytes_out: stats.output_size,
            frames: stats.frames,
            sha256: stats.output_sha256,
        });
    }

    let reader = CountingReader {
        inner: open_reader(input)?,
        count: 0,
    };
    with_writer(input, dest, archive_opts.alias_policy, |writer| {
        let mut decoder = ArchiveDecoder::new(reader, archive_opts)?;
        let bytes_out = decoder.decode_to(writer)?;
        let frames = decoder.frames_decoded();
        Ok(Report {
            bytes_in: decoder.into_inner().count,
            bytes_out,
            frames,
            sha256: None,
        })
    })
}

fn cmd_decompress(opts: &Options) -> i32 {
    let (archive_opts, dest) = match prepare(opts) {
        Ok(p) => p,
        Err(code) => return code,
    };
    match run_decompress(opts, archive_opts, &dest) {
        Ok(report) => {
            if dest == Destination::Discard && !opts.quiet {
                eprintln!(
                    "lz4arc: archive OK: {} frames, {} bytes",
                    report.frames, report.bytes_out
                );
            }
            print_report(opts, "decompress", &report);
            0
        }
        Err(e) => fail(&e),
    }
}

// ---------------------------------------------------------------------------
// Info command
// ---------------------------------------------------------------------------

fn cmd_info(opts: &Options) -> i32 {
    let archive_opts = match build_archive_options(opts) {
        Ok(o) => o,
        Err(e) => return fail(&e),
    };
    let Some(path) = opts.input_file.as_deref() else {
        eprintln!("lz4arc: info: no input file");
        return 1;
    };
    let info = match file_io::inspect_file(path, archive_opts) {
        Ok(info) => info,
        Err(e) => return fail(&e),
    };
    let (min_size, max_size) = info.original_size_range();

    if opts.json_output {
        let frames: Vec<_> = info
            .frames
            .iter()
            .map(|f| {
                serde_json::json!({ "offset": f.offset, "compressed_size": f.compressed_size })
            })
            .collect();
        let json = serde_json::json!({
            "archive_size": info.archive_size,
            "chunk_size": info.chunk_size,
            "frames": frames,
            "original_size_min": min_size,
            "original_size_max": max_size,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{text}"),
            Err(e) => log::warn!("could not render JSON info: {e}"),
        }
        return 0;
    }

    println!("archive:        {}", path.display());
    println!("archive size:   {}", info.archive_size);
    println!("chunk size:     {}", info.chunk_size);
    println!("frames:         {}", info.frames.len());
    println!("original size:  {min_size}..={max_size}");
    if opts.verbose > 0 {
        println!("  frame       offset  compressed");
        for (i, frame) in info.frames.iter().enumerate() {
            println!("  {i:>5}  {:>11}  {:>10}", frame.offset, frame.compressed_size);
        }
    }
    0
}

// ---------------------------------------------------------------------------
// Config command
// ---------------------------------------------------------------------------

fn cmd_config() -> i32 {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!("lz4arc version {version} (Rust)");

    let file_io = cfg!(feature = "file-io") as u8;
    let ptr_size = std::mem::size_of::<*const ()>();
    let case_insensitive = (AliasPolicy::default() == AliasPolicy::CaseInsensitive) as u8;

    eprintln!("FILE_IO={file_io}");
    eprintln!("ARCHIVE_MAGIC=0x{ARCHIVE_MAGIC:08X}");
    eprintln!("CHUNK_SIZE={CHUNK_SIZE}");
    eprintln!("CHUNK_BOUND={}", Lz4Block.compress_bound(CHUNK_SIZE));
    eprintln!("LZ4_MAX_INPUT_SIZE={LZ4_MAX_INPUT_SIZE}");
    eprintln!("PATH_CASE_INSENSITIVE={case_insensitive}");
    eprintln!("sizeof(usize)={ptr_size}");

    0
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn log_filter(opts: &Options) -> &'static str {
    if opts.quiet {
        return "error";
    }
    match opts.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    // Usage errors exit 1; clap's own code 2 would read as an input open failure.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };
    let mut opts = resolve_options(cli);

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_filter(&opts)))
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Warn if -c overrides output filename.
    if opts.use_stdout {
        if let Some(path) = opts.output_file.take() {
            if !opts.quiet {
                eprintln!(
                    "lz4arc: warning: -c option overrides output filename: {}",
                    path.display()
                );
            }
        }
    }

    let exit_code = match opts.command {
        Command::Compress => cmd_compress(&opts),
        Command::Decompress => cmd_decompress(&opts),
        Command::Info => cmd_info(&opts),
        Command::Config => cmd_config(),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
