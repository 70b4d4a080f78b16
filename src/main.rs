// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for chatmark.
//!
//! This binary provides the `chatmark` command for rendering chat-flavored
//! markdown messages as HTML, plain text, or a JSON syntax tree.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chatmark::{
    Directory, ParseOptions, Parser, RenderOptions, html, plaintext,
    resolver::DirectoryError,
};
use chrono::FixedOffset;
use lexopt::prelude::*;
use snafu::{OptionExt, ensure, prelude::*};
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Where to write the rendered output.
#[derive(Clone)]
enum OutputTarget {
    /// Write each file to the specified directory.
    Directory(PathBuf),
    /// Write to stdout.
    Stdout,
}

/// What to render each message as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Html,
    Plain,
    Ast,
}

impl Format {
    const fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Plain => "txt",
            Self::Ast => "json",
        }
    }

    const fn separator(self) -> &'static str {
        match self {
            Self::Html => "\n<hr>\n",
            Self::Plain => "\n\n---\n\n",
            Self::Ast => "\n",
        }
    }
}

#[allow(clippy::struct_excessive_bools)]
struct Cli {
    input: Vec<PathBuf>,
    output: OutputTarget,
    concat: bool,
    format: Format,
    minimal: bool,
    directory: Option<PathBuf>,
    parse: ParseOptions,
    render: RenderOptions,
    quiet: bool,
    dry_run: bool,
    force: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("at least one input file or directory is required"))]
    NoInputFiles,

    #[snafu(display("cannot output multiple files to stdout without --concat"))]
    MultipleFilesToStdout,

    #[snafu(display("failed to create output directory: {source}"))]
    CreateOutputDir { source: std::io::Error },

    #[snafu(display("{source}"))]
    LoadDirectory { source: DirectoryError },

    #[snafu(display("failed to read {}: {source}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to start async runtime: {source}"))]
    CreateRuntime { source: std::io::Error },

    #[snafu(display("rendering task failed: {source}"))]
    RenderTask { source: tokio::task::JoinError },

    #[snafu(display("failed to serialize syntax tree for {}: {source}", path.display()))]
    SerializeTree {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("invalid input filename: no file stem"))]
    InvalidFilename,

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn print_help() {
    println!(
        "\
{name} {version}
Render chat-flavored markdown as HTML, plain text, or a syntax tree

Usage: {name} [OPTIONS] -o <OUTPUT> <INPUT>...

Arguments:
  <INPUT>...  Message files (.md, .txt) or directories containing them

Options:
  -o, --output <OUTPUT>     Output directory (or file with --concat, or - for stdout)
      --concat              Combine all inputs into a single output
      --format <FORMAT>     html, plain, or ast (default: html)
      --directory <FILE>    JSON file of known users, roles and channels
      --minimal             Recognize mentions only; keep all other markup as text

Parsing limits:
      --max-length <N>      Longest message parsed, in characters (default: {max_length})
      --max-depth <N>       Deepest nesting parsed (default: {max_depth})

Rendering (use --* or --no-*):
      --utc-offset <MIN>    Offset for timestamps, in minutes east of UTC (default: 0)
      --jumbo               Enlarge emoji in emoji-only messages (default: on)
      --no-jumbo            Keep emoji at normal size

Other options:
  -q, --quiet               Suppress progress messages
  -n, --dry-run             Show what would be processed without writing
  -f, --force               Overwrite existing output files
  -h, --help                Print help
  -V, --version             Print version

Log verbosity follows RUST_LOG (default: warn).",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        max_length = chatmark::DEFAULT_MAX_LENGTH,
        max_depth = chatmark::DEFAULT_MAX_DEPTH,
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    // Show help if no arguments provided
    if std::env::args().len() == 1 {
        print_help();
        std::process::exit(0);
    }

    let mut input = Vec::new();
    let mut output: Option<OutputTarget> = None;
    let mut concat = false;
    let mut format = Format::Html;
    let mut minimal = false;
    let mut directory = None;
    let mut parse = ParseOptions::default();
    let mut render = RenderOptions::default();
    let mut quiet = false;
    let mut dry_run = false;
    let mut force = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            Short('o') | Long("output") => {
                let val: PathBuf = parser.value()?.parse()?;
                output = Some(if val == Path::new("-") {
                    OutputTarget::Stdout
                } else {
                    OutputTarget::Directory(val)
                });
            }
            Long("concat") => concat = true,
            Long("format") => {
                format = match parser.value()?.string()?.as_str() {
                    "html" => Format::Html,
                    "plain" | "text" => Format::Plain,
                    "ast" | "json" => Format::Ast,
                    _ => return Err("format must be html, plain, or ast".into()),
                };
            }
            Long("directory") => directory = Some(parser.value()?.parse()?),
            Long("minimal") => minimal = true,
            Long("max-length") => {
                parse.max_length = parser
                    .value()?
                    .parse()
                    .map_err(|_| "max-length must be a number")?;
            }
            Long("max-depth") => {
                parse.max_depth = parser
                    .value()?
                    .parse()
                    .map_err(|_| "max-depth must be a number")?;
            }
            Long("utc-offset") => {
                let minutes: i32 = parser
                    .value()?
                    .parse()
                    .map_err(|_| "utc-offset must be a number of minutes")?;
                render.utc_offset = minutes
                    .checked_mul(60)
                    .and_then(FixedOffset::east_opt)
                    .ok_or("utc-offset must be within a day of UTC")?;
            }
            // Enable/disable flags - last one wins
            Long("jumbo") => render.jumbo_emoji = true,
            Long("no-jumbo") => render.jumbo_emoji = false,
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('f') | Long("force") => force = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) => input.push(val.parse()?),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input,
        output: output.ok_or("missing required option: --output")?,
        concat,
        format,
        minimal,
        directory,
        parse,
        render,
        quiet,
        dry_run,
        force,
    })
}

fn main() -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args().context(ParseArgsSnafu)?;

    ensure!(!cli.input.is_empty(), NoInputFilesSnafu);

    // Collect all input files first
    let files = collect_input_files(&cli.input);
    if !cli.concat && matches!(cli.output, OutputTarget::Stdout) {
        // Without concat, we can only output one file to stdout
        ensure!(files.len() == 1, MultipleFilesToStdoutSnafu);
    }

    if cli.dry_run {
        report_dry_run(&files, &cli)?;
        return Ok(());
    }

    let directory = match &cli.directory {
        Some(path) => Directory::load(path).context(LoadDirectorySnafu)?,
        None => Directory::default(),
    };

    let inputs = read_inputs(&files)?;
    let runtime = tokio::runtime::Runtime::new().context(CreateRuntimeSnafu)?;
    let rendered = runtime.block_on(render_files(inputs, &cli, Arc::new(directory)))?;

    if cli.concat {
        write_concat(&rendered, &cli)
    } else {
        match &cli.output {
            OutputTarget::Stdout => {
                for (_, output) in &rendered {
                    print!("{output}");
                }
                Ok(())
            }
            OutputTarget::Directory(dir) => {
                std::fs::create_dir_all(dir).context(CreateOutputDirSnafu)?;
                for (input, output) in &rendered {
                    write_file(input, output, dir, &cli)?;
                }
                Ok(())
            }
        }
    }
}

/// Collects all message files from the given inputs (files and directories).
fn collect_input_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| {
                    e.path()
                        .extension()
                        .is_some_and(|ext| ext == "md" || ext == "txt")
                })
            {
                files.push(entry.path().to_path_buf());
            }
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Output path for a single input file.
fn output_path(input: &Path, out_dir: &Path, format: Format) -> Result<PathBuf, Error> {
    let out_name = input.file_stem().context(InvalidFilenameSnafu)?;
    Ok(out_dir.join(format!(
        "{}.{}",
        out_name.to_string_lossy(),
        format.extension()
    )))
}

fn report_dry_run(files: &[PathBuf], cli: &Cli) -> Result<(), Error> {
    match (&cli.output, cli.concat) {
        (OutputTarget::Stdout, true) => {
            eprintln!("Would output {} files concatenated", files.len());
        }
        (OutputTarget::Stdout, false) => {
            for file in files {
                eprintln!("Would output {}", file.display());
            }
        }
        (OutputTarget::Directory(path), true) => {
            eprintln!(
                "Would write {} ({} files concatenated)",
                path.display(),
                files.len()
            );
        }
        (OutputTarget::Directory(dir), false) => {
            for file in files {
                eprintln!("Would write {}", output_path(file, dir, cli.format)?.display());
            }
        }
    }
    Ok(())
}

/// Reads every input up front, before any rendering starts.
fn read_inputs(files: &[PathBuf]) -> Result<Vec<(PathBuf, String)>, Error> {
    files
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
            Ok((path.clone(), text))
        })
        .collect()
}

/// Renders every input concurrently, returning outputs in input order.
async fn render_files(
    inputs: Vec<(PathBuf, String)>,
    cli: &Cli,
    directory: Arc<Directory>,
) -> Result<Vec<(PathBuf, String)>, Error> {
    let mut tasks = JoinSet::new();
    let count = inputs.len();
    for (index, (path, text)) in inputs.into_iter().enumerate() {
        let directory = Arc::clone(&directory);
        let (format, minimal, parse, render) = (cli.format, cli.minimal, cli.parse, cli.render);
        tasks.spawn(async move {
            let output = render_message(&text, format, minimal, parse, &render, &directory).await;
            (index, path, output)
        });
    }

    let mut rendered = Vec::with_capacity(count);
    while let Some(joined) = tasks.join_next().await {
        let (index, path, output) = joined.context(RenderTaskSnafu)?;
        let output = output.context(SerializeTreeSnafu { path: &path })?;
        rendered.push((index, path, output));
    }
    rendered.sort_by_key(|(index, ..)| *index);

    Ok(rendered
        .into_iter()
        .map(|(_, path, output)| (path, output))
        .collect())
}

/// Parses and renders one message.
async fn render_message(
    text: &str,
    format: Format,
    minimal: bool,
    parse: ParseOptions,
    render: &RenderOptions,
    directory: &Directory,
) -> Result<String, serde_json::Error> {
    let parser = Parser::new(parse);
    let nodes = if minimal {
        parser.parse_minimal(text)
    } else {
        parser.parse(text)
    };

    Ok(match format {
        Format::Html => {
            let Ok(out) = html::render_html(&nodes, directory, render).await;
            out
        }
        Format::Plain => {
            let Ok(out) = plaintext::render_plain(&nodes, directory, render).await;
            out
        }
        Format::Ast => serde_json::to_string_pretty(&nodes)?,
    })
}

/// Writes all outputs into a single destination.
fn write_concat(rendered: &[(PathBuf, String)], cli: &Cli) -> Result<(), Error> {
    let separator = cli.format.separator();
    let output = rendered
        .iter()
        .map(|(_, output)| output.as_str())
        .collect::<Vec<_>>()
        .join(separator);

    match &cli.output {
        OutputTarget::Stdout => print!("{output}"),
        OutputTarget::Directory(path) => {
            // In concat mode, treat path as a file, not directory
            if path.exists() && !cli.force {
                eprintln!(
                    "Skipping {} (already exists, use --force to overwrite)",
                    path.display()
                );
                return Ok(());
            }
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).context(CreateOutputDirSnafu)?;
            }
            std::fs::write(path, &output).context(WriteFileSnafu { path })?;
            if !cli.quiet {
                eprintln!("Wrote {} ({} files)", path.display(), rendered.len());
            }
        }
    }

    Ok(())
}

/// Writes one rendered file into the output directory.
fn write_file(input: &Path, output: &str, out_dir: &Path, cli: &Cli) -> Result<(), Error> {
    let out_path = output_path(input, out_dir, cli.format)?;

    // Check if output exists and handle overwrite
    if out_path.exists() && !cli.force {
        eprintln!(
            "Skipping {} (already exists, use --force to overwrite)",
            out_path.display()
        );
        return Ok(());
    }

    std::fs::write(&out_path, output).context(WriteFileSnafu { path: &out_path })?;

    if !cli.quiet {
        eprintln!("Wrote {}", out_path.display());
    }
    Ok(())
}
