use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use rsarc::Archive;

/// Reads a PSARC archive, optionally extracting its contents or converting SNG/audio entries.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the .psarc archive to read.
    psarc_path: PathBuf,

    /// Directory to extract into. Defaults to a directory named after the archive.
    output_dir: Option<PathBuf>,

    /// List entries and exit without extracting anything.
    #[arg(short = 'l', long = "list")]
    list: bool,

    /// Suppress informational logging; only warnings and errors are printed.
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Convert SNG arrangement entries to XML alongside the raw extraction.
    #[arg(short = 's', long = "convert-sng")]
    convert_sng: bool,

    /// Convert WEM/BNK audio entries to OGG alongside the raw extraction.
    #[arg(short = 'a', long = "convert-audio")]
    convert_audio: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.quiet);

    if let Err(err) = run(&args) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false).compact();
    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

fn run(args: &Args) -> anyhow::Result<()> {
    let mut archive =
        Archive::open(&args.psarc_path).with_context(|| format!("opening {:?}", args.psarc_path))?;

    if args.list {
        for name in archive.file_list() {
            println!("{name}");
        }
        return Ok(());
    }

    let output_dir = args.output_dir.clone().unwrap_or_else(|| default_output_dir(&args.psarc_path));

    archive
        .extract_all(&output_dir)
        .with_context(|| format!("extracting {:?}", args.psarc_path))?;

    if args.convert_sng {
        archive
            .convert_sng(&output_dir)
            .with_context(|| "converting sng entries to xml")?;
    }

    if args.convert_audio {
        archive
            .convert_audio_unsupported(&output_dir)
            .with_context(|| "converting audio entries")?;
    }

    Ok(())
}

fn default_output_dir(psarc_path: &std::path::Path) -> PathBuf {
    psarc_path.with_extension("")
}
