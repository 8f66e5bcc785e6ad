use avif_compress::config::{CliOptions, RunConfig};
use avif_compress::{convert, output};
use clap::Parser;
use std::num::IntErrorKind;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "avif-compress")]
#[command(version)]
#[command(about = "Compress images to AVIF without resizing")]
#[command(long_about = "\
Compress images to AVIF without resizing

Reads a JSON manifest of image paths, re-encodes each image to AVIF at a
fixed quality (applying EXIF orientation), and writes a JSON mapping of
what happened to every entry.

Manifest shapes:

  [\"photos/a.jpg\", {\"path\": \"photos/b.png\"}]
  {\"images\": [\"photos/a.jpg\", {\"file\": \"photos/b.png\"}]}

Object entries use the first of: path, file, input.

Output placement:

  --output-dir out   photos/a.jpg → out/photos/a.avif
  (no output dir)    photos/a.jpg → photos/a.avif
  outside root       ../x/b.jpg   → out/b.avif
  AVIF in place      c.avif       → c-compressed.avif

Defaults can also be set in avif-compress.toml in the root directory.")]
struct Cli {
    /// Path to image list JSON [default: image-files.json]
    #[arg(long, visible_alias = "sizes", value_name = "PATH")]
    images: Option<PathBuf>,

    /// Output directory for .avif files (default: beside each input)
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Root directory for relative paths (default: current directory)
    #[arg(long, value_name = "DIR")]
    root_dir: Option<PathBuf>,

    /// AVIF quality 1-100 [default: 75]
    #[arg(long, allow_negative_numbers = true, value_parser = parse_integer)]
    quality: Option<i64>,

    /// rav1e encoder speed 1-10 [default: 6]
    #[arg(long, allow_negative_numbers = true, value_parser = parse_integer)]
    speed: Option<i64>,

    /// Write mapping JSON to this path (default: <output-dir>/image-map.json)
    #[arg(long, value_name = "PATH")]
    mapping_file: Option<PathBuf>,

    /// Config file with defaults (default: <root-dir>/avif-compress.toml if present)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Validate and print actions without writing files
    #[arg(long)]
    dry_run: bool,

    /// More log output on stderr (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }

    fn into_options(self) -> CliOptions {
        CliOptions {
            images: self.images,
            output_dir: self.output_dir,
            root_dir: self.root_dir,
            quality: self.quality,
            speed: self.speed,
            mapping_file: self.mapping_file,
            config: self.config,
            dry_run: self.dry_run,
        }
    }
}

/// Parse any integer, saturating at the `i64` bounds so huge values still
/// reach range validation instead of failing as unparseable.
fn parse_integer(value: &str) -> Result<i64, String> {
    match value.parse::<i64>() {
        Ok(n) => Ok(n),
        Err(err) => match err.kind() {
            IntErrorKind::PosOverflow => Ok(i64::MAX),
            IntErrorKind::NegOverflow => Ok(i64::MIN),
            _ => Err(err.to_string()),
        },
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            println!("Cannot determine current directory: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = RunConfig::resolve(cli.into_options(), &cwd)
        .map_err(convert::RunError::from)
        .and_then(|config| convert::run(&config));

    match result {
        Ok(summary) => {
            output::print_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_saturate_instead_of_failing() {
        assert_eq!(parse_integer("75"), Ok(75));
        assert_eq!(parse_integer("-5"), Ok(-5));
        assert_eq!(parse_integer("99999999999999999999"), Ok(i64::MAX));
        assert_eq!(parse_integer("-99999999999999999999"), Ok(i64::MIN));
    }

    #[test]
    fn non_integers_are_rejected() {
        assert!(parse_integer("high").is_err());
        assert!(parse_integer("7.5").is_err());
    }
}
