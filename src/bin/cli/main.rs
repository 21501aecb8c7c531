//! CLI tool for patching image archives.

mod exit_codes;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use log::LevelFilter;

use acipatch::{EditRequest, TransformOptions, patch_stream};
use exit_codes::{ExitCode, error_to_exit_code};

/// Rewrite an image archive with a patched manifest
#[derive(Parser)]
#[command(name = "acipatch")]
#[command(author, version, about = "Rewrite an image archive with a patched manifest", long_about = None)]
#[command(after_help = "Example:\n  acipatch --name=example.com/app --capability=CAP_SYS_ADMIN,CAP_NET_ADMIN < app.aci > patched.aci")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Replace the image name
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Add a capability-retain isolator with these capabilities
    #[arg(long, value_name = "CAP[,CAP...]")]
    capability: Option<String>,

    /// Input archive (defaults to stdin)
    #[arg(short = 'i', long)]
    input: Option<PathBuf>,

    /// Output archive (defaults to stdout)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Gzip level of the output (0-9)
    #[arg(short = 'l', long, default_value = "6")]
    level: u32,

    /// Fail if the archive has no manifest
    #[arg(long)]
    require_manifest: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, _) => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

fn run(cli: &Cli) -> ExitCode {
    let request = match EditRequest::from_flags(cli.name.as_deref(), cli.capability.as_deref()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::BadArgs;
        }
    };

    let options = match TransformOptions::new().level(cli.level) {
        Ok(o) => o.require_manifest(cli.require_manifest),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::BadArgs;
        }
    };

    let input: Box<dyn Read> = match &cli.input {
        Some(path) => match File::open(path) {
            Ok(f) => Box::new(BufReader::new(f)),
            Err(e) => {
                eprintln!("Error opening '{}': {}", path.display(), e);
                return ExitCode::IoError;
            }
        },
        None => Box::new(io::stdin().lock()),
    };

    let output: Box<dyn Write> = match &cli.output {
        Some(path) => match File::create(path) {
            Ok(f) => Box::new(BufWriter::new(f)),
            Err(e) => {
                eprintln!("Error creating '{}': {}", path.display(), e);
                return ExitCode::IoError;
            }
        },
        None => Box::new(io::stdout().lock()),
    };

    match patch_stream(input, output, &request, &options) {
        Ok(result) => {
            log::info!(
                "Wrote {} entries, {} manifest patched",
                result.entries,
                result.manifests_patched
            );
            ExitCode::Success
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if cli.output.is_some() {
                eprintln!("The output archive is incomplete and should be deleted");
            }
            error_to_exit_code(&e)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let exit_code = match &cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            ExitCode::Success
        }
        None => run(&cli),
    };

    std::process::exit(exit_code.code());
}
