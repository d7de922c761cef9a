#![forbid(unsafe_code)]

mod output;

use anyhow::Context;
use clap::Parser;
use output::{CliError, OutputMode};
use std::env;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use toplevel_core::config::{self, Config};
use toplevel_core::{Database, DatabaseError, DatabaseOptions, ErrorCode};
use toplevel_graph::graph::BuildOptions;
use toplevel_graph::{AnalysisError, AnalysisOptions, Report, analyze};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Exit status when writing the report itself fails.
const EXIT_OUTPUT_FAILED: u8 = 74;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Find the top-level packages of a Debian system",
    long_about = "Print the packages nothing else in the analyzed set depends on. \
                  With no PACKAGE arguments every installed package is analyzed.",
    after_help = "EXAMPLES:\n    \
                  # Top-level packages of this system\n    \
                  apt-toplevel\n\n    \
                  # Top-level packages among those not marked auto-installed\n    \
                  apt-toplevel --manual\n\n    \
                  # Which of these are top-level, and what do they recommend that is missing?\n    \
                  apt-toplevel --show-missing-recommends vim htop libc6\n\n    \
                  # Analyze a chroot\n    \
                  apt-toplevel --root-dir /srv/chroot/sid --json"
)]
struct Cli {
    /// Packages to analyze (`name` or `name:arch`).
    #[arg(value_name = "PACKAGE")]
    packages: Vec<String>,

    /// Read the package database below this directory instead of `/`.
    #[arg(long, value_name = "DIR")]
    root_dir: Option<PathBuf>,

    /// Also expand packages outside the analyzed set.
    #[arg(long)]
    follow_unspecified_packages: bool,

    /// Ignore Recommends relations.
    #[arg(long)]
    no_use_recommends: bool,

    /// List recommended packages that are neither analyzed nor required.
    #[arg(long)]
    show_missing_recommends: bool,

    /// Analyze only packages apt does not mark as automatically installed.
    #[arg(long, conflicts_with = "packages")]
    manual: bool,

    /// Override the native architecture.
    #[arg(long, value_name = "ARCH")]
    arch: Option<String>,

    /// Emit JSON output instead of package lists.
    #[arg(long)]
    json: bool,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    const fn output_mode(&self) -> OutputMode {
        OutputMode::from_json_flag(self.json)
    }
}

/// Effective settings after layering CLI flags over the config file.
#[derive(Debug)]
struct Settings {
    root: PathBuf,
    database: DatabaseOptions,
    analysis: AnalysisOptions,
}

impl Settings {
    fn resolve(cli: &Cli, config: &Config) -> Self {
        let root = cli
            .root_dir
            .clone()
            .unwrap_or_else(|| config.root().to_path_buf());
        Self {
            root,
            database: DatabaseOptions {
                native_arch: cli.arch.clone().or_else(|| config.native_arch.clone()),
                read_apt_lists: config.read_apt_lists,
            },
            analysis: AnalysisOptions {
                build: BuildOptions {
                    follow_unspecified: cli.follow_unspecified_packages
                        || config.follow_unspecified_packages,
                    use_recommends: !cli.no_use_recommends && config.use_recommends,
                },
                show_missing_recommends: cli.show_missing_recommends
                    || config.show_missing_recommends,
                manual_only: cli.manual || config.manual,
                always_present: config.always_present.clone(),
            },
        }
    }
}

/// A failed run and the error class that picks its exit status.
#[derive(Debug)]
struct Failure {
    code: Option<ErrorCode>,
    error: anyhow::Error,
}

impl Failure {
    fn new(code: ErrorCode, error: impl Into<anyhow::Error>) -> Self {
        Self {
            code: Some(code),
            error: error.into(),
        }
    }

    fn output(error: impl Into<anyhow::Error>) -> Self {
        Self {
            code: None,
            error: error.into(),
        }
    }

    fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code.map_or(EXIT_OUTPUT_FAILED, ErrorCode::exit_code))
    }

    fn to_cli_error(&self) -> CliError {
        if let Some(analysis) = self.error.downcast_ref::<AnalysisError>() {
            return CliError::from_analysis(analysis);
        }
        let message = format!("{:#}", self.error);
        match self.code {
            Some(code) => CliError::with_code(code, message),
            None => CliError::new(message),
        }
    }
}

impl From<AnalysisError> for Failure {
    fn from(error: AnalysisError) -> Self {
        Self::new(error.code(), error)
    }
}

impl From<DatabaseError> for Failure {
    fn from(error: DatabaseError) -> Self {
        Self::new(error.code(), error)
    }
}

/// Log filter when `APT_TOPLEVEL_LOG` is unset. Quiet by default so stderr
/// carries only the report's own diagnostics.
const fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "apt_toplevel=debug,toplevel_graph=debug,toplevel_core=debug,warn"
    } else {
        "apt_toplevel=warn,toplevel_graph=warn,toplevel_core=warn,warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("APT_TOPLEVEL_LOG").unwrap_or_else(|_| {
        EnvFilter::new(default_filter(verbose || env::var("DEBUG").is_ok()))
    });

    let format = env::var("APT_TOPLEVEL_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli) -> Result<Report, Failure> {
    let config = config::load_config()
        .context("Failed to load configuration")
        .map_err(|e| Failure::new(ErrorCode::ConfigParseError, e))?;
    let settings = Settings::resolve(cli, &config);
    debug!(?settings, "effective settings");

    let db = Database::open(&settings.root, &settings.database)?;
    info!(
        root = %settings.root.display(),
        packages = db.len(),
        "package database loaded"
    );

    let report = analyze(&db, &cli.packages, &settings.analysis)?;
    debug!(stats = ?report.stats, "graph summary");
    Ok(report)
}

fn emit(report: &Report, mode: OutputMode) -> Result<(), Failure> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            let pretty = io::stdout().is_terminal();
            output::render_json(report, &mut out, pretty).map_err(Failure::output)?;
        }
        OutputMode::Text => {
            let stderr = io::stderr();
            let mut diag = stderr.lock();
            output::render_text(report, &mut out, &mut diag).map_err(Failure::output)?;
        }
    }
    out.flush().map_err(Failure::output)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let mode = cli.output_mode();
    match run(&cli).and_then(|report| emit(&report, mode)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            let stderr = io::stderr();
            let mut diag = stderr.lock();
            // Nothing left to report a failed error write to.
            let _ = output::render_error(mode, &failure.to_cli_error(), &mut diag);
            failure.exit_code()
        }
    }
}
