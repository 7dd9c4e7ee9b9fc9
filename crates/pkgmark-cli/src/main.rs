mod config;
mod render;

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pkgmark_state::{
    apply_mark_to_all_with, default_user_prefix, read_install_receipts, InstallReceipt,
    MarkError, MarkIntent, MetadataStore, PrefixLayout, ReceiptStore,
};
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;
use crate::render::{
    current_output_style, format_mark_outcome_lines, render_error_line, OutputStyle,
};

const PREFIX_ENV: &str = "PKGMARK_PREFIX";
const LOG_ENV: &str = "PKGMARK_LOG";

#[derive(Parser, Debug)]
#[command(name = "pkgmark")]
#[command(about = "Mark how installed packages were installed", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    prefix: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mark or unmark packages as installed on request or as dependency.
    ///
    /// Autoremove only considers packages that are not installed on request.
    Mark(MarkArgs),
    /// List installed packages with their provenance flags.
    List,
    Version,
}

#[derive(Args, Debug)]
struct MarkArgs {
    #[arg(required = true, value_name = "NAME")]
    names: Vec<String>,
    /// Mark packages as installed on request.
    #[arg(long, conflicts_with = "no_installed_on_request")]
    installed_on_request: bool,
    /// Mark packages as not installed on request.
    #[arg(long)]
    no_installed_on_request: bool,
    /// Mark packages as installed as dependency.
    #[arg(long, conflicts_with = "no_installed_as_dependency")]
    installed_as_dependency: bool,
    /// Mark packages as not installed as dependency.
    #[arg(long)]
    no_installed_as_dependency: bool,
}

impl MarkArgs {
    fn intent(&self) -> Result<MarkIntent, MarkError> {
        MarkIntent::new(
            switch_pair(self.installed_on_request, self.no_installed_on_request),
            switch_pair(self.installed_as_dependency, self.no_installed_as_dependency),
        )
    }
}

fn switch_pair(set: bool, unset: bool) -> Option<bool> {
    if set {
        Some(true)
    } else if unset {
        Some(false)
    } else {
        None
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut style = OutputStyle::Plain;

    match run_cli(cli, &mut style) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", render_error_line(style, &format!("{err:#}")));
            ExitCode::from(exit_code_for(&err))
        }
    }
}

fn run_cli(cli: Cli, style: &mut OutputStyle) -> Result<()> {
    match cli.command {
        Commands::Mark(args) => {
            let intent = args.intent()?;
            let layout = prepare_prefix(cli.prefix.as_deref(), style)?;
            let store = ReceiptStore::new(layout);
            let mut stdout = io::stdout().lock();
            run_mark_command(&store, &args.names, intent, *style, &mut stdout)?;
        }
        Commands::List => {
            let layout = prepare_prefix(cli.prefix.as_deref(), style)?;
            let mut stdout = io::stdout().lock();
            run_list_command(&layout, &mut stdout)?;
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Resolves the prefix, loads its config, and starts logging.
fn prepare_prefix(flag: Option<&Path>, style: &mut OutputStyle) -> Result<PrefixLayout> {
    let prefix = resolve_prefix(flag, std::env::var_os(PREFIX_ENV))?;
    let layout = PrefixLayout::new(prefix);
    let config = CliConfig::load(&layout)?;
    init_tracing(&resolve_log_filter(
        std::env::var(LOG_ENV).ok().as_deref(),
        &config,
    ));
    *style = current_output_style(config.output.style);
    Ok(layout)
}

fn run_mark_command<S: MetadataStore>(
    store: &S,
    names: &[String],
    intent: MarkIntent,
    style: OutputStyle,
    out: &mut impl Write,
) -> Result<()> {
    let mut write_error = None;
    apply_mark_to_all_with(store, names, intent, |outcome| {
        for line in format_mark_outcome_lines(outcome, style) {
            if let Err(err) = writeln!(out, "{line}") {
                write_error.get_or_insert(err);
            }
        }
    })?;

    if let Some(err) = write_error {
        return Err(err).context("failed to write mark output");
    }
    Ok(())
}

fn run_list_command(layout: &PrefixLayout, out: &mut impl Write) -> Result<()> {
    let receipts = read_install_receipts(layout)?;
    if receipts.is_empty() {
        writeln!(out, "No installed packages")?;
        return Ok(());
    }
    for receipt in &receipts {
        writeln!(out, "{}", format_list_line(receipt))?;
    }
    Ok(())
}

fn format_list_line(receipt: &InstallReceipt) -> String {
    let mut line = format!("{} {}", receipt.name, receipt.version);
    if receipt.installed_on_request {
        line.push_str(" [on-request]");
    }
    if receipt.installed_as_dependency {
        line.push_str(" [dependency]");
    }
    line
}

fn resolve_prefix(flag: Option<&Path>, env_value: Option<OsString>) -> Result<PathBuf> {
    if let Some(prefix) = flag {
        return Ok(prefix.to_path_buf());
    }
    match env_value {
        Some(value) if !value.is_empty() => Ok(PathBuf::from(value)),
        _ => default_user_prefix(),
    }
}

fn resolve_log_filter(env_value: Option<&str>, config: &CliConfig) -> String {
    env_value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or(config.log.as_deref())
        .unwrap_or("warn")
        .to_string()
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<MarkError>() {
        Some(mark_error) => mark_error.exit_code() as u8,
        None => 1,
    }
}

#[cfg(test)]
mod tests;
