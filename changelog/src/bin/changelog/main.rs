mod commands;
mod context;
mod printer;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::control::ShouldColorize;
use std::path::PathBuf;

use context::ManifestContext;
use printer::{Format, Printer, Tone};

/// Inspect a changelog manifest and the changesets applied to its database.
///
/// The manifest defaults to `changelog.toml`; values such as `${REDIS_URL}`
/// are expanded from the environment. Set `RUST_LOG=changelog=debug` for
/// library diagnostics.
#[derive(Parser)]
#[command(name = "changelog", version)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Manifest to read
    #[arg(long, env = "CHANGELOG_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Changelog collection, overriding the manifest
    #[arg(long, global = true)]
    collection: Option<String>,

    #[arg(long, value_enum, default_value_t = Format::Table, global = true)]
    output: Format,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the manifest and list its changesets, without connecting
    Check,
    /// Applied, pending and disabled changesets of the manifest's database
    Status,
    /// When and by whom one changeset was applied
    Show {
        /// Changeset name
        name: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }
    let printer = Printer {
        format: cli.output,
        quiet: cli.quiet,
        verbose: cli.verbose,
        color: !cli.no_color && ShouldColorize::from_env().should_colorize(),
    };

    if let Err(err) = execute(cli, &printer).await {
        printer.line(Tone::Fail, &format!("{err:#}"));
        std::process::exit(1);
    }
}

async fn execute(cli: Cli, printer: &Printer) -> Result<()> {
    let ctx = ManifestContext::load(cli.config.as_deref(), cli.collection.as_deref())?;
    printer.debug(&format!("manifest {}, collection `{}`", ctx.manifest_path.display(), ctx.collection));

    match cli.command {
        Commands::Check => commands::check::run(&ctx, printer),
        Commands::Status => commands::status::run(&ctx, printer).await,
        Commands::Show { name } => commands::show::run(&ctx, &name, printer).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["changelog", "show", "initDB", "--output", "json", "--collection", "audit"])
            .unwrap();

        assert_eq!(cli.output, Format::Json);
        assert_eq!(cli.collection.as_deref(), Some("audit"));
        assert!(matches!(cli.command, Commands::Show { ref name } if name == "initDB"));
    }
}
