// SPDX-FileCopyrightText: 2026 Peerwarden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Peerwarden - a chat bot that provisions WireGuard VPN clients.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use peerwarden_config::{ConfigError, PeerwardenConfig};

/// Peerwarden - a chat bot that provisions WireGuard VPN clients.
#[derive(Parser, Debug)]
#[command(name = "peerwarden", version, about, long_about = None)]
struct Cli {
    /// Read this config file instead of the standard locations.
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot until SIGINT or SIGTERM.
    Serve,
    /// Validate the configuration and print a summary.
    CheckConfig {
        /// Print the effective configuration as TOML instead.
        #[arg(long)]
        dump: bool,
    },
}

fn load(path: Option<&PathBuf>) -> Result<PeerwardenConfig, Vec<ConfigError>> {
    match path {
        Some(path) => peerwarden_config::load_and_validate_path(path),
        None => peerwarden_config::load_and_validate(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load(cli.config.as_ref()) {
        Ok(config) => config,
        Err(errors) => {
            peerwarden_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig { dump: false }) => {
            print!("{}", check::summary(&config));
        }
        Some(Commands::CheckConfig { dump: true }) => match check::dump(&config) {
            Ok(text) => print!("{text}"),
            Err(e) => {
                eprintln!("error: cannot render config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("peerwarden: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["peerwarden", "serve"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert!(cli.config.is_none());

        let cli =
            Cli::try_parse_from(["peerwarden", "check-config", "--config", "/tmp/pw.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig { dump: false })));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/pw.toml")));

        let cli = Cli::try_parse_from(["peerwarden", "check-config", "--dump"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig { dump: true })));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["peerwarden", "shell"]).is_err());
    }
}
