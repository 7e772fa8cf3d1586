//! SHELF command line
//!
//! - `shelf-cli serve` boots the catalog and serves HTTP until Ctrl-C
//! - `shelf-cli routes` prints every mounted endpoint
//! - `shelf-cli config` prints the resolved settings as JSON

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_db::Database;
use shelf_kernel::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "shelf-cli")]
#[command(version, about = "Book catalog API", long_about = None)]
struct Cli {
    /// Directory holding base.toml and the per-environment overlays
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Environment overlay to apply (local, staging, production)
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Print the route table
    Routes,
    /// Print the resolved configuration
    Config,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        if self.config_dir.is_none() && self.env.is_none() {
            return Settings::load();
        }

        let config_dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };
        let env = self.env.as_deref().unwrap_or("local");
        Settings::load_from(&config_dir, env)
    }
}

fn print_routes() -> anyhow::Result<()> {
    let registry = shelf_app::build_registry(&Database::in_memory("routes"))?;
    for (method, path) in registry.route_table() {
        println!("{:<7} {}", method, path);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            let settings = cli.settings().context("failed to load SHELF settings")?;
            shelf_telemetry::init(&settings.telemetry)?;
            shelf_app::run(settings).await
        }
        Command::Routes => print_routes(),
        Command::Config => {
            let settings = cli.settings().context("failed to load SHELF settings")?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            Ok(())
        }
    }
}
