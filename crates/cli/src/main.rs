use anyhow::Context;
use atlas_kernel::Settings;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "atlas-cli", version, about = "Bookshelf API command line")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Boot every module and serve HTTP until Ctrl+C / SIGTERM
    Serve {
        /// Override `server.port`
        #[arg(long)]
        port: Option<u16>,
        /// Skip loading the demo catalog and users
        #[arg(long)]
        no_fixtures: bool,
    },
    /// Print the effective configuration as JSON (secrets omitted)
    Config,
    /// Print the Argon2id hash of a password
    HashPassword { password: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { port, no_fixtures } => {
            let mut settings = load_settings()?;
            if let Some(port) = port {
                settings.server.port = port;
            }
            if no_fixtures {
                settings.database.seed_fixtures = false;
            }

            let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
            runtime.block_on(bookshelf_api::run(settings))
        }
        Command::Config => {
            let settings = load_settings()?;
            let rendered =
                serde_json::to_string_pretty(&settings).context("failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
        Command::HashPassword { password } => {
            let hash = atlas_authz::hash_password(&password).context("failed to hash password")?;
            println!("{hash}");
            Ok(())
        }
    }
}

fn load_settings() -> anyhow::Result<Settings> {
    Settings::load().with_context(|| "failed to load settings")
}
