//! CLI harness for exercising a vault teller against real nodes
//!
//! The vault and sessions live in a SQLite file, so state carries over
//! between runs. Commands that touch secrets unlock the vault first.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teller_storage::Database;
use tracing::info;
use vault_teller::{
    CreateAccountRequest, FeeRequest, NetworkTarget, SupportedProtocol, TellerConfig,
    UnlockOptions, VaultTeller,
};

#[derive(Parser)]
#[command(name = "teller-harness")]
#[command(about = "Multi-chain vault teller harness", long_about = None)]
struct Cli {
    /// SQLite database holding the vault and sessions
    #[arg(short, long, default_value = "teller.db")]
    db: PathBuf,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty vault
    Init {
        /// Vault passphrase
        #[arg(short, long)]
        passphrase: String,
    },

    /// Unlock and print the session
    Unlock {
        /// Vault passphrase
        #[arg(short, long)]
        passphrase: String,
    },

    /// Create a random account
    CreateAccount {
        /// Vault passphrase
        #[arg(short, long)]
        passphrase: String,

        /// pocket, ethereum or cosmos
        #[arg(long)]
        protocol: SupportedProtocol,

        /// Display name
        #[arg(short, long)]
        name: String,
    },

    /// List vault accounts
    Accounts {
        /// Vault passphrase
        #[arg(short, long)]
        passphrase: String,
    },

    /// Query a balance
    Balance {
        /// Network name from the config
        #[arg(short, long)]
        network: String,

        /// Address to query
        #[arg(short, long)]
        address: String,

        /// ERC-20 contract
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Fetch a fee quote
    Fee {
        /// Network name from the config
        #[arg(short, long)]
        network: String,
    },

    /// Check a network
    Status {
        /// Network name from the config
        #[arg(short, long)]
        network: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => TellerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TellerConfig::default(),
    };
    let teller = open_teller(&cli.db, config.clone())?;

    match cli.command {
        Commands::Init { passphrase } => {
            teller.initialize_vault(&passphrase).await?;
            info!("Vault initialized in {}", cli.db.display());
        }
        Commands::Unlock { passphrase } => {
            let session = teller
                .unlock_vault(&passphrase, UnlockOptions::default())
                .await?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        Commands::CreateAccount {
            passphrase,
            protocol,
            name,
        } => {
            let session = teller
                .unlock_vault(&passphrase, UnlockOptions::default())
                .await?;
            let account = teller
                .create_account(session.id(), CreateAccountRequest::new(protocol, name))
                .await?;
            println!("{}", serde_json::to_string_pretty(&account)?);
            teller.revoke_session(session.id(), session.id())?;
        }
        Commands::Accounts { passphrase } => {
            let session = teller
                .unlock_vault(&passphrase, UnlockOptions::default())
                .await?;
            let accounts = teller.list_accounts(session.id())?;
            println!("{}", serde_json::to_string_pretty(&accounts)?);
            teller.revoke_session(session.id(), session.id())?;
        }
        Commands::Balance {
            network,
            address,
            token,
        } => {
            let target = network_target(&config, &network)?;
            let balance = teller
                .get_balance(&target, &address, token.as_deref())
                .await?;
            println!("{}", balance);
        }
        Commands::Fee { network } => {
            let target = network_target(&config, &network)?;
            let fee = teller.get_fee(&target, &FeeRequest::default()).await?;
            println!("{}", serde_json::to_string_pretty(&fee)?);
        }
        Commands::Status { network } => {
            let target = network_target(&config, &network)?;
            let status = teller.get_network_status(&target).await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

fn open_teller(db: &Path, config: TellerConfig) -> anyhow::Result<VaultTeller> {
    let database =
        Database::open(db).with_context(|| format!("opening database {}", db.display()))?;
    let teller = VaultTeller::builder()
        .config(config)
        .storage(Arc::new(database))
        .build()?;
    Ok(teller)
}

fn network_target(config: &TellerConfig, name: &str) -> anyhow::Result<NetworkTarget> {
    config
        .network(name)
        .cloned()
        .ok_or_else(|| anyhow!("network {} is not configured", name))
}
