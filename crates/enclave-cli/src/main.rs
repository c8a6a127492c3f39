use anyhow::{anyhow, Result};
use clap::Parser;
use enclave_search::{config, Config};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "enclave", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (default: ~/.config/enclave/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Create a fresh, empty index for a tenant
    ///
    /// Any index the tenant already has is deleted first, together with all
    /// of its documents. The new index has the fixed document schema and the
    /// configured vector dimensionality.
    CreateIndex {
        /// Tenant whose index to create
        tenant: String,
    },
    /// Delete a tenant's index and everything in it
    DeleteIndex {
        /// Tenant whose index to delete
        tenant: String,
    },
    /// Embed a document and store it in one or more tenants' indexes
    ///
    /// The text is sent to the embedding provider once; the resulting vector
    /// is ingested into every tenant given with --tenant. Each tenant gets
    /// its own copy and never sees documents from other tenants.
    Ingest {
        /// Tenant to ingest into (repeatable)
        #[arg(long = "tenant", required = true)]
        tenants: Vec<String>,

        /// Document title
        #[arg(long)]
        title: String,

        /// Document URL
        #[arg(long)]
        url: String,

        /// Document id (default: a random UUID)
        #[arg(long)]
        id: Option<String>,

        /// Text to embed (default: the title)
        text: Option<String>,
    },
    /// Embed a question and find the most similar document for a tenant
    Query {
        /// Tenant to search
        #[arg(long)]
        tenant: String,

        /// Number of nearest neighbours to ask the backend for
        #[arg(long, short = 'k', default_value_t = 5)]
        top_k: usize,

        /// Print every ranked hit instead of only the best one
        #[arg(long)]
        all: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Text to search for
        text: String,
    },
    /// Show how many documents a tenant's index holds
    Count {
        /// Tenant whose documents to count
        tenant: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration (keys redacted)
    Show,
    /// Print the config file path
    Path,
    /// Print an example config file
    Example,
    /// Create the config file from the example if it does not exist
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(config::config_file_path);
    let config = Config::load_from(&config_path)?;

    twyg::setup(config.logging.clone()).map_err(|e| anyhow!("Failed to set up logging: {:?}", e))?;
    log::debug!("Loaded configuration from {}", config_path.display());

    match cli.command {
        Commands::CreateIndex { tenant } => {
            commands::create_index(&config, &tenant).await?;
        }
        Commands::DeleteIndex { tenant } => {
            commands::delete_index(&config, &tenant).await?;
        }
        Commands::Ingest {
            tenants,
            title,
            url,
            id,
            text,
        } => {
            let request = commands::IngestRequest {
                tenants,
                title,
                url,
                id,
                text,
            };
            commands::run_ingest(&config, request).await?;
        }
        Commands::Query {
            tenant,
            top_k,
            all,
            json,
            text,
        } => {
            let request = commands::QueryRequest {
                tenant,
                top_k,
                all,
                json,
                text,
            };
            commands::run_query(&config, request).await?;
        }
        Commands::Count { tenant } => {
            commands::count_documents(&config, &tenant).await?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(&config, &config_path)?,
            ConfigAction::Path => commands::config::show_path(&config_path),
            ConfigAction::Example => commands::config::show_example(),
            ConfigAction::Init => commands::config::init_config(&config_path)?,
        },
    }

    Ok(())
}
