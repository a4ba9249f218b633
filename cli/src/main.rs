mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    cmd_best, cmd_import, cmd_list, cmd_portion, cmd_search, cmd_show,
};
use crate::config::Config;
use nutridash_core::service::FoodService;

#[derive(Parser)]
#[command(
    name = "nutridash",
    version,
    about = "Search a local FoodData Central catalog",
    long_about = "Browse and search a local catalog of USDA FoodData Central foods.\n\
                  Import a CSV distribution once, then query descriptions, macros\n\
                  and portions offline."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every food in the catalog
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one food by its FDC identifier
    Show {
        /// FDC identifier
        fdc_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search food descriptions (every word must match)
    Search {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the best nutrition match for a description
    Best {
        /// Search query
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the first household portion for a food
    Portion {
        /// FDC identifier
        fdc_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a FoodData Central CSV distribution directory
    Import {
        /// Directory containing food.csv and friends
        dir: std::path::PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let service = FoodService::new(&config.db_path)?;

    match cli.command {
        Commands::List { json } => cmd_list(&service, json),
        Commands::Show { fdc_id, json } => cmd_show(&service, fdc_id, json),
        Commands::Search { query, json } => cmd_search(&service, &query, json),
        Commands::Best { query, json } => cmd_best(&service, &query, json),
        Commands::Portion { fdc_id, json } => cmd_portion(&service, fdc_id, json),
        Commands::Import { dir, json } => cmd_import(&service, &dir, json),
        Commands::Serve { port, bind } => server::start_server(service, port, &bind).await,
    }
}
