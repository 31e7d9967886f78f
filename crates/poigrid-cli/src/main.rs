mod crawl;
mod load;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "poigrid")]
#[command(about = "Budget-bounded grid crawl of a places search service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl every keyword over every grid tile of the crawl profile
    Crawl {
        /// Print the tile plan and worst-case request cost, then exit
        #[arg(long)]
        dry_run: bool,

        /// Override POIGRID_REQUEST_BUDGET for this run
        #[arg(long)]
        budget: Option<u64>,
    },
    /// Append a previously exported JSON list of places to the places table
    Load {
        /// JSON file holding a top-level array of place objects
        file: PathBuf,

        /// Location label stored on every loaded row
        #[arg(long)]
        location: String,

        /// Keyword for records that carry no `search_keyword`
        #[arg(long, default_value = "unknown")]
        keyword: String,
    },
    /// Print the grid for a crawl profile without any network traffic
    Grid {
        /// Crawl profile YAML
        #[arg(long, env = "POIGRID_CRAWL_PATH", default_value = "./config/crawl.yaml")]
        profile: PathBuf,

        /// Page cap used for the worst-case cost estimate
        #[arg(long, env = "POIGRID_MAX_PAGES_PER_TILE", default_value_t = 3)]
        max_pages: u32,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Verify the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Grid { profile, max_pages }) => {
            init_tracing("info")?;
            let profile = poigrid_core::load_crawl_profile(&profile)?;
            crawl::print_grid(&profile, max_pages, true)?;
        }
        Some(Commands::Crawl { dry_run: true, .. }) => {
            let plan = poigrid_core::load_plan_config_from_env()?;
            init_tracing(&plan.log_level)?;
            crawl::dry_run(&plan)?;
        }
        Some(Commands::Crawl {
            dry_run: false,
            budget,
        }) => {
            let config = poigrid_core::load_app_config_from_env()?;
            init_tracing(&config.log_level)?;
            crawl::run_crawl(&config, budget).await?;
        }
        Some(Commands::Load {
            file,
            location,
            keyword,
        }) => {
            let config = poigrid_core::load_app_config_from_env()?;
            init_tracing(&config.log_level)?;
            load::run_load(&config, &file, &location, &keyword).await?;
        }
        Some(Commands::Db { command }) => {
            let config = poigrid_core::load_app_config_from_env()?;
            init_tracing(&config.log_level)?;
            let pool_config = poigrid_db::PoolConfig::from_app_config(&config);
            let pool = poigrid_db::connect_pool(&config.database_url, pool_config).await?;
            match command {
                DbCommands::Ping => {
                    poigrid_db::ping(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = poigrid_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
            }
        }
        None => println!("poigrid: no command given; see --help"),
    }

    Ok(())
}

#[cfg(test)]
mod tests;
