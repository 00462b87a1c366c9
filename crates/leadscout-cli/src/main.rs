mod search;
mod user;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use leadscout_search::Classifier;

use crate::user::UserCommands;

#[derive(Debug, Parser)]
#[command(name = "leadscout-cli")]
#[command(about = "Leadscout command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Run a lead search on behalf of a user and charge their credits
    Search {
        /// Email of the user running the search
        #[arg(long)]
        email: String,
        /// Where to look (e.g., "Chennai")
        #[arg(long)]
        location: String,
        /// What the user sells; used when --criteria is absent
        #[arg(long, default_value = "")]
        service: String,
        /// Free-text description of the target businesses
        #[arg(long, default_value = "")]
        criteria: String,
        /// Maximum number of leads to return
        #[arg(long, default_value_t = leadscout_core::DEFAULT_REQUESTED_COUNT)]
        limit: u32,
        /// Print leads as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Manage users and their subscriptions
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// List subscription plans
    Plans {
        /// Plan catalog to read
        #[arg(long, env = "LEADSCOUT_PLANS_PATH", default_value = "./config/plans.yaml")]
        path: PathBuf,
    },
    /// Show the map tag predicates a criteria string resolves to
    Classify {
        /// Criteria text, e.g. "clothing stores and cafes"
        text: String,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Db { command }) => run_db(command).await?,
        Some(Commands::Search {
            email,
            location,
            service,
            criteria,
            limit,
            json,
        }) => {
            let request = leadscout_core::SearchRequest {
                service,
                location,
                criteria,
                requested_count: limit,
            };
            search::run_search(&email, request, json).await?;
        }
        Some(Commands::User { command }) => user::run_user(command).await?,
        Some(Commands::Plans { path }) => run_plans(&path)?,
        Some(Commands::Classify { text }) => run_classify(&text),
        None => println!("leadscout-cli ready; run with --help for commands"),
    }

    Ok(())
}

/// Loads config and opens a pool sized from it.
pub(crate) async fn connect() -> anyhow::Result<(leadscout_core::AppConfig, sqlx::PgPool)> {
    let config = leadscout_core::load_app_config()?;
    let pool_config = leadscout_db::PoolConfig::from_app_config(&config);
    let pool = leadscout_db::connect_pool(&config.database_url, pool_config).await?;
    Ok((config, pool))
}

async fn run_db(command: DbCommands) -> anyhow::Result<()> {
    let (_, pool) = connect().await?;
    match command {
        DbCommands::Ping => {
            leadscout_db::health_check(&pool).await?;
            println!("database ok");
        }
        DbCommands::Migrate => {
            let applied = leadscout_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
    }
    Ok(())
}

fn run_plans(path: &Path) -> anyhow::Result<()> {
    let catalog = leadscout_core::load_plans(path)?;
    println!("{:<16}{:<16}{:>8}{:>8}  NOTES", "ID", "NAME", "PRICE", "LEADS");
    for plan in &catalog.plans {
        let mut notes = Vec::new();
        if plan.default {
            notes.push("default");
        }
        if plan.popular {
            notes.push("popular");
        }
        println!(
            "{:<16}{:<16}{:>8}{:>8}  {}",
            plan.id,
            plan.name,
            plan.price.to_string(),
            plan.limit,
            notes.join(", ")
        );
    }
    Ok(())
}

fn run_classify(text: &str) {
    let classifier = Classifier::default();
    let terms = classifier.classify(text);
    for term in &terms {
        let predicates: Vec<&str> = term
            .predicates
            .iter()
            .map(leadscout_core::TagPredicate::as_str)
            .collect();
        println!("{:<24}{}", term.raw_term, predicates.join(" "));
    }
    let merged = Classifier::merged_predicates(&terms);
    println!("{} term(s), {} distinct predicate(s)", terms.len(), merged.len());
}
