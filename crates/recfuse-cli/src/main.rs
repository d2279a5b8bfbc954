mod commands;
mod pipeline;

use clap::{Parser, Subcommand, ValueEnum};
use recfuse_core::ContentKind;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "recfuse-cli")]
#[command(about = "Recommendation pipeline operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum KindArg {
    Movie,
    Show,
}

impl From<KindArg> for ContentKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Movie => ContentKind::Movie,
            KindArg::Show => ContentKind::Show,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one aggregation pass now (Ctrl-C stops at the next batch)
    Aggregate,
    /// Show aggregation health from the latest run record
    Health {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a fairness audit over the trailing window and persist it
    Audit {
        /// Window length in days (defaults to RECFUSE_AUDIT_WINDOW_DAYS)
        #[arg(long)]
        days: Option<i64>,
    },
    /// Print a fairness report over the trailing window without persisting
    Report {
        /// Window length in days (defaults to RECFUSE_AUDIT_WINDOW_DAYS)
        #[arg(long)]
        days: Option<i64>,
    },
    /// Fetch fused recommendations for one user
    Recommend {
        #[arg(long)]
        user: String,
        /// Favorite genre; repeat for several
        #[arg(long = "genre")]
        genres: Vec<String>,
        /// Preferred network; repeat for several
        #[arg(long = "network")]
        networks: Vec<String>,
        #[arg(long, value_enum, default_value = "show")]
        kind: KindArg,
        /// Free-text title query
        #[arg(long)]
        query: Option<String>,
        /// Demographic bucket recorded with the response
        #[arg(long)]
        bucket: Option<String>,
        #[arg(long, default_value = "10")]
        limit: usize,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("recfuse-cli: no command given; run with --help for usage");
        return Ok(());
    };

    let config = recfuse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let pool_config = recfuse_db::PoolConfig::from_app_config(&config);
    let pool = recfuse_db::connect_pool(&config.database_url, pool_config).await?;
    recfuse_db::run_migrations(&pool).await?;

    match command {
        Commands::Aggregate => commands::run_aggregate(&pool, &config).await,
        Commands::Health { json } => commands::run_health(&pool, &config, json).await,
        Commands::Audit { days } => {
            commands::run_audit(&pool, &config, days.unwrap_or(config.audit_window_days)).await
        }
        Commands::Report { days } => {
            commands::run_report(&pool, &config, days.unwrap_or(config.audit_window_days)).await
        }
        Commands::Recommend {
            user,
            genres,
            networks,
            kind,
            query,
            bucket,
            limit,
            json,
        } => {
            let prefs = recfuse_core::UserPreferences {
                user_id: user,
                favorite_genres: genres,
                preferred_networks: networks,
                kind: kind.into(),
                query,
                demographic_bucket: bucket,
            };
            commands::run_recommend(&pool, &config, &prefs, limit, json).await
        }
    }
}
