use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metric_query::{
    config::{write_sample_config, ConfigLoader},
    logging::init_logging,
    server, QueryService, SessionId,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "metric-query", version, about = "Natural-language metric query extraction service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve(ServeArgs),

    /// Extract a single query with empty history and print the results
    Ask {
        /// Query text
        query: String,

        /// Configuration file
        #[arg(short, long, env = "METRIC_QUERY_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Write a sample configuration file
    InitConfig {
        /// Output path
        #[arg(short, long, default_value = "metric-query.toml.example")]
        output: PathBuf,
    },
}

#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// Configuration file
    #[arg(short, long, env = "METRIC_QUERY_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level or filter expression (overrides config)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(args) => serve(args).await,
        Command::Ask { query, config } => ask(&query, config).await,
        Command::InitConfig { output } => {
            write_sample_config(&output)?;
            println!("📝 サンプル設定ファイルを生成しました: {}", output.display());
            Ok(())
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<metric_query::AppConfig> {
    let path = path.map(|p| p.to_string_lossy().into_owned());
    ConfigLoader::new()
        .load_from_file(path.as_deref())
        .load_from_env()
        .build()
}

async fn serve(args: ServeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    let _guard = init_logging(&config.logging)?;

    if config.llm.get_api_key().is_none() && config.llm.endpoint.is_none() {
        tracing::warn!(
            "{} is not set; queries will fail until it is configured",
            metric_query::llm::config::API_KEY_ENV
        );
    }

    info!(
        model = %config.llm.default_model,
        history = config.history.max_entries,
        context_window = config.history.context_window,
        idle_timeout_secs = config.history.idle_timeout_secs,
        "metric-query {} starting",
        env!("CARGO_PKG_VERSION")
    );

    let service = QueryService::from_config(&config);
    server::serve(&config, service).await
}

async fn ask(query: &str, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path.as_ref())?;
    let _guard = init_logging(&config.logging.clone().with_level("warn"))?;

    let service = QueryService::from_config(&config);
    let results = service
        .process(&SessionId::new(), query)
        .await
        .context("Query failed")?;

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
