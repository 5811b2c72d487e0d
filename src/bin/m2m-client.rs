use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use m2m_client::config::settings::LogFormat;
use m2m_client::inject::get_client;
use m2m_client::observability::metrics::gather_metrics;
use m2m_client::utils::logging::{self, LogLevel};
use serde_json::Value;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, env = "LOG_LEVEL", value_enum, global = true)]
    log_level: Option<LogLevel>,
    #[arg(long, env = "LOG_FORMAT", value_enum, global = true)]
    log_format: Option<LogFormat>,
    /// Print the collected metrics after the command finishes
    #[arg(long, global = true)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a token for the service and print it
    Token {
        #[arg(short, long)]
        service: String,
    },
    /// Authenticated GET against the service, printing the JSON body
    Get {
        #[arg(short, long)]
        service: String,
        path: String,
        /// Query parameter as key=value, repeatable
        #[arg(short, long = "query")]
        query: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read arguments, init logging
    // -------------------------------

    let args = Args::parse();
    logging::init_logging(&logging::logging_config(args.log_level, args.log_format));

    // -------------------------------
    // 2. Run command
    // -------------------------------

    let output = match args.command {
        Command::Token { service } => {
            let client = get_client(&service).await.context("failed to create client")?;
            let token = client.fetch_token().await?;
            info!("token for '{}' expires at {}", service, token.expires_at);
            serde_json::to_value(&token)?
        }
        Command::Get { service, path, query } => {
            let query = parse_query(&query)?;
            let client = get_client(&service).await.context("failed to create client")?;
            client.get_json::<Value, _>(&path, &query).await?
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    // -------------------------------
    // 3. Metrics
    // -------------------------------

    if args.print_metrics {
        print!("{}", gather_metrics().await);
    }

    Ok(())
}

fn parse_query(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .ok_or_else(|| anyhow!("query parameter '{}' must look like key=value", pair))
        })
        .collect()
}
