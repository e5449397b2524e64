use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gridplane-cli")]
#[command(about = "Management CLI for the GridPlane reverse proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8081")]
    url: String,

    #[arg(short, long, default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy system status
    Status,
    /// Print the active route table
    Routes,
    /// Apply a route set from a JSON file
    Apply {
        /// Path to a JSON array of routes
        file: String,
    },
    /// Show the metrics snapshot
    Metrics,
    /// Tail the live access-log stream
    Logs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Routes => {
            let res = client
                .get(format!("{}/admin/routes", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Apply { file } => {
            let payload = std::fs::read_to_string(&file)?;
            let routes: Value = serde_json::from_str(&payload)?;
            let res = client
                .put(format!("{}/admin/routes", cli.url))
                .headers(headers)
                .json(&routes)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Metrics => {
            let res = client
                .get(format!("{}/admin/metrics", cli.url))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Logs => {
            let mut res = client
                .get(format!("{}/admin/logs", cli.url))
                .headers(headers)
                .send()
                .await?;
            if !res.status().is_success() {
                eprintln!("Error: admin API returned status {}", res.status());
                return Ok(());
            }
            while let Some(chunk) = res.chunk().await? {
                print!("{}", String::from_utf8_lossy(&chunk));
            }
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
