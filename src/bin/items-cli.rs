use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "items-cli")]
#[command(about = "Client for the scale-to-zero item service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "ITEMS_URL")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service health (also counts as activity)
    Health,
    /// List all items, newest first
    List,
    /// Show one item
    Get { id: u64 },
    /// Create an item
    Create { name: String },
    /// Delete an item
    Delete { id: u64 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => {
            client
                .get(format!("{}/health", base))
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?
        }
        Commands::List => client.get(format!("{}/items", base)).send().await?,
        Commands::Get { id } => client.get(format!("{}/items/{}", base, id)).send().await?,
        Commands::Create { name } => {
            client
                .post(format!("{}/items", base))
                .json(&json!({ "name": name }))
                .send()
                .await?
        }
        Commands::Delete { id } => client.delete(format!("{}/items/{}", base, id)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error {}: {}", status, text);
        std::process::exit(1);
    }

    if text.is_empty() {
        println!("{}", status);
    } else {
        match serde_json::from_str::<Value>(&text) {
            Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
            Err(_) => println!("{}", text),
        }
    }
    Ok(())
}
