use std::time::Duration;

use clap::Parser;
use gateway_sdk::{ApiClient, ApiResponse, RequestOptions};
use reqwest::Method;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Call an API through the edge gateway", long_about = None)]
struct Cli {
    /// Gateway origin.
    #[arg(short, long, default_value = "http://localhost:8788")]
    url: String,

    /// Per-call timeout in milliseconds (0 = default).
    #[arg(short, long, default_value_t = 0)]
    timeout_ms: u64,

    /// HTTP method (GET, POST, PUT, PATCH, DELETE).
    method: String,

    /// Path below the API prefix, starting with '/'.
    path: String,

    /// Query parameter as key=value. Repeatable.
    #[arg(short, long = "query", value_parser = parse_pair::<'='>)]
    query: Vec<(String, String)>,

    /// Header as name:value. Repeatable.
    #[arg(short = 'H', long = "header", value_parser = parse_pair::<':'>)]
    headers: Vec<(String, String)>,

    /// JSON request body.
    #[arg(short, long)]
    data: Option<String>,
}

fn parse_pair<const SEP: char>(raw: &str) -> Result<(String, String), String> {
    raw.split_once(SEP)
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected `name{SEP}value`, got `{raw}`"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = ApiClient::new(&cli.url);

    let method = Method::from_bytes(cli.method.to_uppercase().as_bytes())?;
    let mut options = RequestOptions::new(method).timeout(Duration::from_millis(cli.timeout_ms));
    for (key, value) in &cli.query {
        options = options.query(key, value);
    }
    for (name, value) in &cli.headers {
        options = options.header(name, value);
    }
    if let Some(data) = &cli.data {
        let body: Value = serde_json::from_str(data)?;
        options = options.json(body);
    }

    let res: ApiResponse<Value> = client.fetch(&cli.path, options).await;
    if !res.ok {
        eprintln!("Error: gateway returned status {}", res.status);
    }
    println!("{}", serde_json::to_string_pretty(&res)?);
    Ok(())
}
