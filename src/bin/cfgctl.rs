use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "cfgctl")]
#[command(about = "Management CLI for the live-config service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:2080")]
    url: String,

    /// Bearer token, if the service requires one
    #[arg(short, long)]
    key: Option<String>,

    /// Tenant; empty means the service default
    #[arg(short, long, default_value = "")]
    tenant: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sections as structured values (all when none given)
    Get { sections: Vec<String> },
    /// Show sections as canonical JSON text
    GetJson { sections: Vec<String> },
    /// Apply a partial payload, e.g. '{"general": {"node_id": "n1"}}'
    Set {
        payload: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Apply a relaxed JSON document read from a file
    SetJson {
        file: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Reload a section (or *all) from a file, directory or URL
    Reload {
        #[arg(long, default_value = "*all")]
        section: String,
        #[arg(long, default_value = "")]
        path: String,
        #[arg(long)]
        dry_run: bool,
    },
    /// Copy live sections to the backing store
    Store { sections: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    if let Some(key) = &cli.key {
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", key))?);
    }

    let (method, params) = match cli.command {
        Commands::Get { sections } => ("ConfigSv1.GetConfig", json!({"Tenant": cli.tenant, "Sections": sections})),
        Commands::GetJson { sections } => (
            "ConfigSv1.GetConfigAsJSON",
            json!({"Tenant": cli.tenant, "Sections": sections}),
        ),
        Commands::Set { payload, dry_run } => {
            let config: Value = serde_json::from_str(&payload)?;
            (
                "ConfigSv1.SetConfig",
                json!({"Tenant": cli.tenant, "Config": config, "DryRun": dry_run}),
            )
        }
        Commands::SetJson { file, dry_run } => {
            let raw = std::fs::read_to_string(&file)?;
            (
                "ConfigSv1.SetConfigFromJSON",
                json!({"Tenant": cli.tenant, "Config": raw, "DryRun": dry_run}),
            )
        }
        Commands::Reload { section, path, dry_run } => (
            "ConfigSv1.ReloadConfig",
            json!({"Tenant": cli.tenant, "Section": section, "Path": path, "DryRun": dry_run}),
        ),
        Commands::Store { sections } => (
            "ConfigSv1.StoreCfgInDB",
            json!({"Tenant": cli.tenant, "Sections": sections}),
        ),
    };

    let res = client
        .post(format!("{}/jsonrpc", cli.url))
        .headers(headers)
        .json(&json!({"id": 1, "method": method, "params": params}))
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    if let Some(err) = json.get("error").filter(|e| !e.is_null()) {
        eprintln!(
            "Error [{}] {}: {}",
            err["kind"].as_str().unwrap_or("unknown"),
            err["operation"].as_str().unwrap_or(""),
            err["message"].as_str().unwrap_or("")
        );
        std::process::exit(1);
    }
    println!("{}", serde_json::to_string_pretty(&json["result"])?);
    Ok(())
}
