use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;

use zeus_proxy::config::load_config;
use zeus_proxy::routing::ResourceRegistry;

#[derive(Parser)]
#[command(name = "zeus-cli")]
#[command(about = "Management CLI for the ZEUS SAFETY API proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and list its resources
    Check {
        config: PathBuf,
    },
    /// Call a resource through a running proxy
    Call {
        /// Local path, e.g. /api/colaboradores
        path: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Query parameter as key=value, repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,

        /// JSON request body
        #[arg(long)]
        json: Option<String>,

        /// Bearer token
        #[arg(long, env = "ZEUS_TOKEN")]
        token: Option<String>,

        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { config } => check(config),
        Commands::Call {
            path,
            method,
            params,
            json,
            token,
            url,
        } => call(&url, &path, &method, &params, json, token).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn check(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&path)?;
    let registry = ResourceRegistry::from_config(&config.resources).map_err(|errors| {
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    })?;

    println!("{} is valid, {} resources", path.display(), registry.len());
    println!(
        "{:<24} {:<32} {:<20} {:<9} BACKEND",
        "NAME", "PATH", "METHODS", "AUTH"
    );
    println!("{}", "-".repeat(100));
    for resource in registry.resources() {
        println!(
            "{:<24} {:<32} {:<20} {:<9} {}",
            resource.name(),
            resource.config.path,
            resource.config.methods.join(","),
            resource.config.auth.to_string(),
            resource.base_url
        );
    }
    Ok(())
}

async fn call(
    base: &str,
    path: &str,
    method: &str,
    params: &[(String, String)],
    json: Option<String>,
    token: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
    let url = format!("{}{}", base.trim_end_matches('/'), path);

    let mut request = reqwest::Client::new().request(method, url).query(params);
    if let Some(token) = token {
        request = request.header(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
    }
    if let Some(body) = json {
        let body: Value = serde_json::from_str(&body)?;
        request = request.json(&body);
    }

    let res = request.send().await?;
    let status = res.status();
    let text = res.text().await?;

    println!("HTTP {status}");
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{text}"),
    }

    if status.is_success() {
        Ok(())
    } else {
        Err(format!("proxy returned {status}").into())
    }
}
