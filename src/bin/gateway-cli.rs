use std::path::PathBuf;

use clap::{Parser, Subcommand};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use upload_gateway::config::schema::default_routes;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Upload client for the multipart upload gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload files and fields to a gateway route
    Upload {
        /// Public route path
        #[arg(short, long, default_value = "/api/summarize")]
        route: String,

        /// File part as NAME=PATH (repeatable)
        #[arg(short, long = "file", value_parser = parse_file)]
        files: Vec<(String, PathBuf)>,

        /// Value part as NAME=VALUE (repeatable)
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Write the response body here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the built-in route table
    Routes,
}

fn split_pair(s: &str) -> Result<(&str, &str), String> {
    s.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))
}

fn parse_file(s: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = split_pair(s)?;
    Ok((name.to_string(), PathBuf::from(path)))
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    let (name, value) = split_pair(s)?;
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Upload {
            route,
            files,
            fields,
            output,
        } => {
            let mut form = Form::new();
            for (name, path) in files {
                let bytes = tokio::fs::read(&path).await?;
                let file_name = path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "upload".to_string());
                form = form.part(name, Part::bytes(bytes).file_name(file_name));
            }
            for (name, value) in fields {
                form = form.text(name, value);
            }

            let url = format!("{}{}", cli.url.trim_end_matches('/'), route);
            let res = reqwest::Client::new()
                .post(&url)
                .multipart(form)
                .send()
                .await?;
            print_response(res, output).await?;
        }
        Commands::Routes => {
            for route in default_routes() {
                println!("{:<22} POST {:<28} -> {}", route.name, route.path, route.downstream_path);
            }
        }
    }

    Ok(())
}

async fn print_response(
    res: reqwest::Response,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    eprintln!("Status: {}", status);
    if !content_type.is_empty() {
        eprintln!("Content-Type: {}", content_type);
    }

    let body = res.bytes().await?;
    if let Some(path) = output {
        tokio::fs::write(&path, &body).await?;
        eprintln!("Wrote {} bytes to {}", body.len(), path.display());
        return Ok(());
    }

    if content_type.starts_with("application/json") {
        if let Ok(json) = serde_json::from_slice::<Value>(&body) {
            println!("{}", serde_json::to_string_pretty(&json)?);
            return Ok(());
        }
    }
    match std::str::from_utf8(&body) {
        Ok(text) => println!("{}", text),
        Err(_) => eprintln!("<{} bytes of binary content; use --output>", body.len()),
    }
    Ok(())
}
