//! Command-line front end: issue one request and print the response.
//!
//! ```text
//! simple-http-client [--config FILE] [--method M] [--header 'K: V']... [--data BODY] [--ca-file PEM] URL
//! ```
//!
//! Exits with status 1 when the request fails, including on 5xx responses.

use std::path::PathBuf;
use std::process::ExitCode;

use bytes::Bytes;
use clap::Parser;
use hyper::header::{HeaderName, HeaderValue};
use hyper::Method;

use simple_http_client::config::{load_config, ClientConfig};
use simple_http_client::observability::logging;
use simple_http_client::{HttpClient, Request};

#[derive(Parser)]
#[command(name = "simple-http-client")]
#[command(about = "Send one HTTP/1.1 request through a pooled client", long_about = None)]
struct Cli {
    /// TOML file with client settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request header as `Name: value`; repeatable
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(HeaderName, HeaderValue)>,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,

    /// PEM file of extra root certificates for https
    #[arg(long)]
    ca_file: Option<PathBuf>,

    url: String,
}

fn parse_header(raw: &str) -> Result<(HeaderName, HeaderValue), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected `Name: value`, got `{raw}`"))?;
    let name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|e| e.to_string())?;
    let value = HeaderValue::from_str(value.trim()).map_err(|e| e.to_string())?;
    Ok((name, value))
}

fn main() -> ExitCode {
    logging::init("simple_http_client=info");
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to load configuration");
                return ExitCode::FAILURE;
            }
        },
        None => ClientConfig::default(),
    };
    if let Some(ca_file) = cli.ca_file.clone() {
        config.tls_ca_file = Some(ca_file);
    }

    let method = match Method::from_bytes(cli.method.to_ascii_uppercase().as_bytes()) {
        Ok(method) => method,
        Err(e) => {
            tracing::error!(method = %cli.method, error = %e, "Invalid method");
            return ExitCode::FAILURE;
        }
    };

    let client = match HttpClient::start(config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start client");
            return ExitCode::FAILURE;
        }
    };

    let mut request = Request::new(method, cli.url);
    for (name, value) in cli.headers {
        request = request.header(name, value);
    }
    if let Some(data) = cli.data {
        request = request.with_body(Bytes::from(data));
    }

    let code = client.execute(
        request,
        |response| {
            println!("{}", response.status());
            println!("{}", response.text());
            ExitCode::SUCCESS
        },
        |error| {
            eprintln!("request failed: {error}");
            ExitCode::FAILURE
        },
    );
    client.stop();
    code
}
