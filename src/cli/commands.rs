use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;

use super::demo::demo_app;
use crate::runtime_config::AppConfig;
use crate::server::Request;

/// Command-line interface for switchyard
#[derive(Parser, Debug)]
#[command(name = "switchyard", version)]
#[command(about = "Inspect and exercise a switchyard dispatch core", long_about = None)]
pub struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true, env = "SWITCHYARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Include underlying error messages in 500 responses
    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the demo application's route table
    Routes,
    /// Run one simulated request through the demo application
    Dispatch {
        /// HTTP method, e.g. GET
        method: String,

        /// Request path, query string allowed
        path: String,

        /// Request header as `name:value` (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
}

impl Cli {
    /// Configuration from `--config` (or the environment), with `--debug`
    /// applied on top.
    pub fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None => AppConfig::from_env(),
        };
        if self.debug {
            config.debug = true;
        }
        Ok(config)
    }
}

/// Split `name:value`, trimming both halves.
pub fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected name:value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Run `cli` against stdout.
pub fn run_cli(cli: &Cli, config: AppConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(&cli.command, config, &mut out)
}

/// Run one command, writing its report to `out`.
pub fn execute(command: &Commands, config: AppConfig, out: &mut impl Write) -> Result<()> {
    let dispatcher = demo_app(config)?;
    match command {
        Commands::Routes => {
            for line in dispatcher.router().route_table() {
                writeln!(out, "{line}")?;
            }
        }
        Commands::Dispatch {
            method,
            path,
            headers,
            body,
        } => {
            let mut req = Request::parse(method, path.as_str())
                .with_context(|| format!("Invalid HTTP method '{method}'"))?;
            for (name, value) in headers {
                req = req.with_header(name, value.as_str());
            }
            if let Some(body) = body {
                let value = serde_json::from_str(body).context("Request body is not valid JSON")?;
                req = req.with_body(value);
            }
            debug!(request_id = %req.request_id, "Dispatching simulated request");

            let res = dispatcher.dispatch(req);
            writeln!(out, "HTTP {} {}", res.status(), res.reason())?;
            for (name, value) in res.headers() {
                writeln!(out, "{name}: {value}")?;
            }
            writeln!(out)?;
            writeln!(out, "{}", res.body_str())?;
        }
    }
    Ok(())
}
