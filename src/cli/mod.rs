//! # CLI Module
//!
//! Command-line front end for poking at a dispatch core without a network
//! transport.
//!
//! ## Overview
//!
//! The binary builds a small demo application (see [`DemoProvider`]) and
//! either lists its routes or pushes one simulated request through the full
//! route-match, middleware and handler pipeline.
//!
//! ## Commands
//!
//! ### `routes`
//!
//! Print the route table in registration order:
//!
//! ```bash
//! switchyard routes
//! ```
//!
//! ### `dispatch`
//!
//! Run one request and print the status line, headers and body:
//!
//! ```bash
//! switchyard dispatch GET /greet/Ann
//! switchyard dispatch GET /api/users/1 -H "authorization: Bearer demo-token"
//! switchyard dispatch POST /echo --body '{"ping":true}'
//! ```
//!
//! Global options:
//! - `--config <FILE>` - YAML configuration (`SWITCHYARD_CONFIG`)
//! - `--debug` - include underlying error messages in 500 responses
//!
//! ## Usage from Code
//!
//! ```rust
//! use switchyard::cli::{execute, Cli};
//! use clap::Parser;
//!
//! let cli = Cli::try_parse_from(["switchyard", "dispatch", "GET", "/greet/Ann"]).unwrap();
//! let mut out = Vec::new();
//! execute(&cli.command, cli.app_config().unwrap(), &mut out).unwrap();
//! assert!(String::from_utf8(out).unwrap().starts_with("HTTP 200 OK"));
//! ```

mod commands;
mod demo;


pub use self::commands::{execute, parse_header, run_cli, Cli, Commands};
pub use self::demo::{demo_app, DemoProvider, User, UserController, UserDirectory, DEMO_TOKEN};
