//! CLI command definitions and dispatch.

mod inspect;
mod issue;
mod version;

use std::path::Path;

use clap::{Parser, Subcommand};
use ratls_core::IssuerConfig;

/// RA-TLS: attestation-bound TLS certificates.
#[derive(Parser)]
#[command(name = "ratls", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Issue a new key and RA-TLS certificate
    Issue(issue::IssueArgs),
    /// Show the attestation evidence in an RA-TLS certificate as JSON
    Inspect(inspect::InspectArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Resolve the issuer configuration: file (if any), then environment.
pub(crate) fn load_config(path: Option<&Path>) -> Result<IssuerConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => IssuerConfig::load(path)?,
        None => IssuerConfig::default(),
    };
    Ok(config.with_env_overrides())
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Issue(args) => issue::execute(args),
        Command::Inspect(args) => inspect::execute(args),
        Command::Version(args) => version::execute(args),
    }
}
