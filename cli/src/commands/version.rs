//! `ratls version` command.

use clap::Args;

#[derive(Args)]
pub struct VersionArgs;

pub fn execute(_args: VersionArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("ratls version {}", ratls_core::VERSION);
    Ok(())
}
