use anyhow::Result;
use clap::Parser;

/// Show version information
#[derive(Parser, Debug)]
pub struct Version {}

pub fn version(_: Version) -> Result<()> {
    println!("kukeon version {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
