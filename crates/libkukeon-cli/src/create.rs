use clap::Parser;

use crate::{KindArg, ScopeOpts};

/// Create an entity and its backing resources
#[derive(Parser, Debug)]
pub struct Create {
    #[clap(value_enum)]
    pub kind: KindArg,
    pub name: String,
    #[clap(flatten)]
    pub scope: ScopeOpts,
    /// daemon namespace owned by the realm (defaults to the realm name)
    #[clap(long)]
    pub namespace: Option<String>,
    /// image of the container (kind container)
    #[clap(long)]
    pub image: Option<String>,
    /// environment variables, KEY=VALUE (kind container)
    #[clap(long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
    /// run the container privileged (kind container)
    #[clap(long)]
    pub privileged: bool,
    /// command and arguments run in the container (kind container)
    #[clap(last = true)]
    pub command: Vec<String>,
}
