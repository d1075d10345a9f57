use clap::Parser;

use crate::{KindArg, ScopeOpts};

/// Show one entity, or list all entities of a kind
#[derive(Parser, Debug)]
pub struct Get {
    #[clap(value_enum)]
    pub kind: KindArg,
    /// entity name; omit to list every entity of the kind in scope
    pub name: Option<String>,
    #[clap(flatten)]
    pub scope: ScopeOpts,
    /// output format ('table' (default), 'yaml' or 'json')
    #[clap(short, long, default_value = "table")]
    pub output: String,
}
