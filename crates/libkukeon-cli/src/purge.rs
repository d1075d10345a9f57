use clap::Parser;

use crate::{KindArg, ScopeOpts};

/// Cascade-delete an entity and sweep orphans, tolerating missing pieces
#[derive(Parser, Debug)]
pub struct Purge {
    #[clap(value_enum)]
    pub kind: KindArg,
    pub name: String,
    #[clap(flatten)]
    pub scope: ScopeOpts,
}
