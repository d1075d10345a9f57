use clap::Parser;

use crate::{KindArg, ScopeOpts};

/// Gracefully stop the tasks of a cell or a single container
#[derive(Parser, Debug)]
pub struct Stop {
    #[clap(value_enum)]
    pub kind: KindArg,
    pub name: String,
    #[clap(flatten)]
    pub scope: ScopeOpts,
}
