use clap::Parser;

use crate::{KindArg, ScopeOpts};

/// Start the tasks of a cell or a single container
#[derive(Parser, Debug)]
pub struct Start {
    #[clap(value_enum)]
    pub kind: KindArg,
    pub name: String,
    #[clap(flatten)]
    pub scope: ScopeOpts,
}
