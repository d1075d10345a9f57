use clap::Parser;

use crate::{KindArg, ScopeOpts};

/// Send a signal to the tasks of a cell or a single container
#[derive(Parser, Debug)]
pub struct Kill {
    #[clap(value_enum)]
    pub kind: KindArg,
    pub name: String,
    /// signal to send (default SIGKILL)
    #[clap(short, long)]
    pub signal: Option<String>,
    #[clap(flatten)]
    pub scope: ScopeOpts,
}
