use std::path::PathBuf;

use clap::Parser;

use crate::{KindArg, ScopeOpts};

/// Delete an entity, or the documents of a YAML stream in reverse order
#[derive(Parser, Debug)]
pub struct Delete {
    #[clap(value_enum, required_unless_present = "file")]
    pub kind: Option<KindArg>,
    #[clap(required_unless_present = "file")]
    pub name: Option<String>,
    #[clap(flatten)]
    pub scope: ScopeOpts,
    /// file with documents to delete, or '-' for stdin
    #[clap(short = 'f', long = "filename", conflicts_with_all = ["kind", "name"])]
    pub file: Option<PathBuf>,
    /// delete all descendants first instead of refusing
    #[clap(long)]
    pub cascade: bool,
    /// keep going on errors and report them aggregated
    #[clap(long)]
    pub force: bool,
}
