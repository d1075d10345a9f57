use std::path::PathBuf;

use clap::Parser;

/// Apply a multi-document YAML stream, parents before children
#[derive(Parser, Debug)]
pub struct Apply {
    /// file to apply, or '-' for stdin
    #[clap(short = 'f', long = "filename", required = true)]
    pub file: PathBuf,
    /// abort the batch at the first failing document
    #[clap(long)]
    pub atomic: bool,
}
