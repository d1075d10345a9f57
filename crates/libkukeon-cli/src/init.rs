use clap::Parser;

/// Prepare the run-path skeleton and the kukeon cgroup root
#[derive(Parser, Debug)]
pub struct Init {}
