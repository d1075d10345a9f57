// Command line argument definitions for the kukeon CLI. Pure clap-derive;
// no business logic lives here.

mod apply;
mod create;
mod delete;
mod get;
mod init;
mod kill;
mod purge;
mod start;
mod stop;

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

pub use {
    apply::Apply, create::Create, delete::Delete, get::Get, init::Init, kill::Kill, purge::Purge,
    start::Start, stop::Stop,
};

/// The entity kind a verb operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Realm,
    Space,
    Stack,
    Cell,
    Container,
}

/// Ancestor selection shared by the imperative verbs.
#[derive(Args, Debug, Default, Clone)]
pub struct ScopeOpts {
    /// Parent realm
    #[clap(long)]
    pub realm: Option<String>,
    /// Parent space
    #[clap(long)]
    pub space: Option<String>,
    /// Parent stack
    #[clap(long)]
    pub stack: Option<String>,
    /// Parent cell
    #[clap(long)]
    pub cell: Option<String>,
}

#[derive(Parser, Debug, Default)]
pub struct GlobalOpts {
    /// change log level to debug
    #[clap(long)]
    pub debug: bool,
    /// write log messages to the file instead of stderr
    #[clap(short, long)]
    pub log: Option<PathBuf>,
    /// set the log format ('text' (default), or 'json')
    #[clap(long)]
    pub log_format: Option<String>,
    /// change the verbosity of logs (error (default), warn, info, debug, trace)
    #[clap(long)]
    pub log_level: Option<String>,
    /// root directory for kukeon metadata and per-space network configs
    #[clap(long)]
    pub run_path: Option<PathBuf>,
    /// address of the containerd socket
    #[clap(long)]
    pub containerd_address: Option<PathBuf>,
    /// ctr binary used to reach the container daemon
    #[clap(long)]
    pub ctr_bin: Option<PathBuf>,
    /// directory holding the CNI plugin binaries
    #[clap(long)]
    pub cni_bin_dir: Option<PathBuf>,
    /// mountpoint of the cgroup v2 filesystem
    #[clap(long)]
    pub cgroup_root: Option<PathBuf>,
}
