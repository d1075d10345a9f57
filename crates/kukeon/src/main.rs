//! # Kukeon
//! A command-line orchestrator for nested workloads on a single Linux
//! host. Partitions the host into Realm → Space → Stack → Cell →
//! Container, each level backed by a daemon namespace, a cgroup v2
//! subtree, a CNI network or an OCI container.
mod commands;
mod observability;
mod output;
mod rootpath;

use anyhow::Result;
use clap::CommandFactory;
use clap::{crate_version, Parser};

use libkukeon_cli::GlobalOpts;

#[derive(Parser, Debug)]
#[clap(version = crate_version!(), author = env!("CARGO_PKG_AUTHORS"))]
struct Opts {
    #[clap(flatten)]
    global: GlobalOpts,

    #[clap(subcommand)]
    subcmd: SubCommand,
}

#[derive(Parser, Debug)]
enum SubCommand {
    Init(libkukeon_cli::Init),
    Create(libkukeon_cli::Create),
    Get(libkukeon_cli::Get),
    Apply(libkukeon_cli::Apply),
    Delete(libkukeon_cli::Delete),
    Start(libkukeon_cli::Start),
    Stop(libkukeon_cli::Stop),
    Kill(libkukeon_cli::Kill),
    Purge(libkukeon_cli::Purge),

    // Kukeon specific extensions
    Version(commands::version::Version),
    Completion(commands::completion::Completion),
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let mut app = Opts::command();

    if let Err(e) = observability::init(&opts.global) {
        eprintln!("log init failed: {:?}", e);
    }

    tracing::debug!(
        "started by user {} with {:?}",
        nix::unistd::geteuid(),
        std::env::args_os()
    );

    let Opts { global, subcmd } = opts;
    match subcmd {
        SubCommand::Init(init) => commands::init::init(init, &global),
        SubCommand::Create(create) => commands::create::create(create, &global),
        SubCommand::Get(get) => commands::get::get(get, &global),
        SubCommand::Apply(apply) => commands::apply::apply(apply, &global),
        SubCommand::Delete(delete) => commands::delete::delete(delete, &global),
        SubCommand::Start(start) => commands::start::start(start, &global),
        SubCommand::Stop(stop) => commands::stop::stop(stop, &global),
        SubCommand::Kill(kill) => commands::kill::kill(kill, &global),
        SubCommand::Purge(purge) => commands::purge::purge(purge, &global),
        SubCommand::Version(version) => commands::version::version(version),
        SubCommand::Completion(completion) => {
            commands::completion::completion(completion, &mut app)
        }
    }
}
