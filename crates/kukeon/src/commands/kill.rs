use anyhow::{bail, Result};
use libkukeon_cli::{GlobalOpts, Kill, KindArg};

use super::{build_controller, parse_signal, require};

pub fn kill(args: Kill, global: &GlobalOpts) -> Result<()> {
    let controller = build_controller(global)?;
    let realm = require(&args.scope.realm, "realm")?;
    let space = require(&args.scope.space, "space")?;
    let stack = require(&args.scope.stack, "stack")?;
    let signal = parse_signal(args.signal.as_deref())?;

    match args.kind {
        KindArg::Cell => {
            controller.kill_cell(&realm, &space, &stack, &args.name, signal)?;
            println!("cell/{} killed", args.name);
        }
        KindArg::Container => {
            let cell = require(&args.scope.cell, "cell")?;
            controller.kill_container(&realm, &space, &stack, &cell, &args.name, signal)?;
            println!("container/{} killed", args.name);
        }
        _ => bail!("kill applies to cells and containers"),
    }

    Ok(())
}
