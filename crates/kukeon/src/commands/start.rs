use anyhow::{bail, Result};
use libkukeon_cli::{GlobalOpts, KindArg, Start};

use super::{build_controller, require};

pub fn start(args: Start, global: &GlobalOpts) -> Result<()> {
    let controller = build_controller(global)?;
    let realm = require(&args.scope.realm, "realm")?;
    let space = require(&args.scope.space, "space")?;
    let stack = require(&args.scope.stack, "stack")?;

    match args.kind {
        KindArg::Cell => {
            controller.start_cell(&realm, &space, &stack, &args.name)?;
            println!("cell/{} started", args.name);
        }
        KindArg::Container => {
            let cell = require(&args.scope.cell, "cell")?;
            controller.start_container(&realm, &space, &stack, &cell, &args.name)?;
            println!("container/{} started", args.name);
        }
        _ => bail!("start applies to cells and containers"),
    }

    Ok(())
}
