use anyhow::{bail, Result};
use libkukeon_cli::{GlobalOpts, KindArg, Stop};

use super::{build_controller, require};

pub fn stop(args: Stop, global: &GlobalOpts) -> Result<()> {
    let controller = build_controller(global)?;
    let realm = require(&args.scope.realm, "realm")?;
    let space = require(&args.scope.space, "space")?;
    let stack = require(&args.scope.stack, "stack")?;

    match args.kind {
        KindArg::Cell => {
            controller.stop_cell(&realm, &space, &stack, &args.name)?;
            println!("cell/{} stopped", args.name);
        }
        KindArg::Container => {
            let cell = require(&args.scope.cell, "cell")?;
            controller.stop_container(&realm, &space, &stack, &cell, &args.name)?;
            println!("container/{} stopped", args.name);
        }
        _ => bail!("stop applies to cells and containers"),
    }

    Ok(())
}
