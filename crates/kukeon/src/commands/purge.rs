use anyhow::Result;
use libkukeon::controller::DoOptions;
use libkukeon_cli::{GlobalOpts, KindArg, Purge};

use super::{build_controller, require};

pub fn purge(args: Purge, global: &GlobalOpts) -> Result<()> {
    let controller = build_controller(global)?;
    let opts = DoOptions {
        cascade: true,
        force: true,
        dry_run: false,
    };

    match args.kind {
        KindArg::Realm => {
            controller.purge_realm(&args.name, &opts)?;
            println!("realm/{} purged", args.name);
        }
        KindArg::Space => {
            let realm = require(&args.scope.realm, "realm")?;
            controller.purge_space(&realm, &args.name, &opts)?;
            println!("space/{} purged", args.name);
        }
        KindArg::Stack => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            controller.purge_stack(&realm, &space, &args.name, &opts)?;
            println!("stack/{} purged", args.name);
        }
        KindArg::Cell => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            let stack = require(&args.scope.stack, "stack")?;
            controller.purge_cell(&realm, &space, &stack, &args.name, &opts)?;
            println!("cell/{} purged", args.name);
        }
        KindArg::Container => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            let stack = require(&args.scope.stack, "stack")?;
            let cell = require(&args.scope.cell, "cell")?;
            controller.delete_container(&realm, &space, &stack, &cell, &args.name, &opts)?;
            println!("container/{} purged", args.name);
        }
    }

    Ok(())
}
