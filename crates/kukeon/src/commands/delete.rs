use anyhow::{bail, Result};
use libkukeon::controller::DoOptions;
use libkukeon_cli::{Delete, GlobalOpts, KindArg};

use super::{build_controller, finish_report, read_input, require};

pub fn delete(args: Delete, global: &GlobalOpts) -> Result<()> {
    let controller = build_controller(global)?;
    let opts = DoOptions {
        cascade: args.cascade,
        force: args.force,
        dry_run: false,
    };

    if let Some(file) = &args.file {
        let input = read_input(file)?;
        let report = libkukeon::apply::delete(&controller, &input, &opts)?;
        return finish_report(report, "deleted");
    }

    let (Some(kind), Some(name)) = (args.kind, args.name.as_deref()) else {
        bail!("a kind and a name, or -f <file>, are required");
    };

    match kind {
        KindArg::Realm => {
            controller.delete_realm(name, &opts)?;
            println!("realm/{name} deleted");
        }
        KindArg::Space => {
            let realm = require(&args.scope.realm, "realm")?;
            controller.delete_space(&realm, name, &opts)?;
            println!("space/{name} deleted");
        }
        KindArg::Stack => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            controller.delete_stack(&realm, &space, name, &opts)?;
            println!("stack/{name} deleted");
        }
        KindArg::Cell => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            let stack = require(&args.scope.stack, "stack")?;
            controller.delete_cell(&realm, &space, &stack, name, &opts)?;
            println!("cell/{name} deleted");
        }
        KindArg::Container => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            let stack = require(&args.scope.stack, "stack")?;
            let cell = require(&args.scope.cell, "cell")?;
            controller.delete_container(&realm, &space, &stack, &cell, name, &opts)?;
            println!("container/{name} deleted");
        }
    }

    Ok(())
}
