use std::collections::BTreeMap;

use anyhow::{bail, Result};
use libkukeon::controller::DoOptions;
use libkukeon::model::{Cell, ContainerSpec, Realm, Space, Stack};
use libkukeon_cli::{Create, GlobalOpts, KindArg};

use super::{build_controller, require};

pub fn create(args: Create, global: &GlobalOpts) -> Result<()> {
    let controller = build_controller(global)?;
    let opts = DoOptions::default();

    match args.kind {
        KindArg::Realm => {
            let mut realm = Realm::new(&args.name);
            if let Some(namespace) = args.namespace {
                realm.namespace = namespace;
            }
            controller.create_realm(realm, &opts)?;
            println!("realm/{} created", args.name);
        }
        KindArg::Space => {
            let realm = require(&args.scope.realm, "realm")?;
            controller.create_space(Space::new(&args.name, &realm), &opts)?;
            println!("space/{} created", args.name);
        }
        KindArg::Stack => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            controller.create_stack(Stack::new(&args.name, &realm, &space), &opts)?;
            println!("stack/{} created", args.name);
        }
        KindArg::Cell => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            let stack = require(&args.scope.stack, "stack")?;
            controller.create_cell(Cell::new(&args.name, &realm, &space, &stack), &opts)?;
            println!("cell/{} created", args.name);
        }
        KindArg::Container => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            let stack = require(&args.scope.stack, "stack")?;
            let cell = require(&args.scope.cell, "cell")?;
            let Some(image) = args.image else {
                bail!("--image is required to create a container");
            };

            let mut env = BTreeMap::new();
            for pair in &args.env {
                let Some((key, value)) = pair.split_once('=') else {
                    bail!("invalid --env {:?}: expected KEY=VALUE", pair);
                };
                env.insert(key.to_owned(), value.to_owned());
            }

            let container = ContainerSpec {
                id: args.name.clone(),
                realm_name: realm,
                space_name: space,
                stack_name: stack,
                cell_id: cell,
                image,
                command: args.command,
                env,
                privileged: args.privileged,
                ..Default::default()
            };
            controller.create_container(container, &opts)?;
            println!("container/{} created", args.name);
        }
    }

    Ok(())
}
