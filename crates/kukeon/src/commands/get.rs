use anyhow::{bail, Result};
use libkukeon::model::Entity;
use libkukeon_cli::{Get, GlobalOpts, KindArg};

use super::{build_controller, require};
use crate::output::{self, Format};

pub fn get(args: Get, global: &GlobalOpts) -> Result<()> {
    let controller = build_controller(global)?;
    let format: Format = args.output.parse()?;

    match args.kind {
        KindArg::Realm => match &args.name {
            Some(name) => {
                let report = controller.get_realm(name)?;
                let Some(realm) = report.realm else {
                    if report.probe.cgroup || report.probe.namespace {
                        bail!(
                            "realm {:?} has no metadata (cgroup present: {}, namespace present: {}); run purge to clean up",
                            name,
                            report.probe.cgroup,
                            report.probe.namespace
                        );
                    }
                    bail!("realm {:?} not found", name);
                };
                match format {
                    Format::Table => output::realm_table(&[realm])?,
                    _ => output::print_document(&Entity::Realm(realm), format)?,
                }
            }
            None => {
                let realms = controller.list_realms()?;
                match format {
                    Format::Table => output::realm_table(&realms)?,
                    _ => output::print_documents(
                        &realms.into_iter().map(Entity::Realm).collect::<Vec<_>>(),
                        format,
                    )?,
                }
            }
        },
        KindArg::Space => {
            let realm = require(&args.scope.realm, "realm")?;
            match &args.name {
                Some(name) => {
                    let report = controller.get_space(&realm, name)?;
                    let Some(space) = report.space else {
                        bail!("space {:?} not found in realm {:?}", name, realm);
                    };
                    match format {
                        Format::Table => output::space_table(&[space])?,
                        _ => output::print_document(&Entity::Space(space), format)?,
                    }
                }
                None => {
                    let spaces = controller.list_spaces(&realm)?;
                    match format {
                        Format::Table => output::space_table(&spaces)?,
                        _ => output::print_documents(
                            &spaces.into_iter().map(Entity::Space).collect::<Vec<_>>(),
                            format,
                        )?,
                    }
                }
            }
        }
        KindArg::Stack => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            match &args.name {
                Some(name) => {
                    let report = controller.get_stack(&realm, &space, name)?;
                    let Some(stack) = report.stack else {
                        bail!("stack {:?} not found in space {:?}", name, space);
                    };
                    match format {
                        Format::Table => output::stack_table(&[stack])?,
                        _ => output::print_document(&Entity::Stack(stack), format)?,
                    }
                }
                None => {
                    let stacks = controller.list_stacks(&realm, &space)?;
                    match format {
                        Format::Table => output::stack_table(&stacks)?,
                        _ => output::print_documents(
                            &stacks.into_iter().map(Entity::Stack).collect::<Vec<_>>(),
                            format,
                        )?,
                    }
                }
            }
        }
        KindArg::Cell => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            let stack = require(&args.scope.stack, "stack")?;
            match &args.name {
                Some(name) => {
                    let report = controller.get_cell(&realm, &space, &stack, name)?;
                    let Some(cell) = report.cell else {
                        bail!("cell {:?} not found in stack {:?}", name, stack);
                    };
                    match format {
                        Format::Table => {
                            output::cell_table(&[cell.clone()])?;
                            if !cell.containers.is_empty() {
                                println!();
                                output::container_table(&cell.containers)?;
                            }
                        }
                        _ => output::print_document(&Entity::Cell(cell), format)?,
                    }
                }
                None => {
                    let cells = controller.list_cells(&realm, &space, &stack)?;
                    match format {
                        Format::Table => output::cell_table(&cells)?,
                        _ => output::print_documents(
                            &cells.into_iter().map(Entity::Cell).collect::<Vec<_>>(),
                            format,
                        )?,
                    }
                }
            }
        }
        KindArg::Container => {
            let realm = require(&args.scope.realm, "realm")?;
            let space = require(&args.scope.space, "space")?;
            let stack = require(&args.scope.stack, "stack")?;
            let cell = require(&args.scope.cell, "cell")?;
            match &args.name {
                Some(name) => {
                    let report =
                        controller.get_container(&realm, &space, &stack, &cell, name)?;
                    let Some(container) = report.container else {
                        bail!("container {:?} not found in cell {:?}", name, cell);
                    };
                    match format {
                        Format::Table => output::container_table(&[container])?,
                        _ => output::print_document(&Entity::Container(container), format)?,
                    }
                }
                None => {
                    let report = controller.get_cell(&realm, &space, &stack, &cell)?;
                    let Some(cell_entity) = report.cell else {
                        bail!("cell {:?} not found in stack {:?}", cell, stack);
                    };
                    match format {
                        Format::Table => output::container_table(&cell_entity.containers)?,
                        _ => output::print_documents(
                            &cell_entity
                                .containers
                                .into_iter()
                                .map(Entity::Container)
                                .collect::<Vec<_>>(),
                            format,
                        )?,
                    }
                }
            }
        }
    }

    Ok(())
}
