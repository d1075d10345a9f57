//! Rendering of entities as tables, YAML or JSON.
use std::fmt::Write as _;
use std::io::{self, Write};
use std::str::FromStr;

use anyhow::{bail, Result};
use tabwriter::TabWriter;

use libkukeon::model::{Cell, ContainerSpec, Entity, Realm, Space, Stack};
use libkukeon::scheme::{self, Version};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Table,
    Yaml,
    Json,
}

impl FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "table" => Ok(Format::Table),
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            other => bail!("unknown output format: {}", other),
        }
    }
}

/// Prints one entity as its external document. Table output is built by
/// the per-kind table functions instead.
pub fn print_document(entity: &Entity, format: Format) -> Result<()> {
    let doc = scheme::to_external(entity, Version::V1Beta1);
    match format {
        Format::Yaml => print!("{}", serde_yaml::to_string(&doc)?),
        Format::Json => println!("{}", serde_json::to_string_pretty(&doc)?),
        Format::Table => bail!("table output must go through a table printer"),
    }
    Ok(())
}

/// Prints a stream of entities as `---`-separated documents.
pub fn print_documents(entities: &[Entity], format: Format) -> Result<()> {
    for (i, entity) in entities.iter().enumerate() {
        if i > 0 && format == Format::Yaml {
            println!("---");
        }
        print_document(entity, format)?;
    }
    Ok(())
}

fn render_table(header: &str, content: &str) -> Result<()> {
    let mut tab_writer = TabWriter::new(io::stdout());
    writeln!(&mut tab_writer, "{header}")?;
    write!(&mut tab_writer, "{content}")?;
    tab_writer.flush()?;
    Ok(())
}

fn display_path(path: &Option<std::path::PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

pub fn realm_table(realms: &[Realm]) -> Result<()> {
    let mut content = String::new();
    for realm in realms {
        let _ = writeln!(
            content,
            "{}\t{}\t{}\t{}",
            realm.name,
            realm.namespace,
            realm.state,
            display_path(&realm.cgroup_path)
        );
    }
    render_table("NAME\tNAMESPACE\tSTATE\tCGROUP", &content)
}

pub fn space_table(spaces: &[Space]) -> Result<()> {
    let mut content = String::new();
    for space in spaces {
        let _ = writeln!(
            content,
            "{}\t{}\t{}\t{}",
            space.name,
            space.realm_name,
            space.state,
            display_path(&space.cni_config_path)
        );
    }
    render_table("NAME\tREALM\tSTATE\tNETWORK-CONFIG", &content)
}

pub fn stack_table(stacks: &[Stack]) -> Result<()> {
    let mut content = String::new();
    for stack in stacks {
        let _ = writeln!(
            content,
            "{}\t{}\t{}\t{}",
            stack.name, stack.space_name, stack.realm_name, stack.state
        );
    }
    render_table("NAME\tSPACE\tREALM\tSTATE", &content)
}

pub fn cell_table(cells: &[Cell]) -> Result<()> {
    let mut content = String::new();
    for cell in cells {
        let _ = writeln!(
            content,
            "{}\t{}\t{}\t{}\t{}\t{}",
            cell.name,
            cell.id,
            cell.stack_name,
            cell.space_name,
            cell.realm_name,
            cell.state
        );
    }
    render_table("NAME\tID\tSTACK\tSPACE\tREALM\tSTATE", &content)
}

pub fn container_table(containers: &[ContainerSpec]) -> Result<()> {
    let mut content = String::new();
    for container in containers {
        let started = container
            .status
            .start_time
            .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
            .unwrap_or_default();
        let _ = writeln!(
            content,
            "{}\t{}\t{}\t{}\t{}\t{}",
            container.id,
            container.cell_id,
            container.image,
            container.status.state,
            container.status.restart_count,
            started
        );
    }
    render_table("ID\tCELL\tIMAGE\tSTATE\tRESTARTS\tSTARTED", &content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!("table".parse::<Format>().unwrap(), Format::Table);
        assert_eq!("yaml".parse::<Format>().unwrap(), Format::Yaml);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert!("csv".parse::<Format>().is_err());
    }

    #[test]
    fn test_print_document_rejects_table() {
        let entity = Entity::Realm(Realm::new("r1"));
        assert!(print_document(&entity, Format::Table).is_err());
    }
}
