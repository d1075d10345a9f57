use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use nix::sys::signal::Signal;

use libkukeon::apply::ApplyReport;
use libkukeon::cgroup::{CgroupManager, DEFAULT_CGROUP_MOUNT};
use libkukeon::controller::Controller;
use libkukeon::network::{NetworkManager, DEFAULT_CNI_BIN_DIR};
use libkukeon::runtime::{CtrRuntime, DEFAULT_CONTAINERD_SOCKET, DEFAULT_CTR_BIN};
use libkukeon::store::MetaStore;
use libkukeon_cli::GlobalOpts;

pub mod apply;
pub mod completion;
pub mod create;
pub mod delete;
pub mod get;
pub mod init;
pub mod kill;
pub mod purge;
pub mod start;
pub mod stop;
pub mod version;

/// Builds the controller with its four collaborators for this invocation.
pub fn build_controller(global: &GlobalOpts) -> Result<Controller> {
    let run_path = crate::rootpath::determine_run_path(global.run_path.clone())?;

    let cgroups = CgroupManager::new(
        global
            .cgroup_root
            .clone()
            .unwrap_or_else(|| DEFAULT_CGROUP_MOUNT.into()),
    );
    let runtime = CtrRuntime::new(
        global
            .ctr_bin
            .clone()
            .unwrap_or_else(|| DEFAULT_CTR_BIN.into()),
        global
            .containerd_address
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTAINERD_SOCKET.into()),
    );
    let network = NetworkManager::new(
        &run_path,
        global
            .cni_bin_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_CNI_BIN_DIR.into()),
    );

    Ok(Controller::new(
        MetaStore::new(&run_path),
        cgroups,
        Box::new(runtime),
        network,
    ))
}

/// An ancestor flag that must be present for the requested kind.
pub(crate) fn require(opt: &Option<String>, flag: &str) -> Result<String> {
    opt.clone()
        .with_context(|| format!("--{flag} is required"))
}

/// Accepts `TERM`, `SIGTERM` and plain numbers; defaults to SIGKILL.
pub(crate) fn parse_signal(raw: Option<&str>) -> Result<Signal> {
    let raw = match raw {
        None => return Ok(Signal::SIGKILL),
        Some(raw) => raw,
    };
    if let Ok(number) = raw.parse::<i32>() {
        return Signal::try_from(number).with_context(|| format!("invalid signal {number}"));
    }
    let upper = raw.to_uppercase();
    let name = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    Signal::from_str(&name).with_context(|| format!("invalid signal {raw:?}"))
}

/// Reads a `-f` argument, `-` meaning stdin.
pub(crate) fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("failed to read stdin")?;
        return Ok(input);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Prints the per-document status lines of an apply/delete batch and turns
/// an unsuccessful report into a non-zero exit.
pub(crate) fn finish_report(report: ApplyReport, verb: &str) -> Result<()> {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(()) => println!(
                "{}/{} {verb}",
                outcome.kind.to_string().to_lowercase(),
                outcome.name
            ),
            Err(err) => println!(
                "{}/{} failed: {err}",
                outcome.kind.to_string().to_lowercase(),
                outcome.name
            ),
        }
    }
    for invalid in &report.invalid {
        println!("document {} invalid: {}", invalid.index, invalid.message);
    }
    if report.aborted {
        println!("aborted at first failure (--atomic)");
    }

    if report.ok() {
        Ok(())
    } else {
        let failed = report
            .outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .count()
            + report.invalid.len();
        bail!("{failed} document(s) failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_signal_accepts_names_and_numbers() {
        assert_eq!(parse_signal(None).unwrap(), Signal::SIGKILL);
        assert_eq!(parse_signal(Some("TERM")).unwrap(), Signal::SIGTERM);
        assert_eq!(parse_signal(Some("sigterm")).unwrap(), Signal::SIGTERM);
        assert_eq!(parse_signal(Some("9")).unwrap(), Signal::SIGKILL);
        assert!(parse_signal(Some("NOPE")).is_err());
    }
}
