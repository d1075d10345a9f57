use anyhow::Result;
use libkukeon::controller::DoOptions;
use libkukeon_cli::{Apply, GlobalOpts};

use super::{build_controller, finish_report, read_input};

pub fn apply(args: Apply, global: &GlobalOpts) -> Result<()> {
    let controller = build_controller(global)?;
    let input = read_input(&args.file)?;
    let report = libkukeon::apply::apply(&controller, &input, &DoOptions::default(), args.atomic)?;
    finish_report(report, "created")
}
