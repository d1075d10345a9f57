use anyhow::Result;
use libkukeon::cgroup::{CgroupManager, DEFAULT_CGROUP_MOUNT};
use libkukeon_cli::{GlobalOpts, Init};

pub fn init(_: Init, global: &GlobalOpts) -> Result<()> {
    let run_path = crate::rootpath::determine_run_path(global.run_path.clone())?;
    std::fs::create_dir_all(run_path.join("realms"))?;

    let cgroups = CgroupManager::new(
        global
            .cgroup_root
            .clone()
            .unwrap_or_else(|| DEFAULT_CGROUP_MOUNT.into()),
    );
    let cgroup_root = cgroups.ensure(&[])?;

    println!(
        "initialized run path {} and cgroup root {}",
        run_path.display(),
        cgroup_root.display()
    );
    Ok(())
}
