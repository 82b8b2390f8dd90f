//! Stage 1: check and prepare the live medium.
use std::os::unix::fs::symlink;

use log::info;
use waypoint_core::{OperationResult, Stage, StageSystemError};

use crate::command::Command;
use crate::context::{remove_if_present, InstallContext};
use crate::error::InstallError;
use crate::{build_stage, Action};

pub const STAGE_NAME: &str = "Initialize the installation environment";

const EFIVARS_DIR: &str = "/sys/firmware/efi/efivars";
const RESOLV_CONF: &str = "/etc/resolv.conf";
const RESOLVED_STUB: &str = "/run/systemd/resolve/resolv.conf";

const STEPS: &[(&str, Action)] = &[
    ("Verify UEFI boot mode", verify_boot_mode),
    ("Verify internet connectivity", verify_internet_connectivity),
    ("Link DNS configuration", link_dns_configuration),
    ("Enable NTP synchronization", enable_ntp_sync),
];

pub fn stage(ctx: &InstallContext) -> Result<Stage, StageSystemError> {
    build_stage(ctx, STAGE_NAME, STEPS)
}

pub(crate) fn verify_boot_mode(ctx: &InstallContext) -> OperationResult {
    info!("Verifying boot mode...");
    if !ctx.host_path(EFIVARS_DIR).is_dir() {
        return Err(InstallError::NotUefi.into());
    }
    info!("Live medium is booted in UEFI mode.");
    Ok(())
}

pub(crate) fn verify_internet_connectivity(ctx: &InstallContext) -> OperationResult {
    info!("Verifying internet connectivity...");
    let ping = Command::new("ping").args(["-W", "10", "-c", "3", "archlinux.org"]);
    ctx.run(&ping).map_err(|_| InstallError::NoInternet)?;
    info!("System has internet connectivity.");
    Ok(())
}

/// Point `/etc/resolv.conf` at systemd-resolved so DNS works inside the chroot.
pub(crate) fn link_dns_configuration(ctx: &InstallContext) -> OperationResult {
    info!("Linking DNS configuration...");
    let resolv_conf = ctx.host_path(RESOLV_CONF);
    remove_if_present(&resolv_conf)?;
    symlink(RESOLVED_STUB, &resolv_conf).map_err(|e| InstallError::io(&resolv_conf, e))?;
    info!("DNS configuration was linked.");
    Ok(())
}

pub(crate) fn enable_ntp_sync(ctx: &InstallContext) -> OperationResult {
    info!("Enabling system clock synchronization...");
    ctx.run(&Command::new("timedatectl").args(["set-ntp", "true"]))?;
    Ok(())
}
