//! Stage 2: partition, format and mount the target drive.
//!
//! With `auto_partition: true` the whole of [`DISK`] is wiped and laid out
//! as an EFI partition plus an LVM volume group holding swap and root.
//! Otherwise every step only asks whether the user has done the equivalent
//! work by hand.
use std::fs;

use log::{info, warn};
use waypoint_core::{OperationResult, Stage, StageSystemError};

use crate::command::Command;
use crate::context::InstallContext;
use crate::error::InstallError;
use crate::files;
use crate::{build_stage, Action};

pub const STAGE_NAME: &str = "Partitioning and filesystem creation";

pub const DISK: &str = "/dev/sda";
const BOOT_PARTITION: &str = "/dev/sda1";
const LVM_PARTITION: &str = "/dev/sda2";
const VOLUME_GROUP: &str = "vg0";
const ROOT_VOLUME: &str = "/dev/vg0/root";
const SWAP_VOLUME: &str = "/dev/vg0/swap";

const STEPS: &[(&str, Action)] = &[
    ("Confirm partitioning method", confirm_partitioning_method),
    ("Create partitions", create_partitions),
    ("Create filesystems", create_filesystems),
    ("Mount filesystems", mount_filesystems),
    ("Generate filesystem table", generate_fstab),
];

pub fn stage(ctx: &InstallContext) -> Result<Stage, StageSystemError> {
    build_stage(ctx, STAGE_NAME, STEPS)
}

/// `auto_partition` from the configuration, `false` when absent
pub fn auto_partitioning_enabled(ctx: &InstallContext) -> waypoint_core::Result<bool> {
    Ok(ctx.config.try_get::<bool>("auto_partition")?.unwrap_or(false))
}

/// Succeed only if the user answers yes to `question`.
fn require_yes(ctx: &InstallContext, question: &str, refusal: &str) -> OperationResult {
    if ctx.confirm(question)? {
        Ok(())
    } else {
        Err(InstallError::Declined(refusal.to_string()).into())
    }
}

pub(crate) fn confirm_partitioning_method(ctx: &InstallContext) -> OperationResult {
    if auto_partitioning_enabled(ctx)? {
        warn!("You have enabled auto-partitioning in your configuration.");
        warn!("Auto-partitioning will irrevocably erase all data on '{}'!", DISK);
        return require_yes(
            ctx,
            "Are you sure you want to continue?",
            "Please adjust your configuration if you want to disable auto-partitioning.",
        );
    }

    info!("You have disabled auto-partitioning in your configuration.");
    info!("Before continuing, you must partition and format your drives yourself.");
    info!(
        "Mount the root partition at '{}' and all other partitions at their \
         appropriate mount point below it.",
        ctx.target_root().display()
    );
    info!("Create an fstab-file at '{}' appropriately.", ctx.target_path("etc/fstab").display());
    info!("Don't forget to also create a crypttab-file if necessary.");
    if ctx.confirm("Are your drives partitioned, formatted and mounted?")? {
        return Ok(());
    }
    Err(InstallError::ManualPartitioning.into())
}

pub(crate) fn create_partitions(ctx: &InstallContext) -> OperationResult {
    if !auto_partitioning_enabled(ctx)? {
        return require_yes(
            ctx,
            "Did you create your partitions?",
            "Please create your partitions before continuing.",
        );
    }

    info!("Creating partitions...");
    let parted = Command::new("parted").args([
        "--script", "--align", "optimal", DISK, "--",
        "mklabel", "gpt",
        "mkpart", "EFI", "fat32", "1MiB", "513MiB",
        "mkpart", "LVM", "513MiB", "-1",
        "set", "1", "esp", "on",
        "set", "2", "lvm", "on",
    ]);
    ctx.run(&parted)?;
    info!("Partitions were created.");
    Ok(())
}

pub(crate) fn create_filesystems(ctx: &InstallContext) -> OperationResult {
    if !auto_partitioning_enabled(ctx)? {
        return require_yes(
            ctx,
            "Did you format your partitions?",
            "Please format your partitions before continuing.",
        );
    }

    info!("Creating filesystems...");
    let commands = [
        Command::new("mkfs.fat").args(["-F", "32", "-n", "BOOT", BOOT_PARTITION]),
        Command::new("pvcreate").arg(LVM_PARTITION),
        Command::new("vgcreate").args([VOLUME_GROUP, LVM_PARTITION, "--yes"]),
        Command::new("lvcreate").args(["--yes", "-L", "1G", VOLUME_GROUP, "-n", "swap"]),
        Command::new("lvcreate").args(["--yes", "-l", "100%FREE", VOLUME_GROUP, "-n", "root"]),
        Command::new("mkswap").args(["-L", "SWAP", SWAP_VOLUME]),
        Command::new("mkfs.ext4").args(["-L", "ROOT", ROOT_VOLUME]),
    ];
    for command in &commands {
        ctx.run(command)?;
    }
    info!("Filesystems were created.");
    Ok(())
}

pub(crate) fn mount_filesystems(ctx: &InstallContext) -> OperationResult {
    if !auto_partitioning_enabled(ctx)? {
        return require_yes(
            ctx,
            "Did you mount your partitions?",
            "Please mount your partitions before continuing.",
        );
    }

    info!("Mounting filesystems...");
    let root = ctx.target_root().display().to_string();
    ctx.run(&Command::new("mount").args([ROOT_VOLUME, root.as_str()]))?;

    let boot = ctx.target_path("boot");
    fs::create_dir_all(&boot).map_err(|e| InstallError::io(&boot, e))?;
    ctx.run(&Command::new("mount").arg(BOOT_PARTITION).arg(boot.display().to_string()))?;
    ctx.run(&Command::new("swapon").arg(SWAP_VOLUME))?;
    info!("Filesystems were mounted.");
    Ok(())
}

pub(crate) fn generate_fstab(ctx: &InstallContext) -> OperationResult {
    if !auto_partitioning_enabled(ctx)? {
        return require_yes(
            ctx,
            "Did you create an fstab-file?",
            "Please create an fstab-file before continuing.",
        );
    }

    info!("Generating filesystem table...");
    let boot_uuid = filesystem_uuid(ctx, BOOT_PARTITION)?;
    let root_uuid = filesystem_uuid(ctx, ROOT_VOLUME)?;
    let swap_uuid = filesystem_uuid(ctx, SWAP_VOLUME)?;
    ctx.write_target("etc/fstab", &files::fstab(&root_uuid, &boot_uuid, &swap_uuid))?;
    info!("Filesystem table was generated.");
    Ok(())
}

fn filesystem_uuid(ctx: &InstallContext, device: &str) -> Result<String, InstallError> {
    let output = ctx.run(&Command::new("blkid").arg(device).captured())?;
    files::parse_blkid_uuid(&output).ok_or_else(|| InstallError::UnexpectedOutput {
        program: "blkid".to_string(),
        output: output.trim().to_string(),
    })
}
