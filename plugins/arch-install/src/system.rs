//! Stage 3: install the base system into the target root and configure it.
use std::collections::BTreeMap;
use std::env;
use std::fs::{self, DirBuilder, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{chown, symlink, DirBuilderExt, PermissionsExt};
use std::path::{Component, Path};

use log::{info, warn};
use serde::Deserialize;
use waypoint_core::{ConfigData, OperationResult, Stage, StageSystemError};

use crate::command::Command;
use crate::context::{remove_if_present, write_file, InstallContext};
use crate::error::InstallError;
use crate::files;
use crate::{build_stage, Action};

pub const STAGE_NAME: &str = "Install and configure the target system";

/// Locale used when the configuration has no `locale` section
pub const DEFAULT_LANG: &str = "en_US.UTF-8";

/// Keys accepted in the `locale` section
pub const LOCALE_VARIABLES: &[&str] = &[
    "LANG",
    "LC_CTYPE",
    "LC_NUMERIC",
    "LC_TIME",
    "LC_COLLATE",
    "LC_MONETARY",
    "LC_MESSAGES",
    "LC_PAPER",
    "LC_NAME",
    "LC_ADDRESS",
    "LC_TELEPHONE",
    "LC_MEASUREMENT",
    "LC_IDENTIFICATION",
];

pub const MIRROR_PROTOCOLS: &[&str] = &["ftp", "http", "https"];

const MIRRORLIST: &str = "/etc/pacman.d/mirrorlist";
const ZONEINFO_DIR: &str = "/usr/share/zoneinfo";
const ISO_AUTHORIZED_KEYS: &str = "/root/.ssh/authorized_keys";
// useradd hands out 1000 to the first regular user
const FIRST_USER_ID: u32 = 1000;

const STEPS: &[(&str, Action)] = &[
    ("Generate pacman mirrorlist", generate_mirrorlist),
    ("Initialize pacman keyring (ISO)", init_pacman_keyring_iso),
    ("Install packages", pacstrap),
    ("Set the timezone", set_timezone),
    ("Sync the hardware clock", sync_hardware_clock),
    ("Configure locale", configure_locale),
    ("Set console settings", set_console),
    ("Set hostname", set_hostname),
    ("Enable DHCP", enable_network_service),
    ("Set root password", set_root_password),
    ("Modify sudo configuration", add_sudo_config),
    ("Create non-root user", create_non_root_user),
    ("Set non-root user's password", set_non_root_user_password),
    ("Initialize pacman keyring (target)", init_pacman_keyring_target),
    ("Install GRUB", install_grub),
    ("Configure mkinitcpio", configure_mkinitcpio),
    ("Regenerate initramfs", regenerate_initramfs),
    ("Harden SSHD", harden_sshd),
    ("Enable SSH server", enable_sshd_service),
    ("Copy SSH authorized keys", copy_ssh_keyfile),
    ("Install paru", install_paru),
];

pub fn stage(ctx: &InstallContext) -> Result<Stage, StageSystemError> {
    build_stage(ctx, STAGE_NAME, STEPS)
}

// --- Configuration sections ---

/// `mirrorlist` section, passed on to reflector
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorlistSettings {
    pub protocols: Option<Vec<String>>,
    pub countries: Option<Vec<String>>,
}

impl MirrorlistSettings {
    pub fn from_config(config: &ConfigData) -> waypoint_core::Result<Self> {
        Ok(config.try_get::<Self>("mirrorlist")?.unwrap_or_default())
    }

    /// Reject empty lists and unknown protocols.
    pub fn validate(&self) -> Result<(), InstallError> {
        if let Some(protocols) = &self.protocols {
            if protocols.is_empty() {
                return Err(InstallError::invalid_config(
                    "mirrorlist",
                    "list of protocols cannot be empty if it is present",
                ));
            }
            if let Some(protocol) = protocols.iter().find(|p| !MIRROR_PROTOCOLS.contains(&p.as_str())) {
                return Err(InstallError::invalid_config(
                    "mirrorlist",
                    format!("unexpected mirrorlist protocol '{}'", protocol),
                ));
            }
        }
        if matches!(&self.countries, Some(countries) if countries.is_empty()) {
            return Err(InstallError::invalid_config(
                "mirrorlist",
                "list of countries cannot be empty if it is present",
            ));
        }
        Ok(())
    }

    /// Arguments for `reflector` writing to `destination`
    pub fn reflector_args(&self, destination: &Path) -> Vec<String> {
        let mut args = vec![
            "--save".to_string(),
            destination.display().to_string(),
            "--sort".to_string(),
            "rate".to_string(),
        ];
        if let Some(protocols) = &self.protocols {
            args.push("--protocol".to_string());
            args.push(protocols.join(","));
        }
        if let Some(countries) = &self.countries {
            args.push("--country".to_string());
            args.push(countries.join(","));
        }
        args
    }
}

/// The `locale` section, or `LANG` = [`DEFAULT_LANG`] when absent.
pub fn locale_settings(config: &ConfigData) -> OperationResult<BTreeMap<String, String>> {
    let Some(locale) = config.try_get::<BTreeMap<String, String>>("locale")? else {
        return Ok(BTreeMap::from([("LANG".to_string(), DEFAULT_LANG.to_string())]));
    };
    if let Some(key) = locale.keys().find(|key| !LOCALE_VARIABLES.contains(&key.as_str())) {
        return Err(InstallError::invalid_config("locale", format!("invalid locale variable '{}'", key)).into());
    }
    if !locale.contains_key("LANG") {
        return Err(InstallError::invalid_config("locale", "a locale section must set 'LANG'").into());
    }
    Ok(locale)
}

/// `console` section
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ConsoleSettings {
    pub keymap: Option<String>,
    pub font: Option<String>,
}

/// `mkinitcpio` section
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MkinitcpioSettings {
    pub hooks: Vec<String>,
}

/// The systemd unit providing DHCP among `packages`, if any
pub fn dhcp_service(packages: &[String]) -> Option<&'static str> {
    if packages.iter().any(|p| p == "networkmanager") {
        Some("NetworkManager")
    } else if packages.iter().any(|p| p == "dhcpcd") {
        Some("dhcpcd")
    } else {
        None
    }
}

// --- Steps ---

pub(crate) fn generate_mirrorlist(ctx: &InstallContext) -> OperationResult {
    let settings = MirrorlistSettings::from_config(&ctx.config)?;
    settings.validate()?;

    info!("Generating mirrorlist (this might take a while)...");
    let mirrorlist = ctx.host_path(MIRRORLIST);
    let reflector = Command::new("reflector")
        .args(settings.reflector_args(&mirrorlist))
        .interactive();
    ctx.run(&reflector)?;
    info!("Mirrorlist was generated.");

    if ctx.confirm("Do you want to edit the created mirrorlist?")? {
        let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());
        ctx.run(&Command::new(editor).arg(mirrorlist.display().to_string()).interactive())?;
    }
    Ok(())
}

pub(crate) fn init_pacman_keyring_iso(ctx: &InstallContext) -> OperationResult {
    info!("Initializing pacman keyring (this might take a while)...");
    ctx.run(&Command::new("pacman-key").arg("--init"))?;
    ctx.run(&Command::new("pacman-key").args(["--populate", "archlinux"]))?;
    info!("Pacman keyring was initialized.");
    Ok(())
}

pub(crate) fn pacstrap(ctx: &InstallContext) -> OperationResult {
    let packages: Vec<String> = ctx.config.require("packages")?;

    info!("Installing packages...");
    let pacstrap = Command::new("pacstrap")
        .arg(ctx.target_root().display().to_string())
        .args(packages)
        .interactive();
    ctx.run(&pacstrap)?;
    info!("Packages were installed.");
    Ok(())
}

pub(crate) fn set_timezone(ctx: &InstallContext) -> OperationResult {
    let timezone: String = ctx.config.require("timezone")?;
    let relative = Path::new(&timezone);
    let zoneinfo = Path::new(ZONEINFO_DIR).join(relative);
    let is_plain = relative.components().all(|c| matches!(c, Component::Normal(_)));
    if !is_plain || !ctx.target_path(&zoneinfo).is_file() {
        return Err(InstallError::invalid_config("timezone", format!("unknown timezone '{}'", timezone)).into());
    }

    info!("Setting the timezone...");
    let localtime = ctx.target_path("etc/localtime");
    remove_if_present(&localtime)?;
    symlink(&zoneinfo, &localtime).map_err(|e| InstallError::io(&localtime, e))?;
    info!("The timezone was set.");
    Ok(())
}

pub(crate) fn sync_hardware_clock(ctx: &InstallContext) -> OperationResult {
    info!("Synchronizing the hardware clock...");
    ctx.run(&ctx.chroot("hwclock").arg("--systohc"))?;
    info!("The hardware clock was synchronized.");
    Ok(())
}

pub(crate) fn configure_locale(ctx: &InstallContext) -> OperationResult {
    let locale = locale_settings(&ctx.config)?;

    info!("Generating locales...");
    let locales: Vec<&str> = locale.values().map(String::as_str).collect();
    let original = ctx.read_target("etc/locale.gen")?;
    ctx.write_target("etc/locale.gen", &files::locale_gen(&original, &locales))?;
    ctx.run(&ctx.chroot("locale-gen").interactive())?;

    let variables = locale.iter().map(|(name, value)| (name.as_str(), value.as_str()));
    ctx.write_target("etc/locale.conf", &files::locale_conf(variables))?;
    info!("The locales were generated.");
    Ok(())
}

pub(crate) fn set_console(ctx: &InstallContext) -> OperationResult {
    let Some(console) = ctx.config.try_get::<ConsoleSettings>("console")? else {
        return Ok(());
    };
    if let Some(contents) = files::vconsole_conf(console.keymap.as_deref(), console.font.as_deref()) {
        info!("Setting console settings...");
        ctx.write_target("etc/vconsole.conf", &contents)?;
        info!("The console settings were set.");
    }
    Ok(())
}

pub(crate) fn set_hostname(ctx: &InstallContext) -> OperationResult {
    let hostname: String = ctx.config.require("hostname")?;
    let domainname: Option<String> = ctx.config.try_get("domainname")?;

    info!("Setting hostname...");
    ctx.write_target("etc/hostname", &files::hostname(&hostname))?;
    ctx.write_target("etc/hosts", &files::hosts(&hostname, domainname.as_deref()))?;
    info!("The hostname was set.");
    Ok(())
}

pub(crate) fn enable_network_service(ctx: &InstallContext) -> OperationResult {
    let packages: Vec<String> = ctx.config.require("packages")?;
    let Some(service) = dhcp_service(&packages) else {
        warn!("No DHCP service seems to be installed on the target system.");
        warn!("Networking may not work properly after rebooting.");
        return Ok(());
    };

    info!("Enabling DHCP service...");
    ctx.run(&ctx.chroot("systemctl").args(["enable", service]))?;
    info!("The DHCP service was enabled.");
    Ok(())
}

pub(crate) fn set_root_password(ctx: &InstallContext) -> OperationResult {
    info!("Setting root password...");
    ctx.run(&ctx.chroot("passwd").arg("root").interactive())?;
    info!("The root password was set.");
    Ok(())
}

pub(crate) fn add_sudo_config(ctx: &InstallContext) -> OperationResult {
    info!("Adding sudo configuration...");
    let path = ctx.write_target("etc/sudoers.d/10-default", files::SUDOERS_DEFAULT)?;
    fs::set_permissions(&path, Permissions::from_mode(0o440))
        .map_err(|e| InstallError::io(&path, e))?;
    info!("The sudo configuration was added.");
    Ok(())
}

pub(crate) fn create_non_root_user(ctx: &InstallContext) -> OperationResult {
    let Some(user) = ctx.config.try_get::<String>("user")? else {
        return Ok(());
    };

    info!("Creating user '{}'...", user);
    let useradd = ctx
        .chroot("useradd")
        .args(["--create-home", "--user-group", "--groups", "wheel"])
        .arg(user.as_str());
    ctx.run(&useradd)?;
    info!("The user '{}' was created.", user);
    Ok(())
}

pub(crate) fn set_non_root_user_password(ctx: &InstallContext) -> OperationResult {
    let Some(user) = ctx.config.try_get::<String>("user")? else {
        return Ok(());
    };

    info!("Setting password for user '{}'...", user);
    ctx.run(&ctx.chroot("passwd").arg(user.as_str()).interactive())?;
    info!("Password for user '{}' was set.", user);
    Ok(())
}

pub(crate) fn init_pacman_keyring_target(ctx: &InstallContext) -> OperationResult {
    info!("Populating pacman keyring (this might take a while)...");
    ctx.run(&ctx.chroot("pacman-key").arg("--init"))?;
    ctx.run(&ctx.chroot("pacman-key").args(["--populate", "archlinux"]))?;
    ctx.run(&ctx.chroot("pacman-key").arg("--refresh-keys"))?;
    info!("Pacman keyring was populated.");
    Ok(())
}

pub(crate) fn install_grub(ctx: &InstallContext) -> OperationResult {
    info!("Installing grub...");
    ctx.run(&ctx.chroot("grub-install").args([
        "--target=x86_64-efi",
        "--efi-directory=/boot",
        "--bootloader-id=GRUB",
        "--recheck",
    ]))?;
    ctx.run(&ctx.chroot("grub-mkconfig").args(["-o", "/boot/grub/grub.cfg"]))?;
    info!("Grub was installed.");
    Ok(())
}

pub(crate) fn configure_mkinitcpio(ctx: &InstallContext) -> OperationResult {
    let settings: MkinitcpioSettings = ctx.config.require("mkinitcpio")?;

    info!("Modifying mkinitcpio configuration...");
    let original = ctx.read_target("etc/mkinitcpio.conf")?;
    ctx.write_target("etc/mkinitcpio.conf", &files::mkinitcpio_conf(&original, &settings.hooks))?;
    info!("Mkinitcpio configuration was modified.");
    Ok(())
}

pub(crate) fn regenerate_initramfs(ctx: &InstallContext) -> OperationResult {
    info!("Rebuilding initial RAM filesystem...");
    ctx.run(&ctx.chroot("mkinitcpio").arg("-P"))?;
    info!("Initial RAM filesystem was rebuilt.");
    Ok(())
}

pub(crate) fn harden_sshd(ctx: &InstallContext) -> OperationResult {
    let user: String = ctx.config.require("user")?;

    info!("Installing hardened SSH daemon configuration...");
    let sshd_config = ctx.target_path("etc/ssh/sshd_config");
    let current = match fs::read_to_string(&sshd_config) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(InstallError::io(&sshd_config, e).into()),
    };
    // A retried step must not include the directory twice
    if !current.contains(files::SSHD_INCLUDE.trim()) {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&sshd_config)
            .map_err(|e| InstallError::io(&sshd_config, e))?;
        file.write_all(files::SSHD_INCLUDE.as_bytes())
            .map_err(|e| InstallError::io(&sshd_config, e))?;
    }
    ctx.write_target("etc/ssh/sshd_config.d/10-hardened.conf", &files::sshd_hardened_conf(&user))?;
    info!("Hardened SSH daemon configuration was installed.");
    Ok(())
}

pub(crate) fn enable_sshd_service(ctx: &InstallContext) -> OperationResult {
    info!("Enabling the SSH server...");
    ctx.run(&ctx.chroot("systemctl").args(["enable", "sshd"]))?;
    info!("SSH server was enabled.");
    Ok(())
}

/// Give the new user the keys that were used to reach the live medium.
pub(crate) fn copy_ssh_keyfile(ctx: &InstallContext) -> OperationResult {
    let user: String = ctx.config.require("user")?;

    let source = ctx.host_path(ISO_AUTHORIZED_KEYS);
    if !source.exists() {
        return Ok(());
    }
    if !source.is_file() {
        return Err(InstallError::NotAFile(source).into());
    }

    info!("Transferring SSH authorized keys...");
    let ssh_dir = ctx.target_path(format!("home/{}/.ssh", user));
    DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(&ssh_dir)
        .map_err(|e| InstallError::io(&ssh_dir, e))?;
    let destination = ssh_dir.join("authorized_keys");
    fs::copy(&source, &destination).map_err(|e| InstallError::io(&destination, e))?;
    fs::set_permissions(&destination, Permissions::from_mode(0o644))
        .map_err(|e| InstallError::io(&destination, e))?;
    for path in [&ssh_dir, &destination] {
        chown(path, Some(FIRST_USER_ID), Some(FIRST_USER_ID))
            .map_err(|e| InstallError::io(path, e))?;
    }
    info!("SSH authorized keys were transferred.");
    Ok(())
}

pub(crate) fn install_paru(ctx: &InstallContext) -> OperationResult {
    if !ctx.config.try_get::<bool>("install_paru")?.unwrap_or(false) {
        return Ok(());
    }
    let user: String = ctx.config.require("user")?;

    info!("Installing paru...");
    ctx.write_target("etc/paru.conf", &files::paru_conf())?;
    let script = format!("/home/{}/install-paru.sh", user);
    let script_path = ctx.target_path(&script);
    write_file(&script_path, &files::paru_install_script(&user))?;

    let install = Command::new("arch-chroot")
        .args(["-u", user.as_str()])
        .arg(ctx.target_root().display().to_string())
        .args(["sh", script.as_str()])
        .interactive();
    ctx.run(&install)?;
    remove_if_present(&script_path)?;
    info!("Paru was installed.");
    Ok(())
}
