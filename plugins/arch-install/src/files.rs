//! Contents of the configuration files written into the target system.
//!
//! Everything here is a pure function of its inputs so the generated files
//! can be checked without touching a real installation.

/// First line of every file the installer writes from scratch
pub const GENERATED_HEADER: &str = "# Generated by waypoint";

/// Locale that is always generated, whatever the configuration says
pub const FALLBACK_LOCALE_LINE: &str = "en_US.UTF-8 UTF-8";

pub const SUDOERS_DEFAULT: &str = "# Allow members of group wheel to execute any command:\n\
                                   %wheel ALL=(ALL:ALL) ALL\n";

/// Appended to the stock `sshd_config`
pub const SSHD_INCLUDE: &str = "\n# Include custom configuration files\n\
                                Include /etc/ssh/sshd_config.d/*.conf\n";

/// Extract the `UUID` value from one line of `blkid` output.
///
/// `PARTUUID` and friends are ignored.
pub fn parse_blkid_uuid(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .find_map(|field| field.strip_prefix("UUID="))
        .map(|value| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

pub fn fstab(root_uuid: &str, boot_uuid: &str, swap_uuid: &str) -> String {
    format!(
        "{GENERATED_HEADER}\n\
         UUID={root_uuid} / ext4 rw,relatime 0 1\n\
         UUID={boot_uuid} /boot vfat rw,relatime,fmask=0022,dmask=0022,codepage=437,\
         iocharset=ascii,shortname=mixed,utf8,errors=remount-ro 0 2\n\
         UUID={swap_uuid} none swap defaults 0 0\n"
    )
}

pub fn hostname(hostname: &str) -> String {
    format!("{}\n", hostname)
}

pub fn hosts(hostname: &str, domainname: Option<&str>) -> String {
    let local_name = match domainname {
        Some(domain) => format!("{hostname}.{domain} {hostname}"),
        None => hostname.to_string(),
    };
    format!("127.0.0.1\tlocalhost\n::1\t\tlocalhost\n127.0.1.1\t{local_name}\n")
}

/// Rewrite `locale.gen` so that only the wanted locales are enabled.
///
/// Every line of `original` mentioning one of `locales` (case-insensitive)
/// is kept uncommented; all other lines are dropped.
pub fn locale_gen(original: &str, locales: &[&str]) -> String {
    let wanted: Vec<String> = locales.iter().map(|l| l.to_lowercase()).collect();
    let mut lines = vec![FALLBACK_LOCALE_LINE.to_string()];

    for line in original.lines() {
        let lowered = line.to_lowercase();
        if !wanted.iter().any(|locale| lowered.contains(locale.as_str())) {
            continue;
        }
        let enabled = line.strip_prefix('#').unwrap_or(line).to_string();
        if !lines.contains(&enabled) {
            lines.push(enabled);
        }
    }

    let mut contents = format!("{GENERATED_HEADER}\n\n");
    for line in lines {
        contents.push_str(&line);
        contents.push('\n');
    }
    contents
}

pub fn locale_conf<'a>(variables: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut contents = format!("{GENERATED_HEADER}\n\n");
    for (name, value) in variables {
        contents.push_str(&format!("{}={}\n", name, value));
    }
    contents
}

/// `None` when there is nothing to configure.
pub fn vconsole_conf(keymap: Option<&str>, font: Option<&str>) -> Option<String> {
    let mut contents = String::new();
    if let Some(keymap) = keymap {
        contents.push_str(&format!("KEYMAP={}\n", keymap));
    }
    if let Some(font) = font {
        contents.push_str(&format!("FONT={}\n", font));
    }
    (!contents.is_empty()).then_some(contents)
}

/// Replace every `HOOKS=` line of `original`.
pub fn mkinitcpio_conf(original: &str, hooks: &[String]) -> String {
    let hooks_line = format!("HOOKS=({})", hooks.join(" "));
    let mut contents = String::with_capacity(original.len());
    for line in original.lines() {
        if line.starts_with("HOOKS=") {
            contents.push_str(&hooks_line);
        } else {
            contents.push_str(line);
        }
        contents.push('\n');
    }
    contents
}

pub fn sshd_hardened_conf(user: &str) -> String {
    let allow_users = format!("AllowUsers {}", user);
    join_lines(&[
        "##### hardened sshd config #####",
        "#",
        "# source: https://stribika.github.io/2015/01/04/secure-secure-shell.html",
        "#",
        "# use 'ssh-keygen -t ed25519 -o -a 100' or 'ssh-keygen -t rsa -b 4096 -o -a 100' to generate client",
        "# keys",
        "",
        "# port number",
        "Port 22",
        "# IPv4 only",
        "AddressFamily inet",
        "# restrict address to listen on",
        "#ListenAddress 0.0.0.0",
        "",
        "# banner file to show upon login",
        "Banner none",
        "",
        "# disable X11 forwarding",
        "X11Forwarding no",
        "",
        "# restrict to these users",
        &allow_users,
        "PermitRootLogin no",
        "",
        "# restrict to these authentication methods",
        "AuthenticationMethods publickey",
        "PubkeyAuthentication yes",
        "",
        "# maximum number of authentication attempts per connection",
        "MaxAuthTries 6",
        "",
        "# disable all of these authentication methods",
        "PasswordAuthentication no",
        "ChallengeResponseAuthentication no",
        "KbdInteractiveAuthentication no",
        "GSSAPIAuthentication no",
        "HostbasedAuthentication no",
        "KerberosAuthentication no",
        "",
        "# allowed key exchange protocols",
        "KexAlgorithms curve25519-sha256@libssh.org,diffie-hellman-group-exchange-sha256",
        "# allowed connection ciphers",
        "Ciphers chacha20-poly1305@openssh.com,aes256-gcm@openssh.com,aes128-gcm@openssh.com,aes256-ctr,aes192-ctr,aes128-ctr",
        "# allowed host keys",
        "HostKey /etc/ssh/ssh_host_ed25519_key",
        "HostKey /etc/ssh/ssh_host_rsa_key",
        "# allowed message authentication codes",
        "MACs hmac-sha2-512-etm@openssh.com,hmac-sha2-256-etm@openssh.com,umac-128-etm@openssh.com,hmac-sha2-512,hmac-sha2-256,umac-128@openssh.com",
    ])
}

pub fn paru_conf() -> String {
    join_lines(&[
        "# paru configuration file",
        GENERATED_HEADER,
        "# See the paru.conf(5) manpage for options",
        "",
        "#",
        "# GENERAL OPTIONS",
        "#",
        "[options]",
        "PgpFetch",
        "Devel",
        "Provides",
        "DevelSuffixes = -git -cvs -svn -bzr -darcs -always -hg -fossil",
        "RemoveMake",
        "SudoLoop",
        "CleanAfter",
    ])
}

/// Shell script that builds paru from the AUR as `user`.
pub fn paru_install_script(user: &str) -> String {
    let home = format!("/home/{}", user);
    join_lines(&[
        "#!/bin/sh",
        "# paru AUR helper installation script",
        GENERATED_HEADER,
        &format!("sudo -u {user} git clone https://aur.archlinux.org/paru.git {home}/paru"),
        &format!("cd {home}/paru"),
        &format!("sudo -u {user} makepkg -scirf"),
        &format!("cd {home}"),
        &format!("sudo -u {user} rm -rf {home}/paru"),
        &format!("sudo -u {user} paru -Syu"),
        &format!("sudo -u {user} paru -S paru"),
    ])
}

fn join_lines(lines: &[&str]) -> String {
    let mut contents = lines.join("\n");
    contents.push('\n');
    contents
}
