use std::fmt;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use waypoint_core::utils::prompt::prompt_yes_or_no;
use waypoint_core::ConfigData;

use crate::command::{Command, CommandRunner, SystemRunner};
use crate::error::InstallError;

/// Mount point of the system being installed
pub const DEFAULT_TARGET_ROOT: &str = "/mnt";

/// Questions asked to the person running the installer.
pub trait Prompter: Send + Sync {
    /// Ask until a yes or no answer is given
    fn yes_or_no(&self, question: &str) -> io::Result<bool>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn yes_or_no(&self, question: &str) -> io::Result<bool> {
        let stdin = io::stdin();
        ask(&mut stdin.lock(), &mut io::stdout(), question)
    }
}

/// Everything an installer step needs, shared by all step closures.
#[derive(Clone)]
pub struct InstallContext {
    pub config: Arc<ConfigData>,
    target_root: PathBuf,
    host_root: PathBuf,
    prompter: Arc<dyn Prompter>,
    runner: Arc<dyn CommandRunner>,
}

impl InstallContext {
    /// Context for a real installation into [`DEFAULT_TARGET_ROOT`]
    pub fn new(config: ConfigData) -> Self {
        Self {
            config: Arc::new(config),
            target_root: PathBuf::from(DEFAULT_TARGET_ROOT),
            host_root: PathBuf::from("/"),
            prompter: Arc::new(StdinPrompter),
            runner: Arc::new(SystemRunner),
        }
    }

    pub fn with_target_root(mut self, target_root: impl Into<PathBuf>) -> Self {
        self.target_root = target_root.into();
        self
    }

    /// Root that live-medium paths such as `/etc/resolv.conf` are resolved
    /// against.
    pub fn with_host_root(mut self, host_root: impl Into<PathBuf>) -> Self {
        self.host_root = host_root.into();
        self
    }

    pub fn with_prompter(mut self, prompter: Arc<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn target_root(&self) -> &Path {
        &self.target_root
    }

    /// `path` inside the target system, e.g. `etc/fstab`
    pub fn target_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.target_root.join(strip_root(path.as_ref()))
    }

    /// `path` on the live medium
    pub fn host_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.host_root.join(strip_root(path.as_ref()))
    }

    /// `program` run inside the target system
    pub fn chroot(&self, program: &str) -> Command {
        Command::chroot(&self.target_root, program)
    }

    pub fn run(&self, command: &Command) -> Result<String, InstallError> {
        self.runner.run(command)
    }

    pub fn confirm(&self, question: &str) -> io::Result<bool> {
        self.prompter.yes_or_no(question)
    }

    pub fn read_target(&self, path: &str) -> Result<String, InstallError> {
        let full_path = self.target_path(path);
        fs::read_to_string(&full_path).map_err(|e| InstallError::io(full_path, e))
    }

    /// Replace a file in the target system, creating its directory if needed.
    pub fn write_target(&self, path: &str, contents: &str) -> Result<PathBuf, InstallError> {
        let full_path = self.target_path(path);
        write_file(&full_path, contents)?;
        Ok(full_path)
    }
}

impl fmt::Debug for InstallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallContext")
            .field("config", &self.config)
            .field("target_root", &self.target_root)
            .field("host_root", &self.host_root)
            .finish_non_exhaustive()
    }
}

pub(crate) fn write_file(path: &Path, contents: &str) -> Result<(), InstallError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| InstallError::io(parent, e))?;
    }
    let mut file = fs::File::create(path).map_err(|e| InstallError::io(path, e))?;
    file.write_all(contents.as_bytes()).map_err(|e| InstallError::io(path, e))
}

/// Remove a file or symlink, ignoring one that does not exist.
pub(crate) fn remove_if_present(path: &Path) -> Result<(), InstallError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(InstallError::io(path, e)),
    }
}

fn strip_root(path: &Path) -> &Path {
    path.strip_prefix("/").unwrap_or(path)
}

/// Ask `question` on `output` until `input` yields a yes or no answer.
pub fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<bool> {
    // Never `None` when asking until valid
    Ok(prompt_yes_or_no(input, output, question, true)?.unwrap_or(false))
}
