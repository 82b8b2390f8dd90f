use std::fmt;
use std::path::Path;
use std::process::{self, ExitStatus, Stdio};

use log::debug;

use crate::error::InstallError;

/// Where a command's standard streams go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Output {
    /// Discard everything, no input
    #[default]
    Quiet,
    /// Share the installer's terminal; used for progress output and passwords
    Interactive,
    /// Collect stdout and hand it back to the caller
    Captured,
}

/// An external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    program: String,
    args: Vec<String>,
    output: Output,
}

impl Command {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            output: Output::default(),
        }
    }

    /// `arch-chroot <root> <program>`
    pub fn chroot(root: &Path, program: impl Into<String>) -> Self {
        Self::new("arch-chroot")
            .arg(root.display().to_string())
            .arg(program)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn interactive(mut self) -> Self {
        self.output = Output::Interactive;
        self
    }

    pub fn captured(mut self) -> Self {
        self.output = Output::Captured;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn output(&self) -> Output {
        self.output
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Executes [`Command`]s. Returns captured stdout (empty unless the command
/// was [`captured`](Command::captured)).
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &Command) -> Result<String, InstallError>;
}

/// Runs commands as child processes of the installer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &Command) -> Result<String, InstallError> {
        debug!("Running '{}'", command);

        let mut process = process::Command::new(&command.program);
        process.args(&command.args);
        match command.output {
            Output::Quiet => {
                process.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
            }
            Output::Interactive => {
                process.stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            Output::Captured => {
                process.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }

        let output = process.output().map_err(|source| InstallError::CommandNotStarted {
            program: command.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(InstallError::CommandFailed {
                program: command.program.clone(),
                status: describe_status(output.status),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}
