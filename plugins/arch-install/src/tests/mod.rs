// Installer test module
use std::collections::{HashMap, VecDeque};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use waypoint_core::ConfigData;

use crate::command::{Command, CommandRunner};
use crate::context::{InstallContext, Prompter};
use crate::error::InstallError;


/// Records commands instead of running them
#[derive(Default)]
pub(super) struct RecordingRunner {
    commands: Mutex<Vec<Command>>,
    outputs: HashMap<String, String>,
    failing: Vec<String>,
}

impl RecordingRunner {
    /// Return `output` for the command whose command line is `command_line`
    pub(super) fn with_output(mut self, command_line: &str, output: &str) -> Self {
        self.outputs.insert(command_line.to_string(), output.to_string());
        self
    }

    /// Make every invocation of `program` exit with status 1
    pub(super) fn failing(mut self, program: &str) -> Self {
        self.failing.push(program.to_string());
        self
    }

    pub(super) fn command_lines(&self) -> Vec<String> {
        self.commands.lock().unwrap().iter().map(ToString::to_string).collect()
    }

    pub(super) fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &Command) -> Result<String, InstallError> {
        self.commands.lock().unwrap().push(command.clone());
        if self.failing.iter().any(|program| program == command.program()) {
            return Err(InstallError::CommandFailed {
                program: command.program().to_string(),
                status: "exit status 1".to_string(),
            });
        }
        Ok(self.outputs.get(&command.to_string()).cloned().unwrap_or_default())
    }
}

/// Answers prompts from a fixed list and remembers the questions
#[derive(Default)]
pub(super) struct ScriptedPrompter {
    answers: Mutex<VecDeque<bool>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub(super) fn answering(answers: &[bool]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().copied().collect()),
            questions: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn yes_or_no(&self, question: &str) -> io::Result<bool> {
        self.questions.lock().unwrap().push(question.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted answer left"))
    }
}

/// Build a config from YAML
pub(super) fn config(yaml: &str) -> ConfigData {
    ConfigData::deserialize(yaml, waypoint_core::storage::ConfigFormat::Yaml)
        .expect("valid test configuration")
}

/// Context rooted in `root` with doubles for every side channel
pub(super) fn context(
    root: &Path,
    yaml: &str,
    runner: &Arc<RecordingRunner>,
    prompter: &Arc<ScriptedPrompter>,
) -> InstallContext {
    InstallContext::new(config(yaml))
        .with_target_root(root.join("mnt"))
        .with_host_root(root.join("host"))
        .with_runner(runner.clone())
        .with_prompter(prompter.clone())
}
