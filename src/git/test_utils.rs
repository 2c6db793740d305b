//! Shared test utilities for the `git` module.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::git::command::{CommandRunner, GitCommand};
use crate::git::error::{GitError, Result};

enum Response {
    Output(String),
    Exit(i32),
}

/// Runner that answers known argument vectors with canned output.
///
/// Any command that was not scripted panics, so tests fail loudly when the
/// engine issues an unexpected query. Every call is recorded in order.
pub(crate) struct ScriptedRunner {
    responses: HashMap<Vec<String>, Response>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    /// Creates a runner with no scripted commands.
    pub(crate) fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Scripts a successful command with the given stdout.
    pub(crate) fn on(mut self, args: &[&str], stdout: &str) -> Self {
        self.responses
            .insert(to_key(args), Response::Output(stdout.to_string()));
        self
    }

    /// Scripts a command that exits with the given non-zero status.
    pub(crate) fn fail(mut self, args: &[&str], exit_code: i32) -> Self {
        self.responses.insert(to_key(args), Response::Exit(exit_code));
        self
    }

    /// Returns every argument vector run so far.
    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

fn to_key(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command: &GitCommand) -> Result<String> {
        let key = command.as_args().to_vec();
        self.calls.borrow_mut().push(key.clone());
        match self.responses.get(&key) {
            Some(Response::Output(stdout)) => Ok(stdout.clone()),
            Some(Response::Exit(exit_code)) => Err(GitError::CommandFailure {
                command: command.to_string(),
                exit_code: *exit_code,
                stderr: String::new(),
            }),
            None => panic!("unexpected git command: {key:?}"),
        }
    }
}
