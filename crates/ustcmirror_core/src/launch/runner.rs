use super::{CommandLine, LaunchError, LaunchResult};
use log::debug;
use std::cell::RefCell;
use std::process::Stdio;

/// Executes command lines on behalf of the manager.
pub trait ProcessRunner {
    /// Starts `cmd` with stdio detached and returns without waiting.
    fn spawn_detached(&self, cmd: &CommandLine) -> LaunchResult<()>;
    /// Runs `cmd` to completion; `None` when it was killed by a signal.
    fn run(&self, cmd: &CommandLine) -> LaunchResult<Option<i32>>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

fn spawn_error(cmd: &CommandLine) -> impl FnOnce(std::io::Error) -> LaunchError + '_ {
    move |source| LaunchError::Spawn {
        program: cmd.program.clone(),
        source,
    }
}

impl ProcessRunner for SystemRunner {
    fn spawn_detached(&self, cmd: &CommandLine) -> LaunchResult<()> {
        // Never waited on; init reaps it once this short-lived process exits.
        let child = cmd
            .to_command()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(spawn_error(cmd))?;
        debug!(
            "event=spawn module=launch status=ok pid={} command={}",
            child.id(),
            cmd
        );
        Ok(())
    }

    fn run(&self, cmd: &CommandLine) -> LaunchResult<Option<i32>> {
        let status = cmd.to_command().status().map_err(spawn_error(cmd))?;
        Ok(status.code())
    }
}

/// Records commands instead of running them.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    spawned: RefCell<Vec<CommandLine>>,
    ran: RefCell<Vec<CommandLine>>,
    exit_code: Option<i32>,
}

impl RecordingRunner {
    /// A runner whose `run` reports `exit_code`.
    pub fn with_exit_code(exit_code: i32) -> Self {
        Self {
            exit_code: Some(exit_code),
            ..Self::default()
        }
    }

    pub fn spawned(&self) -> Vec<CommandLine> {
        self.spawned.borrow().clone()
    }

    pub fn ran(&self) -> Vec<CommandLine> {
        self.ran.borrow().clone()
    }
}

impl ProcessRunner for RecordingRunner {
    fn spawn_detached(&self, cmd: &CommandLine) -> LaunchResult<()> {
        self.spawned.borrow_mut().push(cmd.clone());
        Ok(())
    }

    fn run(&self, cmd: &CommandLine) -> LaunchResult<Option<i32>> {
        self.ran.borrow_mut().push(cmd.clone());
        Ok(self.exit_code)
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn spawn_detached(&self, cmd: &CommandLine) -> LaunchResult<()> {
        (**self).spawn_detached(cmd)
    }

    fn run(&self, cmd: &CommandLine) -> LaunchResult<Option<i32>> {
        (**self).run(cmd)
    }
}
