// src/exec/encoder.rs

//! The concrete operations run by the two pipeline stages.

use std::process::ExitStatus;
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigFile, StageConfig};
use crate::dag::{Operation, Stages, StepData};
use crate::exec::command::{EncodeCommand, GaplessFlags, replace_extension};

/// What to do when the encoder exits unsuccessfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Terminate the whole process with the encoder's exit code.
    Abort,
    /// Log and carry on; dependents still run.
    Continue,
}

impl FailurePolicy {
    pub fn from_abort_flag(abort_on_failure: bool) -> Self {
        if abort_on_failure {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Continue
        }
    }
}

/// Spawns one encoder process per step and waits for it.
#[derive(Debug, Clone)]
pub struct EncoderOperation {
    stage: StageConfig,
    flags: GaplessFlags,
    policy: FailurePolicy,
}

impl EncoderOperation {
    pub fn new(stage: StageConfig, flags: GaplessFlags, policy: FailurePolicy) -> Self {
        Self {
            stage,
            flags,
            policy,
        }
    }

    pub fn command_for(&self, data: &StepData) -> EncodeCommand {
        EncodeCommand::build(&self.stage, &self.flags, data)
    }

    /// Print the command line to stdout, run it and wait for it to exit.
    pub fn run_command(&self, data: &StepData) -> anyhow::Result<ExitStatus> {
        let command = self.command_for(data);
        println!("{command}");

        let status = command
            .to_command()
            .status()
            .with_context(|| format!("spawning '{}' for '{}'", command.program(), data.name))?;
        Ok(status)
    }
}

impl Operation for EncoderOperation {
    fn execute(&self, data: &StepData) {
        let status = match self.run_command(data) {
            Ok(status) => status,
            Err(err) => {
                // Nothing downstream can succeed without this file.
                error!(name = %data.name, error = ?err, "error spawning encoder process");
                std::process::exit(1);
            }
        };

        if status.success() {
            debug!(name = %data.name, "encoder finished");
            return;
        }

        let code = status.code().unwrap_or(-1);
        match self.policy {
            FailurePolicy::Abort => {
                error!(name = %data.name, exit_code = code, "encoder failed; aborting");
                std::process::exit(if code == 0 { 1 } else { code });
            }
            FailurePolicy::Continue => {
                warn!(name = %data.name, exit_code = code, "encoder failed; continuing");
            }
        }
    }
}

/// Build both pipeline stages from configuration.
pub fn stages_from_config(cfg: &ConfigFile) -> Stages {
    let flags = GaplessFlags::from_config(cfg);
    let policy = FailurePolicy::from_abort_flag(cfg.abort_on_failure);

    let intermediate = EncoderOperation::new(cfg.intermediate.clone(), flags.clone(), policy);
    let output = EncoderOperation::new(cfg.output.clone(), flags, policy);
    let extension = cfg.intermediate.extension.clone();

    info!(
        intermediate = %cfg.intermediate.program,
        output = %cfg.output.program,
        ?policy,
        "configured encoder stages"
    );

    Stages::new(
        Arc::new(intermediate),
        Arc::new(output),
        Arc::new(move |name: &str| replace_extension(name, &extension)),
    )
}
