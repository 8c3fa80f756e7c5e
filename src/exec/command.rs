// src/exec/command.rs

//! Encoder command-line construction.

use std::fmt;
use std::path::Path;
use std::process::Command;

use crate::config::{ConfigFile, StageConfig};
use crate::dag::StepData;

/// Flags used to tell the encoder about neighbouring tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaplessFlags {
    pub before: String,
    pub after: String,
}

impl GaplessFlags {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            before: cfg.gapless_before_flag.clone(),
            after: cfg.gapless_after_flag.clone(),
        }
    }
}

impl Default for GaplessFlags {
    fn default() -> Self {
        Self {
            before: "--gapless-before".to_string(),
            after: "--gapless-after".to_string(),
        }
    }
}

/// A fully resolved encoder invocation:
///
/// `program <source> [before <prev>] [after <next>] <stage args...> <destination>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeCommand {
    program: String,
    args: Vec<String>,
}

impl EncodeCommand {
    pub fn build(stage: &StageConfig, flags: &GaplessFlags, data: &StepData) -> Self {
        let mut args = vec![data.name.clone()];
        if let Some(previous) = &data.previous {
            args.push(flags.before.clone());
            args.push(previous.clone());
        }
        if let Some(next) = &data.next {
            args.push(flags.after.clone());
            args.push(next.clone());
        }
        args.extend(stage.args.iter().cloned());
        args.push(replace_extension(&data.name, &stage.extension));

        Self {
            program: stage.program.clone(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// File the command writes.
    pub fn destination(&self) -> &str {
        self.args.last().map(String::as_str).unwrap_or_default()
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

/// Shell-like rendering; arguments containing spaces are double-quoted.
impl fmt::Display for EncodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = std::iter::once(&self.program).chain(self.args.iter());
        for (i, part) in parts.enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if part.contains(' ') {
                write!(f, "\"{part}\"")?;
            } else {
                f.write_str(part)?;
            }
        }
        Ok(())
    }
}

/// `name` with its extension replaced by (or extended with) `extension`.
///
/// An empty name stays empty.
pub fn replace_extension(name: &str, extension: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    Path::new(name)
        .with_extension(extension)
        .to_string_lossy()
        .into_owned()
}
