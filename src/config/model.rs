// src/config/model.rs

use serde::Deserialize;

/// Configuration as read from a TOML file, before defaults are resolved.
///
/// ```toml
/// [scheduler]
/// workers = 4
///
/// [intermediate]
/// program = "afconvert"
/// args = ["-d", "LEF32@44100", "-f", "caff"]
/// extension = "caf"
///
/// [output]
/// extension = "m4a"
///
/// [encoder]
/// abort_on_failure = false
/// ```
///
/// Every section and every field is optional. Missing stage fields fall
/// back to the defaults of that stage.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// First stage: source item -> intermediate file.
    #[serde(default)]
    pub intermediate: RawStageConfig,

    /// Second stage: intermediate file -> final output.
    #[serde(default)]
    pub output: RawStageConfig,

    #[serde(default)]
    pub encoder: EncoderSection,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchedulerSection {
    /// Worker thread count. `0` (the default) means one per physical core.
    #[serde(default)]
    pub workers: usize,
}

/// `[intermediate]` / `[output]` section as written in the file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStageConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    /// Extension (without the dot) given to files this stage produces.
    pub extension: Option<String>,
}

/// `[encoder]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EncoderSection {
    #[serde(default = "default_gapless_before_flag")]
    pub gapless_before_flag: String,

    #[serde(default = "default_gapless_after_flag")]
    pub gapless_after_flag: String,

    /// Terminate the whole process when an encoder exits non-zero.
    #[serde(default = "default_abort_on_failure")]
    pub abort_on_failure: bool,
}

fn default_gapless_before_flag() -> String {
    "--gapless-before".to_string()
}

fn default_gapless_after_flag() -> String {
    "--gapless-after".to_string()
}

fn default_abort_on_failure() -> bool {
    true
}

impl Default for EncoderSection {
    fn default() -> Self {
        Self {
            gapless_before_flag: default_gapless_before_flag(),
            gapless_after_flag: default_gapless_after_flag(),
            abort_on_failure: default_abort_on_failure(),
        }
    }
}

/// Fully resolved stage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageConfig {
    pub program: String,
    pub args: Vec<String>,
    pub extension: String,
}

const DEFAULT_PROGRAM: &str = "afconvert";

const INTERMEDIATE_ARGS: &[&str] = &[
    "-d",
    "LEF32@44100",
    "-f",
    "caff",
    "--soundcheck-generate",
    "--src-complexity",
    "bats",
    "-r",
    "127",
];

const OUTPUT_ARGS: &[&str] = &[
    "-d",
    "aac",
    "-f",
    "m4af",
    "-u",
    "pgcm",
    "2",
    "--soundcheck-read",
    "-b",
    "256000",
    "-q",
    "127",
    "-s",
    "2",
];

impl StageConfig {
    /// Decode to 32-bit float CAF at 44.1 kHz and generate sound check data.
    pub fn default_intermediate() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: INTERMEDIATE_ARGS.iter().map(|s| s.to_string()).collect(),
            extension: "caf".to_string(),
        }
    }

    /// Encode the intermediate to 256 kbps AAC in an M4A container.
    pub fn default_output() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: OUTPUT_ARGS.iter().map(|s| s.to_string()).collect(),
            extension: "m4a".to_string(),
        }
    }

    /// Fill the gaps in `raw` from `self`.
    pub fn merged_with(self, raw: &RawStageConfig) -> Self {
        Self {
            program: raw.program.clone().unwrap_or(self.program),
            args: raw.args.clone().unwrap_or(self.args),
            extension: raw.extension.clone().unwrap_or(self.extension),
        }
    }
}

/// Validated configuration.
///
/// Construct via `ConfigFile::try_from(RawConfigFile)` (see
/// [`validate`](crate::config::validate)) or [`ConfigFile::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub workers: usize,
    pub intermediate: StageConfig,
    pub output: StageConfig,
    pub gapless_before_flag: String,
    pub gapless_after_flag: String,
    pub abort_on_failure: bool,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        intermediate: StageConfig,
        output: StageConfig,
        encoder: EncoderSection,
    ) -> Self {
        Self {
            workers: scheduler.workers,
            intermediate,
            output,
            gapless_before_flag: encoder.gapless_before_flag,
            gapless_after_flag: encoder.gapless_after_flag,
            abort_on_failure: encoder.abort_on_failure,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(
            SchedulerSection::default(),
            StageConfig::default_intermediate(),
            StageConfig::default_output(),
            EncoderSection::default(),
        )
    }
}
