// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, StageConfig};
use crate::errors::{Result, StepdagError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::StepdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let intermediate = StageConfig::default_intermediate().merged_with(&raw.intermediate);
        let output = StageConfig::default_output().merged_with(&raw.output);

        validate_stage("intermediate", &intermediate)?;
        validate_stage("output", &output)?;
        validate_stage_pair(&intermediate, &output)?;
        validate_encoder(&raw)?;

        Ok(ConfigFile::new_unchecked(
            raw.scheduler,
            intermediate,
            output,
            raw.encoder,
        ))
    }
}

fn validate_stage(section: &str, stage: &StageConfig) -> Result<()> {
    if stage.program.trim().is_empty() {
        return Err(StepdagError::ConfigError(format!(
            "[{section}].program must not be empty"
        )));
    }

    let ext = stage.extension.as_str();
    if ext.is_empty() {
        return Err(StepdagError::ConfigError(format!(
            "[{section}].extension must not be empty"
        )));
    }
    if ext.contains('.') || ext.contains('/') || ext.contains('\\') {
        return Err(StepdagError::ConfigError(format!(
            "[{section}].extension '{ext}' must be a bare extension (no dots or path separators)"
        )));
    }

    Ok(())
}

fn validate_stage_pair(intermediate: &StageConfig, output: &StageConfig) -> Result<()> {
    if intermediate.extension == output.extension {
        return Err(StepdagError::ConfigError(format!(
            "[intermediate] and [output] both use extension '{}'; the output would overwrite its own input",
            output.extension
        )));
    }
    Ok(())
}

fn validate_encoder(cfg: &RawConfigFile) -> Result<()> {
    for (key, flag) in [
        ("gapless_before_flag", &cfg.encoder.gapless_before_flag),
        ("gapless_after_flag", &cfg.encoder.gapless_after_flag),
    ] {
        if flag.trim().is_empty() {
            return Err(StepdagError::ConfigError(format!(
                "[encoder].{key} must not be empty"
            )));
        }
    }
    Ok(())
}
