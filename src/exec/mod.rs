// src/exec/mod.rs

//! Process execution layer.
//!
//! The scheduler only sees [`Operation`](crate::dag::Operation)s; this
//! module provides the concrete ones that run an external encoder.
//!
//! - [`command`] builds encoder command lines and derived file names.
//! - [`encoder`] spawns the encoder, waits for it and applies the failure
//!   policy.

pub mod command;
pub mod encoder;

pub use command::{EncodeCommand, GaplessFlags, replace_extension};
pub use encoder::{EncoderOperation, FailurePolicy, stages_from_config};
