// tests/encoder_command.rs

mod common;
use crate::common::init_tracing;

use clap::Parser;

use stepdag::cli::CliArgs;
use stepdag::config::{ConfigFile, StageConfig};
use stepdag::dag::{Operation, StepData};
use stepdag::exec::{
    EncodeCommand, EncoderOperation, FailurePolicy, GaplessFlags, replace_extension,
    stages_from_config,
};
use stepdag::resolve_workers;

#[test]
fn replace_extension_swaps_or_appends() {
    assert_eq!(replace_extension("track.wav", "caf"), "track.caf");
    assert_eq!(replace_extension("album/01 intro.flac", "caf"), "album/01 intro.caf");
    assert_eq!(replace_extension("noext", "m4a"), "noext.m4a");
    assert_eq!(replace_extension("", "caf"), "");
}

#[test]
fn middle_track_gets_both_gapless_flags() {
    let data = StepData::with_neighbours("b.wav", Some("a.wav".into()), Some("c.wav".into()));
    let cmd = EncodeCommand::build(
        &StageConfig::default_intermediate(),
        &GaplessFlags::default(),
        &data,
    );

    assert_eq!(cmd.program(), "afconvert");
    let args = cmd.args();
    assert_eq!(
        &args[..5],
        &["b.wav", "--gapless-before", "a.wav", "--gapless-after", "c.wav"]
    );
    assert_eq!(args.len(), 5 + 9 + 1);
    assert_eq!(cmd.destination(), "b.caf");
}

#[test]
fn edge_tracks_only_get_the_flag_for_their_existing_neighbour() {
    let first = StepData::with_neighbours("a.caf", None, Some("b.caf".into()));
    let cmd = EncodeCommand::build(&StageConfig::default_output(), &GaplessFlags::default(), &first);

    assert_eq!(&cmd.args()[..3], &["a.caf", "--gapless-after", "b.caf"]);
    assert!(!cmd.args().iter().any(|a| a == "--gapless-before"));
    assert_eq!(cmd.destination(), "a.m4a");
}

#[test]
fn display_quotes_arguments_with_spaces() {
    let stage = StageConfig {
        program: "enc".to_string(),
        args: vec!["-q".to_string(), "1".to_string()],
        extension: "out".to_string(),
    };
    let cmd = EncodeCommand::build(&stage, &GaplessFlags::default(), &StepData::new("My Song.wav"));

    assert_eq!(cmd.to_string(), r#"enc "My Song.wav" -q 1 "My Song.out""#);
}

#[test]
fn custom_gapless_flags_come_from_config() {
    let mut cfg = ConfigFile::default();
    cfg.gapless_before_flag = "--prev".to_string();
    cfg.gapless_after_flag = "--next".to_string();

    let flags = GaplessFlags::from_config(&cfg);
    let data = StepData::with_neighbours("b", Some("a".into()), None);
    let cmd = EncodeCommand::build(&cfg.output, &flags, &data);
    assert_eq!(&cmd.args()[..3], &["b", "--prev", "a"]);
}

#[test]
fn stages_from_config_rename_to_the_intermediate_extension() {
    let cfg = ConfigFile::default();
    let stages = stages_from_config(&cfg);
    assert_eq!((stages.rename)("x/track 1.flac"), "x/track 1.caf");
}

#[cfg(unix)]
#[test]
fn encoder_operation_reports_exit_status() {
    init_tracing();
    let ok = EncoderOperation::new(
        StageConfig {
            program: "true".to_string(),
            args: vec![],
            extension: "out".to_string(),
        },
        GaplessFlags::default(),
        FailurePolicy::Continue,
    );
    let failing = EncoderOperation::new(
        StageConfig {
            program: "false".to_string(),
            args: vec![],
            extension: "out".to_string(),
        },
        GaplessFlags::default(),
        FailurePolicy::Continue,
    );
    let data = StepData::new("input.wav");

    assert!(ok.run_command(&data).unwrap().success());
    assert!(!failing.run_command(&data).unwrap().success());

    // With `Continue` a failing encoder is logged, not fatal.
    failing.execute(&data);
}

#[test]
fn missing_program_is_a_spawn_error() {
    let op = EncoderOperation::new(
        StageConfig {
            program: "stepdag-definitely-not-a-real-program".to_string(),
            args: vec![],
            extension: "out".to_string(),
        },
        GaplessFlags::default(),
        FailurePolicy::Continue,
    );

    let err = op.run_command(&StepData::new("a.wav")).unwrap_err();
    assert!(format!("{err:#}").contains("spawning"));
}

#[test]
fn worker_count_resolution_order() {
    let mut cfg = ConfigFile::default();
    assert!(resolve_workers(None, &cfg) >= 1);

    cfg.workers = 5;
    assert_eq!(resolve_workers(None, &cfg), 5);
    assert_eq!(resolve_workers(Some(2), &cfg), 2);
    assert_eq!(resolve_workers(Some(0), &cfg), 5);
}

#[test]
fn cli_parses_items_and_options() {
    let args = CliArgs::try_parse_from([
        "stepdag",
        "-j",
        "3",
        "--dry-run",
        "--log-level",
        "debug",
        "a.wav",
        "b.wav",
    ])
    .unwrap();

    assert_eq!(args.items, vec!["a.wav", "b.wav"]);
    assert_eq!(args.workers, Some(3));
    assert!(args.dry_run);
    assert!(args.config.is_none());
}

#[test]
fn dry_run_executes_nothing() {
    let args = CliArgs::try_parse_from(["stepdag", "--dry-run", "-j", "2", "a.wav", "b.wav"]).unwrap();
    stepdag::run(args).unwrap();
}

#[test]
fn empty_items_are_rejected() {
    let args = CliArgs::try_parse_from(["stepdag", "--dry-run", "a.wav", ""]).unwrap();
    let err = stepdag::run(args).unwrap_err();
    assert!(err.to_string().contains("item #2 is empty"));
}
