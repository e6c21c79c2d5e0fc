//! Integration tests for the worker setup pipeline.
//!
//! Every test drives the real pipeline over a [`RecordingExecutor`], so the
//! exact mount sequence is observable without privileges while directory
//! creation still happens inside a temporary image directory.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use strata_common::config::StrataConfig;
use strata_common::error::StrataError;
use strata_common::types::{SetupState, SetupStep};
use strata_core::mount::MountOp;
use strata_core::mount::recording::RecordingExecutor;
use strata_runtime::context::ContainerSetupContext;
use strata_runtime::pipeline::Pipeline;

const BASE_LAYER: &str = "aaaa";
const APP_LAYER: &str = "bbbb";

struct Image {
    _dir: tempfile::TempDir,
    config: StrataConfig,
}

impl Image {
    fn layer_dir(&self, hex: &str) -> PathBuf {
        self.config.layer_root.join(hex)
    }

    fn merged(&self) -> PathBuf {
        self.config.base_dir.join("merged")
    }
}

fn image_with(env: &[&str], layers: &[&str]) -> Image {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StrataConfig::from_image_dir(dir.path());

    let env_json = serde_json::json!({ "config": { "Env": env } });
    std::fs::write(&config.config_path, env_json.to_string()).expect("write config");

    let descriptors: Vec<_> = layers
        .iter()
        .map(|hex| {
            serde_json::json!({
                "Digest": format!("sha256:{hex}"),
                "MediaType": "application/vnd.oci.image.layer.v1.tar",
                "Size": 1,
            })
        })
        .collect();
    let manifest_json = serde_json::json!({ "Layers": descriptors });
    std::fs::write(&config.manifest_path, manifest_json.to_string()).expect("write manifest");

    for hex in layers {
        std::fs::create_dir_all(config.layer_root.join(hex)).expect("layer dir");
    }
    std::fs::create_dir_all(&config.volume_dir).expect("volume dir");

    Image { _dir: dir, config }
}

fn default_image() -> Image {
    image_with(&["PATH=/usr/bin:/bin", "STRATA_TEST_OPTS=a=b"], &[BASE_LAYER, APP_LAYER])
}

fn prepare(
    config: &StrataConfig,
    executor: RecordingExecutor,
) -> (Pipeline<RecordingExecutor>, ContainerSetupContext, Result<(), StrataError>) {
    let mut pipeline = Pipeline::new(config.clone(), executor);
    let mut ctx = pipeline.context();
    let outcome = pipeline.prepare(&mut ctx);
    (pipeline, ctx, outcome)
}

fn show(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn full_setup_issues_commands_in_order() {
    let image = default_image();
    let (pipeline, ctx, outcome) = prepare(&image.config, RecordingExecutor::new());
    outcome.expect("setup should succeed");

    let base = show(&image.config.base_dir);
    let merged = show(&image.merged());
    let expected = vec![
        "mount --make-rprivate /".to_owned(),
        format!("mount -t tmpfs tmpfs {base}"),
        format!(
            "mount -t overlay overlay -o lowerdir={}:{},upperdir={base}/upper,workdir={base}/work {merged}",
            show(&image.layer_dir(APP_LAYER)),
            show(&image.layer_dir(BASE_LAYER)),
        ),
        format!("mount -t proc none {merged}/proc"),
        format!("mount -t sysfs none {merged}/sys"),
        format!("mount -t devtmpfs devtmpfs {merged}/dev"),
        format!("mount -t devpts devpts {merged}/dev/pts"),
        format!("mount -t tmpfs shm {merged}/dev/shm"),
        format!("mount -t tmpfs tmpfs {merged}/run"),
        format!("mount -t tmpfs tmpfs {merged}/tmp"),
        format!("mount --bind {} {merged}/volume", show(&image.config.volume_dir)),
        format!("cd {merged}"),
        "pivot_root . .".to_owned(),
        "umount -l .".to_owned(),
    ];
    assert_eq!(pipeline.executor().commands(), expected);
    assert_eq!(ctx.state(), &SetupState::RootSwitched);
}

#[test]
fn setup_creates_overlay_and_mount_point_directories() {
    let image = default_image();
    let (_, ctx, outcome) = prepare(&image.config, RecordingExecutor::new());
    outcome.expect("setup should succeed");

    let merged = image.merged();
    for dir in ["proc", "sys", "dev", "run", "tmp", "volume"] {
        assert!(merged.join(dir).is_dir(), "{dir} should exist");
    }
    assert!(image.config.base_dir.join("upper").is_dir());
    assert!(image.config.base_dir.join("work").is_dir());
    assert!(!merged.join("dev/pts").exists(), "dev mount points are never created");

    let overlay = ctx.overlay.expect("overlay recorded");
    assert_eq!(
        overlay.lower_dirs,
        vec![image.layer_dir(APP_LAYER), image.layer_dir(BASE_LAYER)]
    );
}

#[test]
fn environment_is_applied_to_context_only() {
    let image = default_image();
    let (_, ctx, outcome) = prepare(&image.config, RecordingExecutor::new());
    outcome.expect("setup should succeed");

    assert_eq!(ctx.env_var("PATH"), Some("/usr/bin:/bin"));
    assert_eq!(ctx.env_var("STRATA_TEST_OPTS"), Some("a=b"));
    assert!(std::env::var_os("STRATA_TEST_OPTS").is_none());
}

#[test]
fn malformed_environment_entry_stops_before_any_mount_but_propagation() {
    let image = image_with(&["A=1", "BROKEN", "C=3"], &[BASE_LAYER]);
    let (pipeline, ctx, outcome) = prepare(&image.config, RecordingExecutor::new());

    let err = outcome.expect_err("malformed entry");
    assert!(matches!(
        err,
        StrataError::Setup {
            step: SetupStep::Environment,
            ..
        }
    ));
    assert!(matches!(err.root_cause(), StrataError::Validation { .. }));
    assert_eq!(ctx.env_var("A"), Some("1"));
    assert_eq!(ctx.env_var("C"), None);
    assert_eq!(pipeline.executor().commands(), vec!["mount --make-rprivate /"]);
}

#[test]
fn empty_manifest_is_rejected_before_mounting() {
    let image = image_with(&["A=1"], &[]);
    let (pipeline, ctx, outcome) = prepare(&image.config, RecordingExecutor::new());

    let err = outcome.expect_err("empty manifest");
    assert!(matches!(err.root_cause(), StrataError::Validation { .. }));
    assert!(matches!(
        ctx.state(),
        SetupState::Failed {
            step: SetupStep::Overlay,
            ..
        }
    ));
    assert_eq!(pipeline.executor().operations().len(), 1);
}

#[test]
fn missing_layer_directory_is_not_found() {
    let image = default_image();
    std::fs::remove_dir(image.layer_dir(APP_LAYER)).expect("remove layer");
    let (pipeline, _, outcome) = prepare(&image.config, RecordingExecutor::new());

    let err = outcome.expect_err("missing layer");
    assert!(matches!(
        err.root_cause(),
        StrataError::NotFound {
            kind: "layer directory",
            ..
        }
    ));
    assert!(!pipeline.executor().is_mounted(&image.config.base_dir));
}

#[test]
fn missing_volume_fails_without_creating_mount_point() {
    let image = default_image();
    std::fs::remove_dir(&image.config.volume_dir).expect("remove volume");
    let (pipeline, ctx, outcome) = prepare(&image.config, RecordingExecutor::new());

    let err = outcome.expect_err("missing volume");
    assert!(matches!(
        err,
        StrataError::Setup {
            step: SetupStep::Volume,
            ..
        }
    ));
    assert!(matches!(err.root_cause(), StrataError::NotFound { .. }));
    assert!(!image.merged().join("volume").exists());
    assert!(
        !pipeline
            .executor()
            .operations()
            .iter()
            .any(|op| matches!(op, MountOp::Bind { .. }))
    );
    assert!(matches!(
        ctx.state(),
        SetupState::Failed {
            step: SetupStep::Volume,
            ..
        }
    ));
}

#[test]
fn failing_base_filesystem_stops_remaining_mounts() {
    let image = default_image();
    let executor = RecordingExecutor::new().fail_on_target(image.merged().join("sys"));
    let (pipeline, ctx, outcome) = prepare(&image.config, executor);

    let err = outcome.expect_err("sysfs failure");
    assert!(err.to_string().starts_with("base filesystem mounting failed"));
    let last = pipeline.executor().commands().pop().expect("an operation");
    assert!(last.starts_with("mount -t sysfs"), "last op was {last}");
    // Mounts made before the failure stay in place without unwinding.
    assert!(pipeline.executor().is_mounted(&image.merged().join("proc")));
    assert!(ctx.has_mount(&image.merged().join("proc")));
}

#[test]
fn unwind_detaches_mounts_newest_first() {
    let image = default_image();
    let mut config = image.config.clone();
    config.unwind_on_failure = true;
    let executor = RecordingExecutor::new().fail_on_target(image.merged().join("sys"));
    let (pipeline, ctx, outcome) = prepare(&config, executor);

    outcome.expect_err("sysfs failure");
    let merged = show(&image.merged());
    let commands = pipeline.executor().commands();
    assert_eq!(
        commands[commands.len() - 3..],
        [
            format!("umount -l {merged}/proc"),
            format!("umount -l {merged}"),
            format!("umount -l {}", show(&image.config.base_dir)),
        ]
    );
    assert!(ctx.mounts.is_empty());
    assert!(!pipeline.executor().is_mounted(&image.config.base_dir));
}

#[test]
fn second_overlay_assembly_fails_deterministically() {
    let image = default_image();
    let mut pipeline = Pipeline::new(image.config.clone(), RecordingExecutor::new());

    let mut first = pipeline.context();
    pipeline.assemble_overlay(&mut first).expect("first assembly");
    assert_eq!(first.state(), &SetupState::OverlayReady);

    // Same context: rejected by state before touching the executor.
    let issued = pipeline.executor().operations().len();
    let err = pipeline.assemble_overlay(&mut first).expect_err("same context");
    assert!(matches!(err.root_cause(), StrataError::Validation { .. }));
    assert_eq!(pipeline.executor().operations().len(), issued);

    // Fresh context over the same base: the busy tmpfs mount fails.
    let mut second = pipeline.context();
    let err = pipeline.assemble_overlay(&mut second).expect_err("fresh context");
    assert!(matches!(err.root_cause(), StrataError::Mount { .. }));
    assert!(matches!(
        second.state(),
        SetupState::Failed {
            step: SetupStep::Overlay,
            ..
        }
    ));
}

#[test]
fn propagation_failure_aborts_everything() {
    let image = default_image();
    let (pipeline, ctx, outcome) = prepare(&image.config, RecordingExecutor::new().fail_at(0));

    let err = outcome.expect_err("rprivate failure");
    assert!(err.to_string().starts_with("mount propagation failed"));
    assert_eq!(pipeline.executor().operations().len(), 1);
    assert!(ctx.environment.is_empty());
    assert!(!image.config.base_dir.exists());
}
