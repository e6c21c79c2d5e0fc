//! Privileged tests against the real kernel.
//!
//! Run with `cargo test -- --ignored` as root. Each test moves its own
//! thread into a private mount namespace first, so nothing leaks onto the
//! host.

#![cfg(target_os = "linux")]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;

use strata_core::filesystem::{overlayfs, pivot_root};
use strata_core::mount::syscall::SyscallExecutor;
use strata_core::mount::{MountExecutor, MountOp};
use strata_image::layer::LayerDescriptor;
use strata_image::storage::LayerStore;

fn layer(hex: &str) -> LayerDescriptor {
    LayerDescriptor {
        digest: format!("sha256:{hex}"),
        media_type: "application/vnd.oci.image.layer.v1.tar".into(),
        size: 0,
    }
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(path, contents).expect("write");
}

#[test]
#[ignore = "requires CAP_SYS_ADMIN"]
fn later_layer_wins_on_path_collision() {
    nix::sched::unshare(nix::sched::CloneFlags::CLONE_NEWNS).expect("unshare mount namespace");
    let mut executor = SyscallExecutor;
    pivot_root::make_rprivate(&mut executor).expect("rprivate");

    let dir = tempfile::tempdir().expect("tempdir");
    let layers = dir.path().join("layers");
    write(&layers.join("aaaa/etc/motd"), "base\n");
    write(&layers.join("aaaa/etc/issue"), "base only\n");
    write(&layers.join("bbbb/etc/motd"), "app\n");

    let base = dir.path().join("overlay");
    let store = LayerStore::open(&layers);
    let spec = overlayfs::OverlaySpec::from_manifest(&base, &[layer("aaaa"), layer("bbbb")], &store)
        .expect("spec");

    overlayfs::mount_base_tmpfs(&mut executor, &base).expect("tmpfs");
    overlayfs::mount_overlay(&mut executor, &spec).expect("overlay");

    let merged = &spec.merged_dir;
    assert_eq!(std::fs::read_to_string(merged.join("etc/motd")).expect("motd"), "app\n");
    assert_eq!(
        std::fs::read_to_string(merged.join("etc/issue")).expect("issue"),
        "base only\n"
    );

    // Writes land in the tmpfs upper layer, never in a lower layer.
    std::fs::write(merged.join("etc/motd"), "changed\n").expect("write through overlay");
    assert_eq!(
        std::fs::read_to_string(layers.join("bbbb/etc/motd")).expect("layer"),
        "app\n"
    );

    let err = overlayfs::mount_base_tmpfs(&mut executor, &base).expect_err("second tmpfs");
    assert!(err.to_string().contains("already a mount point"));

    for target in [merged.clone(), base] {
        executor
            .execute(&MountOp::DetachUnmount { target })
            .expect("unmount");
    }
}

#[test]
#[ignore = "requires CAP_SYS_ADMIN"]
fn single_layer_contents_pass_through() {
    nix::sched::unshare(nix::sched::CloneFlags::CLONE_NEWNS).expect("unshare mount namespace");
    let mut executor = SyscallExecutor;
    pivot_root::make_rprivate(&mut executor).expect("rprivate");

    let dir = tempfile::tempdir().expect("tempdir");
    let layers = dir.path().join("layers");
    write(&layers.join("cccc/etc/hostname"), "strata-test\n");

    let base = dir.path().join("overlay");
    let spec = overlayfs::OverlaySpec::from_manifest(&base, &[layer("cccc")], &LayerStore::open(&layers))
        .expect("spec");
    overlayfs::mount_base_tmpfs(&mut executor, &base).expect("tmpfs");
    overlayfs::mount_overlay(&mut executor, &spec).expect("overlay");

    assert_eq!(
        std::fs::read_to_string(spec.merged_dir.join("etc/hostname")).expect("hostname"),
        "strata-test\n"
    );
    assert!(overlayfs::is_mount_point(&spec.merged_dir).expect("stat merged"));

    for target in [spec.merged_dir.clone(), base] {
        executor
            .execute(&MountOp::DetachUnmount { target })
            .expect("unmount");
    }
}
