//! Supervised-process lifecycle: graceful stop, forced kill, idempotence.

#![allow(clippy::expect_used)]

use std::time::{Duration, Instant};

use ragup::supervisor::ProcessSupervisor;

fn cmd(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test]
async fn request_stop_without_live_handle_is_a_noop() {
    let mut sup = ProcessSupervisor::new();
    assert!(!sup.is_live());
    sup.request_stop().await.expect("first no-op stop");
    sup.request_stop().await.expect("second no-op stop");
    assert!(!sup.is_live());
}

#[tokio::test]
async fn graceful_stop_terminates_child_and_clears_handle() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sup = ProcessSupervisor::with_grace(Duration::from_secs(5));

    sup.spawn(&cmd(&["sleep", "30"]), dir.path()).expect("spawn");
    assert!(sup.is_live());

    // sleep exits on SIGTERM, so this returns well inside the grace window.
    let started = Instant::now();
    sup.request_stop().await.expect("stop");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!sup.is_live());

    // Idempotent after the handle is cleared.
    sup.request_stop().await.expect("stop twice");
}

#[tokio::test]
async fn unresponsive_child_is_killed_after_grace_window() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sup = ProcessSupervisor::with_grace(Duration::from_millis(200));

    sup.spawn(&cmd(&["sh", "-c", "trap '' TERM; sleep 30"]), dir.path())
        .expect("spawn");
    sup.request_stop().await.expect("stop");
    assert!(!sup.is_live());
}

#[tokio::test]
async fn wait_returns_natural_exit_and_stop_still_clears() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sup = ProcessSupervisor::new();

    sup.spawn(&cmd(&["true"]), dir.path()).expect("spawn");
    let status = sup.wait().await.expect("wait");
    assert!(status.success());

    sup.request_stop().await.expect("stop after natural exit");
    assert!(!sup.is_live());
}

#[tokio::test]
async fn second_spawn_while_live_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sup = ProcessSupervisor::with_grace(Duration::from_secs(5));

    sup.spawn(&cmd(&["sleep", "30"]), dir.path()).expect("spawn");
    let err = sup
        .spawn(&cmd(&["sleep", "30"]), dir.path())
        .expect_err("expected Err");
    assert!(err.to_string().contains("already running"));

    sup.request_stop().await.expect("cleanup");
}

#[tokio::test]
async fn empty_command_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut sup = ProcessSupervisor::new();
    assert!(sup.spawn(&[], dir.path()).is_err());
    assert!(!sup.is_live());
}

#[tokio::test]
async fn child_receives_root_env_and_cwd() {
    let dir = tempfile::tempdir().expect("tempdir");
    let marker = dir.path().join("seen");
    let script = format!(
        "test \"$RAGUP_ROOT\" = \"{root}\" && touch {marker}",
        root = dir.path().display(),
        marker = marker.display()
    );
    let mut sup = ProcessSupervisor::new();

    sup.spawn(&cmd(&["sh", "-c", &script]), dir.path())
        .expect("spawn");
    let status = sup.wait().await.expect("wait");
    sup.request_stop().await.expect("stop");

    assert!(status.success());
    assert!(marker.exists(), "child should see RAGUP_ROOT == cwd == root");
}
