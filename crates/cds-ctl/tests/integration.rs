//! Integration tests for cds-ctl using a stand-in client script.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use cds_ctl::{CdsCtl, CtlCommand, CtlConfig, CtlError};
use tokio::sync::Mutex;

// Spawning while another thread still holds a freshly written script open
// fails with ETXTBSY, so tests in this file run one at a time.
static SERIAL: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Write an executable shell script standing in for the real client.
fn write_script(dir: &Path, body: &str) -> PathBuf {
  let path = dir.join("fake-cdsctl");
  std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("failed to write script");
  let mut perms = std::fs::metadata(&path).unwrap().permissions();
  perms.set_mode(0o755);
  std::fs::set_permissions(&path, perms).expect("failed to chmod script");
  path
}

fn config(binary: PathBuf, working_dir: &Path) -> CtlConfig {
  CtlConfig {
    binary,
    config_file: Some(PathBuf::from("/tmp/cdsrc")),
    context: Some("dev".to_string()),
    working_dir: working_dir.to_path_buf(),
    timeout: Some(Duration::from_secs(10)),
  }
}

#[tokio::test]
async fn test_arguments_reach_the_process() {
  let _guard = SERIAL.lock().await;
  let dir = tempfile::tempdir().unwrap();
  let script = write_script(dir.path(), r#"echo "$@""#);
  let ctl = CdsCtl::new(config(script, dir.path()));

  let out = ctl
    .run_text(&CtlCommand::new(["workflow", "list"]).arg("PROJ"))
    .await
    .unwrap();
  assert_eq!(out.trim(), "-f /tmp/cdsrc -c dev workflow list PROJ");
}

#[tokio::test]
async fn test_runs_in_working_dir() {
  let _guard = SERIAL.lock().await;
  let dir = tempfile::tempdir().unwrap();
  let script = write_script(dir.path(), "pwd");
  let ctl = CdsCtl::new(config(script, dir.path()));

  let out = ctl.run_text(&CtlCommand::new(["version"])).await.unwrap();
  let reported = std::fs::canonicalize(out.trim()).unwrap();
  assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
}

#[tokio::test]
async fn test_json_output() {
  let _guard = SERIAL.lock().await;
  let dir = tempfile::tempdir().unwrap();
  let script = write_script(
    dir.path(),
    r#"printf '[{"name": "build", "last": "%s"}]' "$9""#,
  );
  let ctl = CdsCtl::new(config(script, dir.path()));

  // $9 is the value following --format.
  let list = ctl.workflow_list("PROJ").await.unwrap();
  assert_eq!(list[0]["name"], "build");
  assert_eq!(list[0]["last"], "json");
}

#[tokio::test]
async fn test_non_zero_exit() {
  let _guard = SERIAL.lock().await;
  let dir = tempfile::tempdir().unwrap();
  let script = write_script(dir.path(), "echo 'no such project' >&2; exit 3");
  let ctl = CdsCtl::new(config(script, dir.path()));

  let err = ctl.workflow_list("NOPE").await.unwrap_err();
  match err {
    CtlError::Failed { status, stderr, .. } => {
      assert_eq!(status, Some(3));
      assert_eq!(stderr, "no such project");
    }
    other => panic!("expected Failed, got {:?}", other),
  }
}

#[tokio::test]
async fn test_timeout() {
  let _guard = SERIAL.lock().await;
  let dir = tempfile::tempdir().unwrap();
  let script = write_script(dir.path(), "sleep 5");
  let mut cfg = config(script, dir.path());
  cfg.timeout = Some(Duration::from_millis(100));
  let ctl = CdsCtl::new(cfg);

  let err = ctl.run_text(&CtlCommand::new(["version"])).await.unwrap_err();
  match &err {
    CtlError::Timeout { binary, timeout } => {
      assert_eq!(binary, &dir.path().join("fake-cdsctl"));
      assert_eq!(*timeout, Duration::from_millis(100));
    }
    other => panic!("expected Timeout, got {:?}", other),
  }
  assert!(err.to_string().contains("fake-cdsctl' timed out"));
}

#[tokio::test]
async fn test_missing_binary() {
  let _guard = SERIAL.lock().await;
  let dir = tempfile::tempdir().unwrap();
  let ctl = CdsCtl::new(config(dir.path().join("does-not-exist"), dir.path()));

  let err = ctl.run_text(&CtlCommand::new(["version"])).await.unwrap_err();
  assert!(matches!(err, CtlError::Spawn { .. }));
}
