//! End-to-end install, switch and current-version checks against a synthetic
//! installation root. The fake `node` executables are shell scripts, so these
//! only run on Unix.
#![cfg(unix)]

use std::io::Write as _;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nodeswitch_nvm::{
    BackendError, InstallationRoot, NodeVersion, NvmBackend, VersionManager, current_active,
    list_installed, query_active, switch,
};
use nodeswitch_core::test_server::{Reply, TestServer, client};
use tokio_util::sync::CancellationToken;

// Spawning a script while another test still holds it open for writing fails
// with ETXTBSY, so tests that write or run executables take turns.
static EXEC_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

fn node_script(tag: &str) -> String {
    format!("#!/bin/sh\necho {tag}\n")
}

fn synthetic_root(temp: &Path) -> (InstallationRoot, PathBuf) {
    let link = temp.join("nodejs");
    std::fs::write(
        temp.join("settings.txt"),
        format!("path: {}\n", link.display()),
    )
    .expect("settings should be written");
    (InstallationRoot::new(temp), link)
}

fn fake_install(root: &InstallationRoot, tag: &str) {
    let bin = root.path().join(tag).join("bin");
    std::fs::create_dir_all(&bin).expect("bin dir should be created");
    let marker = bin.join("node");
    std::fs::write(&marker, node_script(tag)).expect("marker should be written");
    std::fs::set_permissions(&marker, std::fs::Permissions::from_mode(0o755))
        .expect("marker should be made executable");
}

fn release_zip(wrapper: &str, tag: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let dirs = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
    writer
        .add_directory(format!("{wrapper}/"), dirs)
        .expect("wrapper entry should be written");
    writer
        .add_directory(format!("{wrapper}/bin/"), dirs)
        .expect("bin entry should be written");
    writer
        .start_file(format!("{wrapper}/bin/node"), dirs)
        .expect("marker entry should be started");
    writer
        .write_all(node_script(tag).as_bytes())
        .expect("marker entry should be written");
    writer
        .start_file(format!("{wrapper}/README.md"), dirs)
        .expect("readme entry should be started");
    writer.write_all(b"# node").expect("readme should be written");
    writer
        .finish()
        .expect("zip archive should be finalized")
        .into_inner()
}

#[tokio::test]
async fn switch_then_current_reports_switched_version() {
    let _guard = EXEC_LOCK.lock().await;
    let temp = tempfile::tempdir().expect("tempdir should be created");
    let (root, _) = synthetic_root(temp.path());
    fake_install(&root, "v18.2.0");
    fake_install(&root, "v20.11.1");

    switch(&root, &NodeVersion::new(18, 2, 0)).expect("switch to v18 should succeed");
    assert_eq!(
        current_active(&root, QUERY_TIMEOUT).await,
        Some(NodeVersion::new(18, 2, 0))
    );

    switch(&root, &NodeVersion::new(20, 11, 1)).expect("switch to v20 should succeed");
    assert_eq!(
        current_active(&root, QUERY_TIMEOUT).await,
        Some(NodeVersion::new(20, 11, 1))
    );

    let installed = list_installed(&root).expect("listing should succeed");
    let active: Vec<NodeVersion> = installed
        .iter()
        .filter(|v| v.is_active)
        .map(|v| v.version)
        .collect();
    assert_eq!(active, [NodeVersion::new(20, 11, 1)]);
}

#[tokio::test]
async fn failed_switch_keeps_previous_version_active() {
    let _guard = EXEC_LOCK.lock().await;
    let temp = tempfile::tempdir().expect("tempdir should be created");
    let (root, link) = synthetic_root(temp.path());
    fake_install(&root, "v18.2.0");
    switch(&root, &NodeVersion::new(18, 2, 0)).expect("switch should succeed");

    let backend = NvmBackend::new(root.clone(), client(), "http://127.0.0.1:9/");
    let result = backend.use_version(&NodeVersion::new(22, 1, 0)).await;

    assert_eq!(
        result,
        Err(BackendError::VersionNotInstalled {
            version: "v22.1.0".to_string()
        })
    );
    assert_eq!(
        std::fs::read_link(&link).expect("link should still exist"),
        root.path().join("v18.2.0")
    );
    assert_eq!(
        backend.current_version().await,
        Some(NodeVersion::new(18, 2, 0))
    );
}

#[tokio::test]
async fn broken_marker_is_a_query_error_but_not_a_current_version() {
    let _guard = EXEC_LOCK.lock().await;
    let temp = tempfile::tempdir().expect("tempdir should be created");
    let (root, _) = synthetic_root(temp.path());
    let bin = root.path().join("v1.0.0").join("bin");
    std::fs::create_dir_all(&bin).expect("bin dir should be created");
    std::fs::write(bin.join("node"), "#!/bin/sh\nexit 3\n").expect("marker should be written");
    std::fs::set_permissions(bin.join("node"), std::fs::Permissions::from_mode(0o755))
        .expect("marker should be made executable");
    switch(&root, &NodeVersion::new(1, 0, 0)).expect("switch should succeed");

    assert!(query_active(&root, QUERY_TIMEOUT).await.is_err());
    assert_eq!(current_active(&root, QUERY_TIMEOUT).await, None);
}

#[tokio::test]
async fn install_and_use_flattens_archive_and_activates_it() {
    let _guard = EXEC_LOCK.lock().await;
    let temp = tempfile::tempdir().expect("tempdir should be created");
    let staging = tempfile::tempdir().expect("staging dir should be created");
    let (root, _) = synthetic_root(temp.path());
    let server = TestServer::start(Reply::full(
        200,
        release_zip("node-v20.11.1-linux-x64", "v20.11.1"),
    ))
    .await;
    let backend = NvmBackend::new(root.clone(), client(), &server.url())
        .with_query_timeout(QUERY_TIMEOUT)
        .with_temp_dir(staging.path().to_path_buf());
    let (tx, mut rx) = tokio::sync::mpsc::channel(1024);

    backend
        .install_and_use(
            &NodeVersion::new(20, 11, 1),
            Some(tx),
            CancellationToken::new(),
        )
        .await
        .expect("install and use should succeed");

    let version_dir = root.path().join("v20.11.1");
    assert!(version_dir.join("bin/node").is_file());
    assert!(version_dir.join("README.md").is_file());
    assert!(!version_dir.join("node-v20.11.1-linux-x64").exists());
    assert_eq!(
        std::fs::read_dir(staging.path())
            .expect("staging dir should be readable")
            .count(),
        0
    );
    assert_eq!(
        backend.current_version().await,
        Some(NodeVersion::new(20, 11, 1))
    );
    assert_eq!(
        backend
            .query_current()
            .await
            .expect("query should succeed"),
        Some(NodeVersion::new(20, 11, 1))
    );

    let mut saw_progress = false;
    while let Ok(event) = rx.try_recv() {
        saw_progress |= event.percent() == Some(100);
    }
    assert!(saw_progress);
    assert_eq!(server.requests().len(), 1);

    let installed = list_installed(&root).expect("listing should succeed");
    assert_eq!(installed.len(), 1);
    assert!(installed[0].is_active);
}
