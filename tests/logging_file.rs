use std::{fs, thread::sleep, time::Duration};

use tempfile::tempdir;

// One global subscriber per process: keep this the only test in the binary.
#[test]
fn writes_log_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("logs").join("glider.log");

    glider::logging::init(true, Some(path.clone()));
    tracing::info!("selection menu enabled");

    sleep(Duration::from_millis(100));

    assert!(path.exists(), "log file was not created");
    let contents = fs::read_to_string(path).unwrap();
    assert!(contents.contains("selection menu enabled"));
}
