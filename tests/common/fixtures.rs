//! Fake engine binaries and host input builders

use rclone_worker::request::{
    DOWNLOAD_SOURCE, DOWNLOAD_TARGETPATH, EPHEMERAL_TYPE, REMOTE_ID, REMOTE_TYPE, encode_source,
};
use rclone_worker::{FileItem, InputData};
use std::path::{Path, PathBuf};

/// A stats line as rclone prints it at NOTICE level with `--use-json-log`
pub const STATS_HALF: &str = r#"{"level":"warning","msg":"\nTransferred: 512 B / 1 KiB, 50%","source":"accounting/stats.go:498","stats":{"bytes":512,"totalBytes":1024,"transfers":0,"totalTransfers":1,"speed":256.0,"transferring":[{"name":"notes.txt","bytes":512,"size":1024,"speedAvg":256.0}]},"time":"2024-05-01T10:00:00.000000+02:00"}"#;

/// Final stats line of a single-file copy
pub const STATS_DONE: &str = r#"{"level":"warning","msg":"\nTransferred: 1 KiB / 1 KiB, 100%","source":"accounting/stats.go:498","stats":{"bytes":1024,"totalBytes":1024,"transfers":1,"totalTransfers":1,"speed":512.0},"time":"2024-05-01T10:00:01.000000+02:00"}"#;

/// Per-file copy confirmation, emitted at INFO and therefore ignored
pub const COPIED_INFO: &str = r#"{"level":"info","msg":"Copied (new)","object":"notes.txt","objectType":"*local.Object","size":1024,"source":"operations/copy.go:360"}"#;

/// Failed copy of one object
pub const COPY_ERROR: &str = r#"{"level":"error","msg":"Failed to copy: directory not found","object":"notes.txt","objectType":"*drive.Object","source":"operations/copy.go:286"}"#;

/// Source item used by most tests
pub fn notes_item() -> FileItem {
    FileItem {
        remote: "gdrive".into(),
        path: "work/notes.txt".into(),
        name: "notes.txt".into(),
        size: 1024,
        is_dir: false,
        mime_type: Some("text/plain".into()),
        modified: Some(1_714_550_400_000),
    }
}

/// Host input for downloading `item` into `target`
pub fn download_input(item: &FileItem, target: &Path) -> InputData {
    let payload = match encode_source(item) {
        Ok(payload) => payload,
        Err(e) => panic!("encoding source failed: {e}"),
    };
    InputData::new()
        .with_string(EPHEMERAL_TYPE, "DOWNLOAD")
        .with_string(REMOTE_ID, item.remote.clone())
        .with_string(REMOTE_TYPE, "drive")
        .with_string(DOWNLOAD_TARGETPATH, target.to_string_lossy().into_owned())
        .with_bytes(DOWNLOAD_SOURCE, payload)
}

/// Write an executable `rclone` stand-in into `dir`
///
/// The script records its arguments one per line in `args.txt` next to it,
/// prints `lines` to stderr and exits with `exit_code`.
#[cfg(unix)]
pub fn fake_rclone(dir: &Path, lines: &[&str], exit_code: i32) -> PathBuf {
    let mut body = String::new();
    for line in lines {
        body.push_str(&format!("cat >&2 <<'EOF'\n{line}\nEOF\n"));
    }
    body.push_str(&format!("exit {exit_code}\n"));
    fake_rclone_script(dir, &body)
}

/// Write an executable `rclone` stand-in running `body` after recording its arguments
#[cfg(unix)]
pub fn fake_rclone_script(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let args_file = dir.join("args.txt");
    let script = format!(
        "#!/bin/sh\nfor a in \"$@\"; do printf '%s\\n' \"$a\"; done > '{}'\n{body}",
        args_file.display()
    );

    let path = dir.join("rclone");
    if let Err(e) = std::fs::write(&path, script) {
        panic!("writing fake rclone failed: {e}");
    }
    if let Err(e) = std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)) {
        panic!("chmod fake rclone failed: {e}");
    }
    path
}

/// Arguments the fake engine was invoked with
pub fn recorded_args(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("args.txt"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
