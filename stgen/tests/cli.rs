//! Drive the `stgen` binary end to end

use std::fs;
use std::process::Command;

const SCRIPT: &str = "\
# producer/consumer
switch 1
write 0 8
switch 2
read 4 8
iop
";

fn stgen() -> Command {
    Command::new(env!("CARGO_BIN_EXE_stgen"))
}

#[test]
fn test_record_then_dump() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("events.txt");
    fs::write(&script, SCRIPT).unwrap();
    let out_dir = dir.path().join("traces");

    let status = stgen()
        .arg("record")
        .arg(&script)
        .arg("--output-dir")
        .arg(&out_dir)
        .arg("-q")
        .status()
        .expect("Failed to run stgen");
    assert!(status.success());

    for name in [
        "sigil.events.out-1.bin.gz",
        "sigil.events.out-2.bin.gz",
        "sigil.pthread.out",
        "sigil.stats.json",
    ] {
        assert!(out_dir.join(name).exists(), "missing {name}");
    }

    let output = stgen()
        .arg("dump")
        .arg(out_dir.join("sigil.events.out-2.bin.gz"))
        .output()
        .expect("Failed to run stgen");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "0,2,1,0,1,0 * 0x4 0xc\n1,2 # 1 0 0x4 0x8\n"
    );
}

#[test]
fn test_malformed_script_exits_with_usage_code() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("events.txt");
    fs::write(&script, "switch 1\nteleport 3\n").unwrap();

    let output = stgen()
        .arg("record")
        .arg(&script)
        .arg("-o")
        .arg(dir.path())
        .output()
        .expect("Failed to run stgen");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("line 2"), "stderr: {stderr}");
}

#[test]
fn test_unknown_sync_code_fails() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("events.txt");
    fs::write(&script, "switch 1\nsync 99 0x10\n").unwrap();

    let output = stgen()
        .arg("record")
        .arg(&script)
        .arg("-o")
        .arg(dir.path())
        .output()
        .expect("Failed to run stgen");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Unrecognized synchronization type 99"), "stderr: {stderr}");
}
