use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::str::contains;

fn write_obj(name: &str, origin: u16, words: &[u16]) -> PathBuf {
    let mut bytes = origin.to_be_bytes().to_vec();
    for word in words {
        bytes.extend_from_slice(&word.to_be_bytes());
    }
    let path = std::env::temp_dir().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn runs_without_arguments() {
    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.assert().success();
}

#[test]
fn prints_version() {
    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.arg("--version");
    cmd.assert().success().stdout(contains("braid"));
}

#[test]
fn runs_halting_program() {
    // AND R0,R0,#0 ; STI R0 -> MCR
    let path = write_obj("braid_halt.obj", 0x3000, &[0x5020, 0xb001, 0x0000, 0xfffe]);

    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.arg(&path);
    cmd.assert().success().stdout("");
}

#[test]
fn echoes_input_to_display() {
    // TRAP x20 ; STI R0 -> DDR ; AND R1,R1,#0 ; STI R1 -> MCR
    let path = write_obj(
        "braid_echo.obj",
        0x3000,
        &[0xf020, 0xb002, 0x5260, 0xb201, 0xfe06, 0xfffe],
    );

    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.arg("run").arg(&path).write_stdin("A");
    cmd.assert().success().stdout("A");
}

#[test]
fn dispatches_trap_through_os_image() {
    // Vector 0x25 points at a routine which halts the clock.
    let mut os = vec![0u16; 0x0204 - 0x0025];
    os[0] = 0x0200; // vector x25 -> routine
    os[0x0200 - 0x0025] = 0x5020; // AND R0,R0,#0
    os[0x0201 - 0x0025] = 0xb001; // STI R0 -> MCR
    os[0x0203 - 0x0025] = 0xfffe;
    let os_path = write_obj("braid_os.obj", 0x0025, &os);
    let program = write_obj("braid_trap.obj", 0x3000, &[0xf025]);

    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.arg("run").arg(&program).arg("--os").arg(&os_path);
    cmd.assert().success();
}

#[test]
fn reports_missing_file() {
    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.arg("definitely_missing.obj");
    cmd.assert()
        .failure()
        .code(2)
        .stderr(contains("failed to read program image"));
}

#[test]
fn reports_oversized_image() {
    let path = write_obj("braid_large.obj", 0xffff, &[0x0000, 0x0000]);

    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.arg(&path);
    cmd.assert()
        .failure()
        .code(2)
        .stderr(contains("exceeds memory space"));
}

#[test]
fn reports_unimplemented_opcode() {
    let path = write_obj("braid_rti.obj", 0x3000, &[0x8000]);

    let mut cmd = Command::cargo_bin("braid").unwrap();
    cmd.arg(&path);
    cmd.assert()
        .failure()
        .code(3)
        .stderr(contains("unimplemented opcode"));
}
