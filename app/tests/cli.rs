use std::io::Write;

use assert_cmd::Command;

fn write_source(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".shp").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn check_accepts_a_well_shaped_file() {
    let file = write_source("a = True or False\nc = np.zeros(3)\n");
    Command::cargo_bin("shc")
        .unwrap()
        .arg("check")
        .arg(file.path())
        .assert()
        .success();
}

#[test]
fn check_rejects_a_kind_mismatch() {
    let file = write_source("a = True\na = None\n");
    Command::cargo_bin("shc")
        .unwrap()
        .arg("check")
        .arg(file.path())
        .assert()
        .failure();
}
