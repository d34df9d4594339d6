use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("streammux")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("resolutions"));
}

#[test]
fn test_download_help_mentions_trim() {
    Command::cargo_bin("streammux")
        .unwrap()
        .args(["download", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--start"))
        .stdout(predicate::str::contains("--end"));
}

#[test]
fn test_start_without_end_is_rejected() {
    Command::cargo_bin("streammux")
        .unwrap()
        .args(["download", "https://youtu.be/abc", "--start", "0:30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--end"));
}

#[test]
fn test_malformed_time_is_rejected() {
    Command::cargo_bin("streammux")
        .unwrap()
        .args(["download", "https://youtu.be/abc", "--start", "1:75", "--end", "2:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid time"));
}
