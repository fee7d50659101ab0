use assert_cmd::Command;
use predicates::prelude::*;
use std::collections::BTreeSet;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get a Command for the policy-filter binary.
#[allow(deprecated)]
fn policy_filter_cmd() -> Command {
    Command::cargo_bin("policy-filter").unwrap()
}

fn lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn help_works() {
    policy_filter_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--merge-all"));
}

#[test]
fn filters_single_dictionary() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("rockyou.txt");
    let output = temp_dir.path().join("output");
    std::fs::write(&input, "password\nPassw0rd!\nletmein\nS3cure#Pass\n").unwrap();

    policy_filter_cmd()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--min-length", "8", "--special-chars", "!#", "--quiet"])
        .assert()
        .success();

    assert_eq!(
        lines(&output.join("filtered_passwords.txt")),
        vec!["Passw0rd!", "S3cure#Pass"]
    );
}

#[test]
fn existing_output_gets_new_name() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("dict.txt");
    let output = temp_dir.path().join("output");
    std::fs::create_dir(&output).unwrap();
    std::fs::write(output.join("filtered_passwords.txt"), "keep me\n").unwrap();
    std::fs::write(&input, "Passw0rd!\n").unwrap();

    policy_filter_cmd()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("-q")
        .assert()
        .success();

    assert_eq!(lines(&output.join("filtered_passwords.txt")), vec!["keep me"]);
    assert_eq!(lines(&output.join("filtered_passwords_1.txt")), vec!["Passw0rd!"]);
}

#[test]
fn overwrite_replaces_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("dict.txt");
    let output = temp_dir.path().join("output");
    std::fs::create_dir(&output).unwrap();
    std::fs::write(output.join("filtered_passwords.txt"), "stale\n").unwrap();
    std::fs::write(&input, "Passw0rd!\n").unwrap();

    policy_filter_cmd()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .args(["--overwrite", "-q"])
        .assert()
        .success();

    assert_eq!(lines(&output.join("filtered_passwords.txt")), vec!["Passw0rd!"]);
}

#[test]
fn merge_all_then_filter() {
    let temp_dir = TempDir::new().unwrap();
    let dict = temp_dir.path().join("dict");
    let output = temp_dir.path().join("output");
    std::fs::create_dir(&dict).unwrap();
    std::fs::write(dict.join("a.txt"), "Passw0rd!\nweak\nDup#1234\n").unwrap();
    std::fs::write(dict.join("b.txt"), "Dup#1234\nAnother@99\n").unwrap();

    policy_filter_cmd()
        .arg("-i")
        .arg(&dict)
        .arg("-o")
        .arg(&output)
        .args(["--merge-all", "--strategy", "fan-in", "-q"])
        .assert()
        .success();

    let merged: BTreeSet<String> = lines(&output.join("dicts_merged.txt")).into_iter().collect();
    assert_eq!(merged.len(), 4);

    let filtered: BTreeSet<String> = lines(&output.join("filtered_passwords.txt")).into_iter().collect();
    let expected: BTreeSet<String> = ["Passw0rd!", "Dup#1234", "Another@99"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    assert_eq!(filtered, expected);
}

#[test]
fn policy_file_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("dict.txt");
    let output = temp_dir.path().join("output");
    let saved = temp_dir.path().join("config.json");
    std::fs::write(&input, "abcdef\nabc\n").unwrap();

    policy_filter_cmd()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--save-policy")
        .arg(&saved)
        .args(["--min-length", "5", "--min-uppercase", "0", "--min-special", "0", "--min-digits", "0", "-q"])
        .assert()
        .success();

    assert_eq!(lines(&output.join("filtered_passwords.txt")), vec!["abcdef"]);

    // Go-style code point alphabet is accepted too
    let legacy = temp_dir.path().join("legacy.json");
    std::fs::write(
        &legacy,
        r#"{"min_length":3,"min_uppercase":0,"min_special_chars":0,"special_chars":[],"min_digits":0}"#,
    )
    .unwrap();

    policy_filter_cmd()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--policy")
        .arg(&legacy)
        .args(["--output-name", "legacy.txt", "-q"])
        .assert()
        .success();

    assert_eq!(lines(&output.join("legacy.txt")), vec!["abcdef", "abc"]);
    assert!(std::fs::read_to_string(&saved).unwrap().contains("\"min_length\": 5"));
}

#[test]
fn missing_input_fails() {
    let temp_dir = TempDir::new().unwrap();

    policy_filter_cmd()
        .arg("-i")
        .arg(temp_dir.path().join("nope.txt"))
        .arg("-o")
        .arg(temp_dir.path().join("output"))
        .arg("-q")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input is not a file"));
}

#[test]
fn missing_input_keeps_existing_output() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("output");
    std::fs::create_dir(&output).unwrap();
    std::fs::write(output.join("filtered_passwords.txt"), "keep me\n").unwrap();

    policy_filter_cmd()
        .arg("-i")
        .arg(temp_dir.path().join("typo.txt"))
        .arg("-o")
        .arg(&output)
        .args(["--overwrite", "-q"])
        .assert()
        .failure();

    policy_filter_cmd()
        .arg("-i")
        .arg(temp_dir.path().join("empty_dir"))
        .arg("-o")
        .arg(&output)
        .args(["--merge-all", "--overwrite", "-q"])
        .assert()
        .failure();

    assert_eq!(lines(&output.join("filtered_passwords.txt")), vec!["keep me"]);
}

#[test]
fn invalid_policy_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("dict.txt");
    std::fs::write(&input, "x\n").unwrap();

    policy_filter_cmd()
        .arg("-i")
        .arg(&input)
        .args(["--special-chars", "", "-q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("special alphabet is empty"));
}
