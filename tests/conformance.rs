use std::collections::HashSet;
use std::fs;

use firestore_write_compiler::conformance::{all_tests, generate_all, run, FixtureWriter};
use serde_json::Value;

#[test]
fn every_fixture_matches_the_compiler() {
    let tests = all_tests().expect("fixtures");
    let mut failures = Vec::new();
    for test in &tests {
        match (run(test), test.expected_request(), test.expected_error()) {
            (Ok(actual), Some(expected), _) if &actual == expected => {}
            (Err(err), None, Some(code)) if err.code == code => {}
            (outcome, _, _) => failures.push(format!(
                "{} ({}): {outcome:?}",
                test.name, test.description
            )),
        }
    }
    assert!(failures.is_empty(), "mismatches:\n{}", failures.join("\n"));
}

#[test]
fn fixture_tables_have_expected_sizes() {
    let tests = all_tests().unwrap();
    let count = |prefix: &str| {
        tests
            .iter()
            .filter(|test| {
                test.name
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('-'))
                    .is_some_and(|rest| rest.parse::<usize>().is_ok())
            })
            .count()
    };
    assert_eq!(count("get"), 1);
    assert_eq!(count("create"), 7);
    assert_eq!(count("set"), 22);
    assert_eq!(count("update"), 21);
    assert_eq!(count("update-paths"), 17);
    assert_eq!(count("delete"), 3);
}

#[test]
fn generated_files_round_trip_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let writer = generate_all(dir.path()).unwrap();
    let tests = all_tests().unwrap();
    assert_eq!(writer.written(), tests.len());

    let files: HashSet<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), tests.len());

    let update: Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("update-8.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(update["description"], "last-update-time precondition");
    assert_eq!(
        update["update"]["precondition"]["updateTime"],
        "2017-01-02T03:04:05.000000006Z"
    );
    assert_eq!(
        update["update"]["request"]["writes"][0]["currentDocument"]["updateTime"],
        "2017-01-02T03:04:05.000000006Z"
    );

    let error: Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("update-paths-12.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(error["updatePaths"]["isError"], true);
    assert_eq!(error["updatePaths"]["errorCode"], "firestore/duplicate-path");
    assert!(error["updatePaths"].get("request").is_none());
}

#[test]
fn set_fixture_serializes_merge_option() {
    let dir = tempfile::tempdir().unwrap();
    let tests = all_tests().unwrap();
    let mut writer = FixtureWriter::new(dir.path()).unwrap();
    let merge_paths = tests.iter().find(|test| test.name == "set-8").unwrap();
    let path = writer.write(merge_paths).unwrap();

    let parsed: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(parsed["set"]["option"]["fields"][0]["field"], serde_json::json!(["*", "~"]));
    assert!(parsed["set"]["option"].get("all").is_none());
    assert_eq!(writer.written(), 1);
}
