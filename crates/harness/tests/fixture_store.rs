//! File-backed fixture store tests.

use apiflow_harness::{
    Credential, FileFixtureStore, FixtureError, FixtureStore, FixtureStoreExt, RegisteredUser,
};
use serde_json::json;

#[test]
fn test_directory_is_created_on_first_save() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileFixtureStore::new(dir.path().join("nested").join("fixtures"));
    assert!(!store.dir().exists());

    store.save("Token", &json!({"token": "abc"})).unwrap();
    assert!(store.path_for("Token").is_file());
    assert_eq!(store.load("Token").unwrap(), json!({"token": "abc"}));
}

#[test]
fn test_missing_fixture_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileFixtureStore::new(dir.path());

    assert!(!store.contains("Token"));
    assert!(matches!(
        store.load("Token"),
        Err(FixtureError::NotFound { name }) if name == "Token"
    ));
    assert!(!store.remove("Token").unwrap());
}

#[test]
fn test_overwrite_leaves_no_temporary_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileFixtureStore::new(dir.path());

    store.save("Token", &json!("first")).unwrap();
    store.save("Token", &json!("second")).unwrap();
    assert_eq!(store.load("Token").unwrap(), json!("second"));

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["Token.json".to_string()]);
}

#[test]
fn test_reads_both_credential_shapes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Token.json"), r#"{"token": "from-file"}"#).unwrap();
    let store = FileFixtureStore::new(dir.path());

    assert_eq!(
        store.load_credential("Token").unwrap(),
        Credential::new("from-file")
    );

    let registered = RegisteredUser {
        access_token: "registered".to_string(),
        user: json!({"email": "ada@example.com"}),
    };
    store.save_json("RegisteredUsers", &registered).unwrap();
    assert_eq!(
        store.load_credential("RegisteredUsers").unwrap().access_token,
        "registered"
    );
    let back: RegisteredUser = store.load_json("RegisteredUsers").unwrap();
    assert_eq!(back, registered);
}

#[test]
fn test_rejects_empty_token_and_bad_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileFixtureStore::new(dir.path());

    store.save("Token", &json!({"token": "  "})).unwrap();
    assert!(matches!(
        store.load_credential("Token"),
        Err(FixtureError::EmptyCredential { .. })
    ));

    assert!(matches!(
        store.save("../outside", &json!(1)),
        Err(FixtureError::InvalidName { .. })
    ));
}

#[test]
fn test_corrupt_fixture_is_a_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Token.json"), "{ not json").unwrap();
    let store = FileFixtureStore::new(dir.path());

    assert!(matches!(
        store.load("Token"),
        Err(FixtureError::Serialization { .. })
    ));
}
