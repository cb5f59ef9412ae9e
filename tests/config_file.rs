use canvas_cli::commands::Session;
use canvas_cli::config::Config;

#[test]
fn missing_config_is_created_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".canvas");

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config, Config::default());
    assert!(path.exists());

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("\n    \"api_url\": \"https://your-institution.instructure.com\""));
    assert!(written.contains("\"current_course_id\": null"));
}

#[test]
fn corrupt_config_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".canvas");
    std::fs::write(&path, "{ not json").unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config, Config::default());
    let reread: Config = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(reread, Config::default());
}

#[test]
fn mistyped_config_is_an_error_and_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".canvas");
    let original =
        r#"{"api_url":"https://my.school.edu","api_key":"real-token","current_course_id":"17"}"#;
    std::fs::write(&path, original).unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(err.to_string().contains(&path.display().to_string()));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn config_missing_a_key_is_an_error_and_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".canvas");
    let original = r#"{"api_url": "https://my.school.edu", "current_course_id": 17}"#;
    std::fs::write(&path, original).unwrap();

    assert!(Config::load_from(&path).is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
}

#[test]
fn unreadable_config_path_is_not_overwritten() {
    // A directory where the file should be cannot be read as text.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".canvas");
    std::fs::create_dir(&path).unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
    assert!(path.is_dir());
}

#[test]
fn saved_config_is_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".canvas");
    let config = Config {
        api_url: "https://school.instructure.com".into(),
        api_key: "secret-token-value".into(),
        current_course_id: Some(4242),
    };
    config.save_to(&path).unwrap();

    let session = Session::load_from(path).unwrap();
    assert_eq!(session.config(), &config);
    assert_eq!(session.config().require_course().unwrap(), 4242);
}

#[test]
fn reads_config_written_by_earlier_versions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".canvas");
    std::fs::write(
        &path,
        r#"{"api_url": "https://a.test", "api_key": "k", "current_course_id": 17}"#,
    )
    .unwrap();
    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.current_course_id, Some(17));
}
