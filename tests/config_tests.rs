use serial_test::serial;
use std::env;
use std::fs;
use std::io::Write;
use taskflow::config::{data_dir, open_log_file, Config, Settings, DATA_DIR_ENV, DEFAULT_USER, LOG_FILE, USER_ENV};
use taskflow::layout::WeekStart;
use taskflow::models::Priority;

/// Points the data directory at a fresh temp dir and clears the user variable.
fn with_test_env<F>(f: F)
where
    F: FnOnce(&std::path::Path),
{
    let dir = tempfile::tempdir().unwrap();
    env::set_var(DATA_DIR_ENV, dir.path());
    env::remove_var(USER_ENV);

    f(dir.path());

    env::remove_var(DATA_DIR_ENV);
    env::remove_var(USER_ENV);
}

#[test]
#[serial]
fn test_data_dir_from_env() {
    with_test_env(|dir| {
        assert_eq!(data_dir(), dir);
    });
}

#[test]
#[serial]
fn test_user_resolution_order() {
    with_test_env(|dir| {
        assert_eq!(Config::load(None).user_id, DEFAULT_USER);

        let settings = Settings { default_user: Some("from_settings".into()), ..Settings::default() };
        settings.save(dir).unwrap();
        assert_eq!(Config::load(None).user_id, "from_settings");

        env::set_var(USER_ENV, "from_env");
        assert_eq!(Config::load(None).user_id, "from_env");

        assert_eq!(Config::load(Some("from_flag".into())).user_id, "from_flag");
    });
}

#[test]
#[serial]
fn test_blank_user_falls_back_to_default() {
    with_test_env(|_| {
        assert_eq!(Config::load(Some("   ".into())).user_id, DEFAULT_USER);
    });
}

#[test]
fn test_settings_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        default_user: None,
        default_priority: Priority::High,
        calendar_week_start: WeekStart::Monday,
        timeline_zoom: 2.0,
    };
    settings.save(dir.path()).unwrap();
    assert_eq!(Settings::load(dir.path()), settings);

    let raw = fs::read_to_string(dir.path().join("settings.json")).unwrap();
    assert!(raw.contains("\"calendar_week_start\": \"monday\""));
}

#[test]
fn test_settings_missing_fields_and_corruption() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(Settings::load(dir.path()), Settings::default());

    fs::write(dir.path().join("settings.json"), r#"{"default_priority": "low"}"#).unwrap();
    let partial = Settings::load(dir.path());
    assert_eq!(partial.default_priority, Priority::Low);
    assert_eq!(partial.calendar_week_start, WeekStart::Sunday);
    assert_eq!(partial.timeline_zoom, 1.0);

    fs::write(dir.path().join("settings.json"), "not json").unwrap();
    assert_eq!(Settings::load(dir.path()), Settings::default());
}

#[test]
fn test_log_file_is_created_and_appended() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("data");

    writeln!(open_log_file(&nested).unwrap(), "first").unwrap();
    writeln!(open_log_file(&nested).unwrap(), "second").unwrap();

    let contents = fs::read_to_string(nested.join(LOG_FILE)).unwrap();
    assert_eq!(contents, "first\nsecond\n");
}
