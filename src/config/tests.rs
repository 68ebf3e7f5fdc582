use std::io::Write;

use serial_test::serial;
use tempfile::NamedTempFile;

use super::*;
use crate::domain::Domain;

fn parse(args: &[&str]) -> CliArgs {
    CliArgs::parse_from(std::iter::once("folio").chain(args.iter().copied()))
}

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.api.base_url.as_str(), DEFAULT_API_BASE_URL);
    assert_eq!(settings.api.timeout, Duration::from_secs(10));
    assert!(settings.api.token.is_none());
    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.stale_time_ms, DEFAULT_CACHE_STALE_TIME_MS);
    assert_eq!(settings.cache.max_entries, DEFAULT_CACHE_MAX_ENTRIES);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("https://file.example/api/".to_string());
    raw.logging.level = Some("info".to_string());
    raw.cache.enabled = Some(true);

    let args = parse(&[
        "--api-base-url",
        "https://cli.example/v1/",
        "--log-level",
        "debug",
        "--no-cache",
        "get",
        "articles",
        "1",
    ]);
    raw.apply_overrides(&args.overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.api.base_url.as_str(), "https://cli.example/v1/");
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert!(!settings.cache.enabled);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn invalid_values_name_their_key() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("loud".to_string());
    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));

    let mut raw = RawSettings::default();
    raw.api.base_url = Some("ftp://example.com".to_string());
    let err = Settings::from_raw(raw).expect_err("bad scheme");
    assert!(matches!(err, LoadError::Invalid { key: "api.base_url", .. }));

    let mut raw = RawSettings::default();
    raw.api.timeout_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(err, LoadError::Invalid { key: "api.timeout_seconds", .. }));

    let mut raw = RawSettings::default();
    raw.cache.max_entries = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero capacity");
    assert!(matches!(err, LoadError::Invalid { key: "cache.max_entries", .. }));
}

#[test]
fn blank_token_is_treated_as_absent() {
    let mut raw = RawSettings::default();
    raw.api.token = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.api.token.is_none());
    assert!(!format!("{:?}", settings.api).contains("   "));
}

#[test]
#[serial]
fn config_file_is_loaded() {
    let mut file = NamedTempFile::with_suffix(".toml").expect("tmp file");
    writeln!(
        file,
        "[api]\nbase_url = \"https://content.example/api/\"\ntoken = \"from-file\"\n\n[cache]\nstale_time_ms = 0\nmax_entries = 12"
    )
    .expect("write config");

    let path = file.path().to_str().expect("utf-8 path");
    let args = parse(&["--config-file", path, "list", "categories"]);
    let settings = load(&args).expect("valid settings");

    assert_eq!(settings.api.base_url.as_str(), "https://content.example/api/");
    assert_eq!(settings.api.token.as_deref(), Some("from-file"));
    assert_eq!(settings.cache.stale_time_ms, 0);
    assert_eq!(settings.cache.max_entries, 12);
}

#[test]
#[serial]
fn missing_config_file_fails() {
    let args = parse(&["--config-file", "/nonexistent/folio.toml", "list", "articles"]);
    assert!(matches!(load(&args), Err(LoadError::Build(_))));
}

#[test]
fn parse_list_arguments() {
    let args = parse(&["list", "categories", "--page", "2", "--limit", "10", "--search", "sea"]);

    match args.command {
        Command::List(list) => {
            assert_eq!(list.domain, Domain::Categories);
            assert_eq!(list.page, Some(2));
            assert_eq!(list.limit, Some(10));
            assert_eq!(list.search.as_deref(), Some("sea"));
            assert!(list.category.is_none());
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
fn parse_update_arguments() {
    let args = parse(&["update", "articles", "42", "--data", "{\"title\":\"New\"}"]);

    match args.command {
        Command::Update(update) => {
            assert_eq!(update.domain, Domain::Articles);
            assert_eq!(update.id, "42");
            assert_eq!(update.payload.data.as_deref(), Some("{\"title\":\"New\"}"));
            assert!(update.payload.data_file.is_none());
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
}

#[test]
fn unknown_domain_is_rejected() {
    let err = CliArgs::try_parse_from(["folio", "get", "comments", "1"]).expect_err("unknown domain");
    assert!(err.to_string().contains("comments"));
}

#[test]
fn conflicting_filters_are_rejected() {
    assert!(
        CliArgs::try_parse_from(["folio", "list", "articles", "--tag", "a", "--author", "b"])
            .is_err()
    );
}
