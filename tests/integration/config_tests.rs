use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use filesift::actions::{CollisionPolicy, DeleteMethod};
use filesift::config::{Config, ConfigError};
use filesift::output::ReportFormat;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_defaults_when_file_is_empty() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "").unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();

    assert_eq!(config, Config::default());
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
io_threads = 2
copy_dir_name = "gathered"
collision_policy = "overwrite"
delete_method = "trash"
default_format = "html"
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert_eq!(config.io_threads, 2);
    assert_eq!(config.copy_dir_name, "gathered");
    assert_eq!(config.collision_policy, CollisionPolicy::Overwrite);
    assert_eq!(config.delete_method, DeleteMethod::Trash);
    assert_eq!(config.default_format, ReportFormat::Html);
    // untouched keys keep their defaults
    assert_eq!(config.report_basename, "file_search_results");
}

#[test]
fn test_env_overrides_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "report_basename = \"from_file\"\n").unwrap();

    std::env::set_var("FILESIFT_TEST_ENV_REPORT_BASENAME", "from_env");
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .merge(Env::prefixed("FILESIFT_TEST_ENV_").split("__"))
        .extract()
        .unwrap();
    std::env::remove_var("FILESIFT_TEST_ENV_REPORT_BASENAME");

    assert_eq!(config.report_basename, "from_env");
}

#[test]
fn test_load_reads_filesift_environment() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "hash_buffer_size = 4096\n").unwrap();

    std::env::set_var("FILESIFT_FOLLOW_SYMLINKS", "true");
    let config = Config::load(Some(&config_path));
    std::env::remove_var("FILESIFT_FOLLOW_SYMLINKS");

    let config = config.unwrap();
    assert!(config.follow_symlinks);
    assert_eq!(config.hash_buffer_size, 4096);
}

#[test]
fn test_invalid_toml_is_rejected() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "io_threads = \"many\"\n").unwrap();

    let err = Config::load(Some(&config_path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_unknown_enum_value_is_rejected() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "default_format = \"pdf\"\n").unwrap();

    assert!(Config::load(Some(&config_path)).is_err());
}

#[test]
fn test_saved_config_is_valid_toml() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("nested/dir/config.toml");

    Config::default().save(&config_path).unwrap();

    let text = fs::read_to_string(&config_path).unwrap();
    let parsed: toml::Value = toml::from_str(&text).unwrap();
    assert_eq!(parsed["io_threads"].as_integer(), Some(4));
    assert_eq!(parsed["collision_policy"].as_str(), Some("rename"));
    let reloaded: Config = Figment::from(Toml::file(&config_path)).extract().unwrap();
    assert_eq!(reloaded, Config::default());
}
