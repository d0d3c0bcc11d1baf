use crate::config::{AppConfig, FileConfig, load_project_config};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_project_config() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let qna_dir = root.join(".qna");
    fs::create_dir_all(&qna_dir).unwrap();

    let config_content = r#"
model = "gpt-4o"
temperature = 0.3
max_tokens = 256

[llm]
timeout_secs = 10
max_attempts = 5
"#;
    fs::write(qna_dir.join("config.toml"), config_content).unwrap();

    let file_cfg = load_project_config(root).unwrap();
    assert_eq!(file_cfg.model, Some("gpt-4o".to_string()));
    assert_eq!(file_cfg.temperature, Some(0.3));
    assert_eq!(file_cfg.max_tokens, Some(256));

    let llm = file_cfg.llm.clone().unwrap();
    assert_eq!(llm.timeout_secs, Some(10));
    assert_eq!(llm.max_attempts, Some(5));
    assert_eq!(llm.initial_backoff_secs, None);

    let mut cfg = AppConfig::default();
    cfg.apply_file(file_cfg);
    assert_eq!(cfg.model, "gpt-4o");
    assert_eq!(cfg.max_tokens, 256);
    assert_eq!(cfg.llm.timeout_secs, 10);
    assert_eq!(cfg.llm.max_attempts, 5);
    // Untouched fields keep their defaults.
    assert_eq!(cfg.llm.initial_backoff_secs, 1);
    assert_eq!(cfg.base_url, "https://api.openai.com/v1");
    cfg.validate().unwrap();
}

#[test]
fn test_file_log_level_survives_into_app_config() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    let qna_dir = root.join(".qna");
    fs::create_dir_all(&qna_dir).unwrap();
    fs::write(qna_dir.join("config.toml"), "log_level = \"debug\"\n").unwrap();

    let file_cfg = load_project_config(root).unwrap();
    assert_eq!(file_cfg.log_level, Some("debug".to_string()));

    let mut cfg = AppConfig::default();
    cfg.apply_file(file_cfg);
    assert_eq!(cfg.log_level, "debug");
}

#[test]
fn test_load_project_config_not_exists() {
    let temp_dir = TempDir::new().unwrap();
    let file_cfg = load_project_config(temp_dir.path()).unwrap();
    assert_eq!(file_cfg, FileConfig::default());
}

#[test]
fn test_validate_rejects_out_of_range_values() {
    let mut cfg = AppConfig {
        model: "gpt-5-nano".to_string(),
        ..AppConfig::default()
    };
    assert!(cfg.validate().is_err());

    cfg.model = "gpt-4o".to_string();
    cfg.temperature = 1.5;
    assert!(cfg.validate().is_err());

    cfg.temperature = 0.7;
    cfg.max_tokens = 0;
    assert!(cfg.validate().is_err());

    cfg.max_tokens = 150;
    cfg.llm.timeout_secs = 0;
    assert!(cfg.validate().is_err());

    cfg.llm.timeout_secs = 30;
    cfg.validate().unwrap();
}
