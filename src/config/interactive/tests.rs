use super::load_existing_config;
use crate::config::EmbeddingBackend;
use tempfile::TempDir;

#[test]
fn load_existing_config_defaults_when_missing() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = load_existing_config(temp_dir.path()).expect("config loaded successfully");
    assert_eq!(config.base_dir, temp_dir.path());
    assert!(!config.ollama.model.is_empty());
    assert!(config.ollama.batch_size > 0);
}

#[test]
fn load_existing_config_reads_saved_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[embedding]\nprovider = \"hashing\"\ndimension = 128\n",
    )
    .expect("should write config");

    let config = load_existing_config(temp_dir.path()).expect("config loaded successfully");
    assert_eq!(config.embedding.provider, EmbeddingBackend::Hashing);
    assert_eq!(config.embedding.dimension, 128);
}
