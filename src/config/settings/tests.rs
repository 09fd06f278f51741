use super::*;
use tempfile::TempDir;

#[test]
fn default_config_is_valid() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.embedding.provider, EmbeddingBackend::Ollama);
    assert_eq!(config.embedding.dimension, 768);
    assert_eq!(config.chunking.chunk_size, 800);
    assert_eq!(config.chunking.chunk_overlap, 100);
    assert_eq!(config.search.max_results, 5);
}

#[test]
fn ollama_url_generation() {
    let config = OllamaConfig::default();
    let url = config.ollama_url().expect("should build url");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn ollama_setters_validate_input() {
    let mut config = OllamaConfig {
        protocol: "http".to_string(),
        host: "localhost".to_string(),
        port: 11434,
        model: "test-model".to_string(),
        batch_size: 32,
    };

    assert!(config.set_protocol("https".to_string()).is_ok());
    assert!(config.set_host("example.com".to_string()).is_ok());
    assert!(config.set_port(8080).is_ok());
    assert!(config.set_model("new-model".to_string()).is_ok());
    assert!(config.set_batch_size(128).is_ok());

    assert!(config.set_protocol("ftp".to_string()).is_err());
    assert!(config.set_protocol("HTTP".to_string()).is_err());
    assert!(config.set_port(0).is_err());
    assert!(config.set_model("  ".to_string()).is_err());
    assert!(config.set_batch_size(0).is_err());
    assert!(config.set_batch_size(1001).is_err());

    assert_eq!(config.protocol, "https");
    assert_eq!(config.port, 8080);
}

#[test]
fn overlap_must_be_smaller_than_chunk_size() {
    let mut config = Config::default();
    config.chunking.chunk_size = 100;
    config.chunking.chunk_overlap = 100;

    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge(100, 100))
    ));
}

#[test]
fn rejects_out_of_range_values() {
    let mut config = Config::default();
    config.chunking.chunk_size = 10;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidChunkSize(10))
    ));

    let mut config = Config::default();
    config.embedding.dimension = 4;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidEmbeddingDimension(4))
    ));

    let mut config = Config::default();
    config.search.max_results = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidMaxResults(0))
    ));
}

#[test]
fn load_missing_config_returns_defaults() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let config = Config::load(temp_dir.path()).expect("should load defaults");

    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.ollama, OllamaConfig::default());
    assert_eq!(config.vector_database_path(), temp_dir.path().join("vectors"));
}

#[test]
fn save_then_load_preserves_settings() {
    let temp_dir = TempDir::new().expect("should create temp dir");

    let mut config = Config::load(temp_dir.path()).expect("should load defaults");
    config.embedding.provider = EmbeddingBackend::Hashing;
    config.embedding.dimension = 256;
    config.chunking.chunk_size = 400;
    config.chunking.chunk_overlap = 40;
    config.search.max_results = 8;
    config.save().expect("should save config");

    assert!(config.config_file_path().exists());

    let loaded = Config::load(temp_dir.path()).expect("should reload config");
    assert_eq!(loaded, config);
}

#[test]
fn partial_toml_fills_defaults() {
    let toml_str = r#"
[embedding]
provider = "hashing"

[search]
max_results = 3
"#;

    let config: Config = toml::from_str(toml_str).expect("should parse partial toml");

    assert_eq!(config.embedding.provider, EmbeddingBackend::Hashing);
    assert_eq!(config.embedding.dimension, 768);
    assert_eq!(config.search.max_results, 3);
    assert_eq!(config.chunking, ChunkingConfig::default());
    assert_eq!(config.ollama.port, 11434);
}

#[test]
fn invalid_file_fails_validation_on_load() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    std::fs::write(
        temp_dir.path().join("config.toml"),
        "[chunking]\nchunk_size = 200\nchunk_overlap = 500\n",
    )
    .expect("should write config");

    let err = Config::load(temp_dir.path()).expect_err("overlap larger than size");
    assert!(format!("{err:#}").contains("must be smaller than chunk size"));
}

#[test]
fn unknown_provider_is_a_parse_error() {
    let result: Result<Config, _> = toml::from_str("[embedding]\nprovider = \"openai\"\n");
    assert!(result.is_err());
}
