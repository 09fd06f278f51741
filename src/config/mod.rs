// Configuration management: TOML settings under the per-user directory

pub mod interactive;
pub mod settings;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, EmbeddingBackend, EmbeddingConfig, OllamaConfig, SearchConfig,
};
