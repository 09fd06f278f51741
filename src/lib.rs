use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Document parse error: {0}")]
    DocumentParse(String),

    #[error("No courses have been indexed")]
    NoCoursesIndexed,

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod app;
pub mod commands;
pub mod config;
pub mod course;
pub mod database;
pub mod embeddings;
pub mod indexer;
pub mod retrieval;
pub mod tools;

pub use app::App;
