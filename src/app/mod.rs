// Application wiring
// Builds the embedding provider, both indices, the coordinator and the indexer from a Config

#[cfg(test)]
mod tests;

use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::database::{LanceCatalogIndex, LanceContentIndex, VectorDatabase};
use crate::embeddings::{EmbeddingProvider, build_provider};
use crate::indexer::Indexer;
use crate::retrieval::RetrievalCoordinator;
use crate::tools::{CourseOutlineTool, CourseSearchTool, ToolRegistry};
use crate::{RagError, Result};

pub struct App {
    config: Config,
    catalog: Arc<LanceCatalogIndex>,
    content: Arc<LanceContentIndex>,
    coordinator: Arc<RetrievalCoordinator>,
    indexer: Indexer,
}

impl App {
    /// Open the stores under `config.vector_database_path()` with the
    /// configured embedding provider
    #[inline]
    pub async fn open(config: Config) -> Result<Self> {
        config
            .validate()
            .map_err(|e| RagError::Config(e.to_string()))?;
        let provider = build_provider(&config)?;
        Self::with_provider(config, provider).await
    }

    pub async fn with_provider(
        config: Config,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        info!(
            "Opening course stores with {} ({} dimensions)",
            provider.model_name(),
            provider.dimensions()
        );

        let database = VectorDatabase::open(&config.vector_database_path()).await?;
        let catalog =
            Arc::new(LanceCatalogIndex::open(database.clone(), provider.clone()).await?);
        let content = Arc::new(LanceContentIndex::open(database, provider).await?);

        let coordinator = Arc::new(RetrievalCoordinator::new(
            catalog.clone(),
            content.clone(),
            config.search.max_results,
        ));
        let indexer = Indexer::new(catalog.clone(), content.clone(), config.chunking.clone());

        Ok(Self {
            config,
            catalog,
            content,
            coordinator,
            indexer,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn catalog(&self) -> Arc<LanceCatalogIndex> {
        self.catalog.clone()
    }

    #[inline]
    pub fn content(&self) -> Arc<LanceContentIndex> {
        self.content.clone()
    }

    #[inline]
    pub fn coordinator(&self) -> Arc<RetrievalCoordinator> {
        self.coordinator.clone()
    }

    #[inline]
    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    /// A fresh registry with the course tools. Each conversation should own
    /// one, since the registry keeps the sources of its last execution.
    #[inline]
    pub fn tool_registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(CourseSearchTool::new(self.coordinator())));
        registry.register(Arc::new(CourseOutlineTool::new(self.coordinator())));
        registry
    }
}
