//! In-memory template index
//!
//! Flat nearest-neighbour search over trigger embeddings. Distances are
//! squared Euclidean over unit vectors, so a similarity of
//! `1 / (1 + distance)` is 1.0 for an identical trigger and 1/3 for an
//! orthogonal one.

use kiosk_agent_config::constants::semantic;
use kiosk_agent_config::SemanticConfig;
use kiosk_agent_core::{ResponseTemplate, SemanticResponseMatcher, TemplateKind};
use parking_lot::RwLock;
use rand::seq::SliceRandom;

use crate::embeddings::{squared_l2, EmbeddingConfig, HashEmbedder};
use crate::templates::TemplateFile;
use crate::Result;

/// Index configuration
#[derive(Debug, Clone)]
pub struct TemplateIndexConfig {
    /// Minimum `1 / (1 + distance)` for a hit
    pub similarity_threshold: f32,
    /// Nearest neighbours considered per query
    pub top_k: usize,
    pub embedding_dim: usize,
}

impl Default for TemplateIndexConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: semantic::SIMILARITY_THRESHOLD,
            top_k: semantic::TOP_K,
            embedding_dim: semantic::EMBEDDING_DIM,
        }
    }
}

impl From<&SemanticConfig> for TemplateIndexConfig {
    fn from(config: &SemanticConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            top_k: config.top_k,
            embedding_dim: config.embedding_dim,
        }
    }
}

struct IndexedTemplate {
    template: ResponseTemplate,
    vector: Vec<f32>,
}

/// Template index implementing [`SemanticResponseMatcher`]
pub struct TemplateIndex {
    config: TemplateIndexConfig,
    embedder: HashEmbedder,
    entries: RwLock<Vec<IndexedTemplate>>,
}

impl TemplateIndex {
    pub fn new(config: TemplateIndexConfig) -> Self {
        let embedder = HashEmbedder::new(EmbeddingConfig {
            embedding_dim: config.embedding_dim,
            normalize: true,
        });
        Self {
            config,
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Index with the bundled templates
    pub fn bundled() -> Result<Self> {
        let index = Self::new(TemplateIndexConfig::default());
        index.insert(TemplateFile::bundled()?.templates);
        Ok(index)
    }

    /// Build from settings: the configured template file, else the bundled set
    pub fn from_settings(config: &SemanticConfig) -> Result<Self> {
        let file = TemplateFile::from_path_or_bundled(config.templates_path.as_deref())?;
        let index = Self::new(TemplateIndexConfig::from(config));
        index.insert(file.templates);
        Ok(index)
    }

    /// Embed and add templates
    pub fn insert(&self, templates: Vec<ResponseTemplate>) {
        let indexed: Vec<IndexedTemplate> = templates
            .into_iter()
            .map(|template| IndexedTemplate {
                vector: self.embedder.embed(&template.trigger),
                template,
            })
            .collect();

        let mut entries = self.entries.write();
        entries.extend(indexed);
        tracing::debug!(templates = entries.len(), "Template index updated");
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl SemanticResponseMatcher for TemplateIndex {
    fn find_similar(&self, text: &str, kind: Option<TemplateKind>) -> Option<ResponseTemplate> {
        let query = self.embedder.embed(text);
        let entries = self.entries.read();

        let mut neighbours: Vec<(usize, f32)> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, squared_l2(&query, &entry.vector)))
            .collect();
        neighbours.sort_by(|a, b| a.1.total_cmp(&b.1));
        neighbours.truncate(self.config.top_k);

        // The type filter applies to the nearest neighbours only
        let (index, distance) = neighbours.into_iter().find(|&(i, distance)| {
            let score = 1.0 / (1.0 + distance);
            kind.map_or(true, |k| entries[i].template.kind == k)
                && score >= self.config.similarity_threshold
        })?;

        let score = 1.0 / (1.0 + distance);
        tracing::debug!(
            trigger = %entries[index].template.trigger,
            kind = %entries[index].template.kind,
            score,
            "Similar template found"
        );
        Some(ResponseTemplate {
            score: Some(score),
            ..entries[index].template.clone()
        })
    }

    fn random_by_type(&self, kind: TemplateKind) -> Option<ResponseTemplate> {
        let entries = self.entries.read();
        let matching: Vec<&IndexedTemplate> =
            entries.iter().filter(|e| e.template.kind == kind).collect();
        matching
            .choose(&mut rand::thread_rng())
            .map(|entry| entry.template.clone())
    }
}
