
use anyhow::Result;
use async_trait::async_trait;

use super::EmbeddingProvider;

pub const DEFAULT_HASHING_DIMENSION: usize = 512;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Offline embedder based on feature hashing.
///
/// Each lowercase alphanumeric word (any script) adds 1.0 to the bucket selected by its
/// FNV-1a hash; words longer than two characters also add their boundary-padded
/// character trigrams at half weight, so partial names still overlap. The
/// vector is L2-normalised. Text with no words maps to the single bucket of its
/// trimmed form, so every input gets a unit vector.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    #[inline]
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        let lowered = text.to_lowercase();

        for word in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(word)] += 1.0;

            let chars: Vec<char> = word.chars().collect();
            if chars.len() > 2 {
                let padded: Vec<char> = std::iter::once('#')
                    .chain(chars)
                    .chain(std::iter::once('#'))
                    .collect();
                for window in padded.windows(3) {
                    let trigram: String = window.iter().collect();
                    vector[self.bucket(&trigram)] += TRIGRAM_WEIGHT;
                }
            }
        }

        // Text without any word still needs a unit vector, or cosine
        // distances against it are undefined.
        if vector.iter().all(|v| *v == 0.0) {
            vector[self.bucket(lowered.trim())] = 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        for value in &mut vector {
            *value /= norm;
        }
        vector
    }

    fn bucket(&self, feature: &str) -> usize {
        (fnv1a(feature.as_bytes()) % self.dimension as u64) as usize
    }
}

impl Default for HashingEmbedder {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    #[inline]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    #[inline]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    #[inline]
    fn model_name(&self) -> &str {
        "feature-hashing"
    }

    #[inline]
    fn dimensions(&self) -> usize {
        self.dimension
    }
}
