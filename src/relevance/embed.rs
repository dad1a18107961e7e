use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("nothing to embed: text has no words")]
    EmptyInput,

    #[error("embedding backend failed: {0}")]
    Backend(String),
}

/// Turns text into a fixed-dimension vector. Embedding is local and
/// CPU-bound, so the trait is synchronous.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Pairwise similarity in `[0, 1]`.
    fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b).clamp(0.0, 1.0)
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

const DEFAULT_DIMENSIONS: usize = 384;

/// Feature-hashed bag of lower-cased words, L2-normalized. Deterministic and
/// dependency-free; a stand-in for a learned sentence model.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0.0_f32; self.dimensions];
        let mut words = 0;
        for word in text.unicode_words() {
            let hash = fnv1a(word.to_lowercase().as_bytes());
            let slot = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[slot] += sign;
            words += 1;
        }
        if words == 0 {
            return Err(EmbedError::EmptyInput);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(vector)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_similarity_one() {
        let e = HashingEmbedder::default();
        let a = e.embed("The election results were certified").unwrap();
        let b = e.embed("the ELECTION results were certified").unwrap();
        assert!((e.similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn unrelated_text_scores_lower_than_overlapping_text() {
        let e = HashingEmbedder::default();
        let q = e.embed("Will the senate pass the budget bill").unwrap();
        let close = e.embed("The senate is expected to pass the budget bill").unwrap();
        let far = e.embed("Recipes for sourdough bread and pastry").unwrap();
        assert!(e.similarity(&q, &close) > e.similarity(&q, &far));
    }

    #[test]
    fn similarity_is_clamped_to_unit_interval() {
        let e = HashingEmbedder::default();
        assert_eq!(e.similarity(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
        assert_eq!(e.similarity(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn text_without_words_is_rejected() {
        let e = HashingEmbedder::default();
        assert!(matches!(e.embed(" ... "), Err(EmbedError::EmptyInput)));
    }

    #[test]
    fn embedding_has_configured_dimension() {
        let e = HashingEmbedder::new(16);
        assert_eq!(e.embed("one two three").unwrap().len(), 16);
    }
}
