//! 埋め込みキャッシュ付きの意味的類似度スコアラ。

use std::sync::Arc;

use anyhow::{Result, bail};
use rustc_hash::FxHashMap;
use tracing::debug;

use super::embedding::{Embedder, cosine_similarity};

/// キャッシュの利用統計。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// 文字列の完全一致をキーとする埋め込みキャッシュを所有するスコアラ。
///
/// キャッシュは1回の実行の間だけ生存し、退避も永続化もしません。
/// キーの正規化は行わないため、大文字小文字の扱いは呼び出し側の責務です。
pub struct SemanticScorer {
    embedder: Arc<dyn Embedder>,
    cache: FxHashMap<String, Arc<Vec<f32>>>,
    hits: u64,
    misses: u64,
}

impl std::fmt::Debug for SemanticScorer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticScorer")
            .field("entries", &self.cache.len())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}

impl SemanticScorer {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            cache: FxHashMap::default(),
            hits: 0,
            misses: 0,
        }
    }

    /// 未キャッシュの文字列をまとめて符号化し、新規登録数を返す。
    ///
    /// グリッドスイープの前に呼ぶことで、スイープ中のモデル呼び出しを
    /// ゼロにできます。
    ///
    /// # Errors
    /// 符号化に失敗した場合、または符号化結果の数が入力と一致しない
    /// 場合はエラーを返す。
    pub async fn warm(&mut self, texts: &[String]) -> Result<usize> {
        let mut pending: Vec<String> = Vec::new();
        for text in texts {
            if !self.cache.contains_key(text) && !pending.contains(text) {
                pending.push(text.clone());
            }
        }
        if pending.is_empty() {
            return Ok(0);
        }

        let embeddings = self.embedder.encode(&pending).await?;
        if embeddings.len() != pending.len() {
            bail!(
                "embedder returned {} vectors for {} texts",
                embeddings.len(),
                pending.len()
            );
        }

        let count = pending.len();
        for (text, embedding) in pending.into_iter().zip(embeddings) {
            self.cache.insert(text, Arc::new(embedding));
        }
        self.misses += count as u64;
        debug!(encoded = count, entries = self.cache.len(), "warmed embedding cache");
        Ok(count)
    }

    /// テキストの埋め込みを返す。初見の文字列のみモデルを呼び出す。
    ///
    /// # Errors
    /// 符号化に失敗した場合はエラーを返す。
    pub async fn embedding(&mut self, text: &str) -> Result<Arc<Vec<f32>>> {
        if let Some(cached) = self.cache.get(text) {
            self.hits += 1;
            return Ok(Arc::clone(cached));
        }

        let mut embeddings = self.embedder.encode(&[text.to_string()]).await?;
        let Some(embedding) = embeddings.pop() else {
            bail!("embedder returned no vector for input text");
        };
        let embedding = Arc::new(embedding);
        self.cache.insert(text.to_string(), Arc::clone(&embedding));
        self.misses += 1;
        Ok(embedding)
    }

    /// 2つのテキストのコサイン類似度を返す。
    ///
    /// # Errors
    /// いずれかの符号化に失敗した場合はエラーを返す。
    pub async fn similarity(&mut self, text1: &str, text2: &str) -> Result<f32> {
        let first = self.embedding(text1).await?;
        let second = self.embedding(text2).await?;
        Ok(cosine_similarity(&first, &second))
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// 既知の語を固定ベクトルに割り当てる決定的エンベッダ。
    struct StaticEmbedder;

    fn vector_for(text: &str) -> Result<Vec<f32>> {
        match text {
            "speech" => Ok(vec![1.0, 0.0, 0.0]),
            "music" => Ok(vec![0.0, 1.0, 0.0]),
            "man talking" => Ok(vec![0.8, 0.6, 0.0]),
            other => bail!("no static embedding for {other}"),
        }
    }

    #[async_trait]
    impl Embedder for StaticEmbedder {
        async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            texts.iter().map(|text| vector_for(text)).collect()
        }
    }

    fn scorer() -> SemanticScorer {
        SemanticScorer::new(Arc::new(StaticEmbedder))
    }

    #[tokio::test]
    async fn identical_texts_have_unit_similarity() {
        let mut scorer = scorer();
        let sim = scorer.similarity("speech", "speech").await.expect("similarity");
        assert!((sim - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn orthogonal_texts_have_zero_similarity() {
        let mut scorer = scorer();
        let sim = scorer.similarity("speech", "music").await.expect("similarity");
        assert!(sim.abs() < 1e-6);
    }

    #[tokio::test]
    async fn repeated_lookups_hit_the_cache() {
        let mut scorer = scorer();
        scorer.similarity("speech", "music").await.expect("similarity");
        let after_first = scorer.stats();
        assert_eq!(after_first.misses, 2);

        scorer.similarity("speech", "music").await.expect("similarity");
        let after_second = scorer.stats();
        assert_eq!(after_second.misses, 2);
        assert_eq!(after_second.hits, after_first.hits + 2);
        assert_eq!(after_second.entries, 2);
    }

    #[tokio::test]
    async fn warm_encodes_each_distinct_text_once() {
        let mut scorer = scorer();
        let texts = vec![
            "speech".to_string(),
            "music".to_string(),
            "speech".to_string(),
        ];
        let encoded = scorer.warm(&texts).await.expect("warm");
        assert_eq!(encoded, 2);

        let again = scorer.warm(&texts).await.expect("warm");
        assert_eq!(again, 0);
        assert_eq!(scorer.stats().entries, 2);
    }

    #[tokio::test]
    async fn cache_keys_are_exact_strings() {
        let mut scorer = scorer();
        scorer.embedding("speech").await.expect("embedding");
        // "Speech" is a distinct key and the static embedder rejects it.
        let error = scorer.embedding("Speech").await;
        assert!(error.is_err());
    }

    #[tokio::test]
    async fn encode_failure_propagates() {
        let mut scorer = scorer();
        assert!(scorer.similarity("speech", "unknown word").await.is_err());
    }
}
