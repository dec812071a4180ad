use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_bert::pipelines::sentence_embeddings::{
    SentenceEmbeddingsBuilder, SentenceEmbeddingsModel, SentenceEmbeddingsModelType,
};
use tokio::sync::Mutex;

/// 文埋め込みモデルへの非同期インタフェース。
///
/// テストでは決定的な埋め込みを注入できます。
#[async_trait]
pub trait Embedder: Send + Sync {
    /// テキストのバッチを固定長ベクトルに符号化する。
    ///
    /// 返り値は入力と同数・同順でなければならない。
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// rust-bert の文埋め込みパイプラインを用いる符号化サービス。
/// CPUで動作します。
#[derive(Clone)]
pub struct RustBertEmbedder {
    model: Arc<Mutex<SentenceEmbeddingsModel>>,
}

impl std::fmt::Debug for RustBertEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustBertEmbedder")
            .field("model", &"<SentenceEmbeddingsModel>")
            .finish()
    }
}

impl RustBertEmbedder {
    /// 埋め込みモデルを初期化する。
    ///
    /// 初回実行時はモデルのダウンロードに時間がかかることがあります。
    ///
    /// # Errors
    /// モデルの取得・構築に失敗した場合はエラーを返す。
    pub fn new() -> Result<Self> {
        // Model creation is blocking and heavy; keep it off the async runtime.
        let model = std::thread::spawn(|| {
            SentenceEmbeddingsBuilder::remote(SentenceEmbeddingsModelType::AllMiniLmL12V2)
                .create_model()
        })
        .join()
        .map_err(|_| anyhow::anyhow!("failed to join model creation thread"))??;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl Embedder for RustBertEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        let texts = texts.to_vec();

        // Offload to a blocking thread; the model is not Sync.
        tokio::task::spawn_blocking(move || {
            let model = model.blocking_lock();
            model.encode(&texts)
        })
        .await
        .context("failed to join embedding task")?
        .context("failed to encode texts")
    }
}

/// 2つのベクトルのコサイン類似度を計算する。
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
