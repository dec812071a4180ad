use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::clients::parser::{CaptionParser, HttpParserClient, ParserConfig};
use crate::config::Config;
use crate::corpus::captions::CaptionStore;
use crate::corpus::clip_filename;
use crate::corpus::ground_truth::GroundTruthSet;
use crate::corpus::predictions::PredictionTable;
use crate::evaluation::report::{self, ClipReport};
use crate::evaluation::sweep::{self, ClipPhrases, EvaluationClip, EvaluationRecord, SweepGrid};
use crate::observability;
use crate::pipeline::boost::{BoostParams, ConfidenceBooster};
use crate::pipeline::embedding::{Embedder, RustBertEmbedder};
use crate::pipeline::phrase::extract_phrases;
use crate::pipeline::semantic::SemanticScorer;
use crate::util::text::{normalize_text, split_sentences};

/// 設定と外部コラボレータをまとめた共有レジストリ。
pub struct ComponentRegistry {
    config: Arc<Config>,
    parser: Arc<dyn CaptionParser>,
    embedder: Arc<dyn Embedder>,
}

impl ComponentRegistry {
    /// 構成情報と依存をまとめて初期化し、共有レジストリを構築する。
    ///
    /// # Errors
    /// Telemetry の初期化、解析クライアントの構築、または埋め込みモデルの
    /// 初期化が失敗した場合はエラーを返す。
    pub fn build(config: Config) -> Result<Self> {
        observability::init()?;
        let parser = Arc::new(HttpParserClient::new(&ParserConfig {
            base_url: config.parser_base_url().to_string(),
            connect_timeout: config.parser_connect_timeout(),
            total_timeout: config.parser_total_timeout(),
            service_token: config.parser_service_token().map(ToString::to_string),
        })?);
        let embedder =
            Arc::new(RustBertEmbedder::new().context("failed to initialize embedding model")?);
        Ok(Self {
            config: Arc::new(config),
            parser,
            embedder,
        })
    }

    /// コラボレータを注入してレジストリを構築する。テストと検分用。
    #[must_use]
    pub fn with_components(
        config: Config,
        parser: Arc<dyn CaptionParser>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            parser,
            embedder,
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn parser(&self) -> Arc<dyn CaptionParser> {
        Arc::clone(&self.parser)
    }

    #[must_use]
    pub fn embedder(&self) -> Arc<dyn Embedder> {
        Arc::clone(&self.embedder)
    }
}

/// スイープ実行の本体。
///
/// コーパスを読み込み、フレーズを抽出し、キャッシュを温めてから
/// グリッドをスイープし、結果をCSVレポートに書き出す。
///
/// # Errors
/// コーパスの読み込み、解析、符号化、またはレポート出力に失敗した
/// 場合はエラーを返す。
pub async fn run(registry: &ComponentRegistry) -> Result<Vec<EvaluationRecord>> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let config = registry.config();
    info!(%run_id, "starting boost sweep run");

    let captions = CaptionStore::load(config.captions_path())?;
    let predictions = PredictionTable::load(config.predictions_path())?;
    let ground_truth = GroundTruthSet::load(config.ground_truth_path())?;
    info!(
        caption_clips = captions.len(),
        prediction_rows = predictions.len(),
        ground_truth_clips = ground_truth.len(),
        "corpora loaded"
    );

    let clip_phrases = extract_clip_phrases(registry, &captions).await?;
    let (clips, skips) = sweep::align(clip_phrases, &predictions, &ground_truth);
    info!(
        usable_clips = clips.len(),
        missing_predictions = skips.missing_predictions,
        missing_ground_truth = skips.missing_ground_truth,
        empty_ground_truth = skips.empty_ground_truth,
        "aligned corpora"
    );

    let mut scorer = SemanticScorer::new(registry.embedder());
    let vocabulary = collect_vocabulary(&clips);
    let warmed = scorer.warm(&vocabulary).await?;
    info!(warmed, "embedding cache warmed");

    let booster = ConfidenceBooster::new(config.boost_strategy());
    let grid = SweepGrid {
        alphas: config.alphas().to_vec(),
        confidence_thresholds: config.confidence_thresholds().to_vec(),
        similarity_thresholds: config.similarity_thresholds().to_vec(),
    };
    let records = sweep::run_sweep(&mut scorer, &booster, &clips, &grid).await?;

    report::write_csv(config.report_path(), &records)?;
    println!("{}", report::render_summary_table(&records));

    let stats = scorer.stats();
    info!(
        %run_id,
        elapsed_ms = (Utc::now() - started_at).num_milliseconds(),
        records = records.len(),
        cache_entries = stats.entries,
        cache_hits = stats.hits,
        cache_misses = stats.misses,
        "boost sweep run complete"
    );
    Ok(records)
}

/// 1クリップを検分し、ブースト結果の詳細レポートを返す。
///
/// # Errors
/// クリップのキャプションまたは予測行が見つからない場合、および
/// 解析・符号化に失敗した場合はエラーを返す。
pub async fn inspect_clip(
    registry: &ComponentRegistry,
    clip: &str,
    alpha: f32,
    similarity_threshold: f32,
) -> Result<ClipReport> {
    let config = registry.config();

    let captions = CaptionStore::load(config.captions_path())?;
    let predictions = PredictionTable::load(config.predictions_path())?;
    let ground_truth = GroundTruthSet::load(config.ground_truth_path())?;

    let filename = clip_filename(clip);
    let clip_id = filename.trim_end_matches(".wav");
    let document = captions
        .get(clip_id)
        .or_else(|| captions.get(&filename))
        .with_context(|| format!("no captions for clip {filename}"))?;
    let tags = predictions
        .tags(&filename)
        .with_context(|| format!("no prediction row for clip {filename}"))?;
    let labels = ground_truth.labels(&filename).cloned().unwrap_or_default();

    let selected = document.select(config.caption_sources());
    let num_captions = selected.len();
    let sentences = sentences_of(&selected);
    let parsed = registry.parser().parse(&sentences).await?;
    let phrases = extract_phrases(&parsed, config.extractor_mode());

    let mut scorer = SemanticScorer::new(registry.embedder());
    let booster = ConfidenceBooster::new(config.boost_strategy());
    let params = BoostParams {
        alpha,
        sim_threshold: similarity_threshold,
    };
    let results = booster
        .boost(&mut scorer, tags, &phrases, num_captions, &params)
        .await?;

    Ok(ClipReport::new(
        filename,
        alpha,
        similarity_threshold,
        num_captions,
        results,
        labels,
    ))
}

async fn extract_clip_phrases(
    registry: &ComponentRegistry,
    captions: &CaptionStore,
) -> Result<Vec<ClipPhrases>> {
    let config = registry.config();
    let parser = registry.parser();
    let mut clip_phrases = Vec::with_capacity(captions.len());
    for (clip_id, document) in captions.iter() {
        let selected = document.select(config.caption_sources());
        let num_captions = selected.len();
        let sentences = sentences_of(&selected);
        let parsed = parser
            .parse(&sentences)
            .await
            .with_context(|| format!("failed to parse captions for clip {clip_id}"))?;
        let phrases = extract_phrases(&parsed, config.extractor_mode());
        clip_phrases.push(ClipPhrases {
            clip_id: clip_id.clone(),
            phrases,
            num_captions,
        });
    }
    Ok(clip_phrases)
}

fn sentences_of(captions: &[&str]) -> Vec<String> {
    captions
        .iter()
        .flat_map(|caption| split_sentences(&normalize_text(caption)))
        .collect()
}

/// スイープ対象クリップのフレーズとタグ名の語彙を重複なく集める。
fn collect_vocabulary(clips: &[EvaluationClip]) -> Vec<String> {
    let mut vocabulary = BTreeSet::new();
    for clip in clips {
        vocabulary.extend(clip.phrases.iter().cloned());
        vocabulary.extend(clip.tags.iter().map(|tag| tag.label.clone()));
    }
    vocabulary.into_iter().collect()
}
