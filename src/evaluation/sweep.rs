//! パラメータグリッドのスイープ評価ドライバ。

use std::collections::{BTreeSet, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::corpus::clip_filename;
use crate::corpus::ground_truth::GroundTruthSet;
use crate::corpus::predictions::PredictionTable;
use crate::evaluation::metrics::{MeanAccumulator, SetMetrics, score_prediction};
use crate::pipeline::boost::{AudioTag, BoostParams, BoostResult, ConfidenceBooster};
use crate::pipeline::semantic::SemanticScorer;

/// フレーズ抽出済みの1クリップ。結合前の中間表現。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipPhrases {
    pub clip_id: String,
    pub phrases: BTreeSet<String>,
    pub num_captions: usize,
}

/// 予測・正解と結合済みの評価対象クリップ。
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationClip {
    pub clip_id: String,
    pub filename: String,
    pub tags: Vec<AudioTag>,
    pub phrases: BTreeSet<String>,
    pub num_captions: usize,
    pub ground_truth: HashSet<String>,
}

/// クリップをスキップした理由。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingPredictions,
    MissingGroundTruth,
    EmptyGroundTruth,
}

impl SkipReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingPredictions => "missing_predictions",
            Self::MissingGroundTruth => "missing_ground_truth",
            Self::EmptyGroundTruth => "empty_ground_truth",
        }
    }
}

/// スキップ理由別の件数集計。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipTally {
    pub missing_predictions: usize,
    pub missing_ground_truth: usize,
    pub empty_ground_truth: usize,
}

impl SkipTally {
    pub fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MissingPredictions => self.missing_predictions += 1,
            SkipReason::MissingGroundTruth => self.missing_ground_truth += 1,
            SkipReason::EmptyGroundTruth => self.empty_ground_truth += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.missing_predictions + self.missing_ground_truth + self.empty_ground_truth
    }
}

/// スイープ対象のパラメータグリッド。
#[derive(Debug, Clone, PartialEq)]
pub struct SweepGrid {
    pub alphas: Vec<f32>,
    pub confidence_thresholds: Vec<f32>,
    pub similarity_thresholds: Vec<f32>,
}

impl SweepGrid {
    /// 設定リストの直積を固定順（α → 信頼度閾値 → 類似度閾値）で返す。
    #[must_use]
    pub fn combinations(&self) -> Vec<(f32, f32, f32)> {
        let mut combinations = Vec::new();
        for &alpha in &self.alphas {
            for &confidence_threshold in &self.confidence_thresholds {
                for &similarity_threshold in &self.similarity_thresholds {
                    combinations.push((alpha, confidence_threshold, similarity_threshold));
                }
            }
        }
        combinations
    }
}

/// 1パラメータ組み合わせの集計結果。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub alpha: f32,
    pub confidence_threshold: f32,
    pub similarity_threshold: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub clip_count: usize,
}

/// 1クリップ×1組み合わせの評価結果。
#[derive(Debug, Clone, PartialEq)]
pub struct ClipEvaluation {
    pub metrics: SetMetrics,
    pub selected: HashSet<String>,
    pub results: Vec<BoostResult>,
}

/// フレーズ抽出結果を予測表・正解データとクリップIDで結合する。
///
/// 予測行か正解登録が無いクリップ、および正解が空のクリップは集計から
/// 除外し、理由別に件数を返す。位置対応による結合は行わない。
#[must_use]
pub fn align(
    clip_phrases: Vec<ClipPhrases>,
    predictions: &PredictionTable,
    ground_truth: &GroundTruthSet,
) -> (Vec<EvaluationClip>, SkipTally) {
    let mut clips = Vec::new();
    let mut skips = SkipTally::default();

    for clip in clip_phrases {
        let filename = clip_filename(&clip.clip_id);

        let Some(tags) = predictions.tags(&filename) else {
            debug!(clip = %filename, reason = SkipReason::MissingPredictions.as_str(), "clip skipped");
            skips.record(SkipReason::MissingPredictions);
            continue;
        };
        let Some(labels) = ground_truth.labels(&filename) else {
            debug!(clip = %filename, reason = SkipReason::MissingGroundTruth.as_str(), "clip skipped");
            skips.record(SkipReason::MissingGroundTruth);
            continue;
        };
        if labels.is_empty() {
            debug!(clip = %filename, reason = SkipReason::EmptyGroundTruth.as_str(), "clip skipped");
            skips.record(SkipReason::EmptyGroundTruth);
            continue;
        }

        clips.push(EvaluationClip {
            clip_id: clip.clip_id,
            filename,
            tags: tags.to_vec(),
            phrases: clip.phrases,
            num_captions: clip.num_captions,
            ground_truth: labels.clone(),
        });
    }

    (clips, skips)
}

/// 1クリップを1つのパラメータ組み合わせで評価する。
///
/// # Errors
/// ブースト（類似度計算）に失敗した場合はエラーを返す。
pub async fn evaluate_combination(
    scorer: &mut SemanticScorer,
    booster: &ConfidenceBooster,
    clip: &EvaluationClip,
    params: &BoostParams,
    confidence_threshold: f32,
) -> Result<ClipEvaluation> {
    let results = booster
        .boost(scorer, &clip.tags, &clip.phrases, clip.num_captions, params)
        .await?;

    // Inclusive threshold: boosted == threshold is selected.
    let selected: HashSet<String> = results
        .iter()
        .filter(|result| result.boosted >= confidence_threshold)
        .map(|result| result.label.clone())
        .collect();

    let metrics = score_prediction(&selected, &clip.ground_truth);

    Ok(ClipEvaluation {
        metrics,
        selected,
        results,
    })
}

/// グリッド全体をスイープし、組み合わせごとの平均メトリクスを返す。
///
/// クリップごとの指標の算術平均を取る。除外済みクリップは0点としては
/// 数えない。
///
/// # Errors
/// いずれかのクリップの評価に失敗した場合はエラーを返す。
pub async fn run_sweep(
    scorer: &mut SemanticScorer,
    booster: &ConfidenceBooster,
    clips: &[EvaluationClip],
    grid: &SweepGrid,
) -> Result<Vec<EvaluationRecord>> {
    let combinations = grid.combinations();
    info!(
        combinations = combinations.len(),
        clips = clips.len(),
        "starting parameter sweep"
    );

    let mut records = Vec::with_capacity(combinations.len());
    for (alpha, confidence_threshold, similarity_threshold) in combinations {
        let params = BoostParams {
            alpha,
            sim_threshold: similarity_threshold,
        };

        let mut precision = MeanAccumulator::default();
        let mut recall = MeanAccumulator::default();
        let mut f1 = MeanAccumulator::default();
        let mut clip_count = 0_usize;

        for clip in clips {
            let evaluation =
                evaluate_combination(scorer, booster, clip, &params, confidence_threshold).await?;
            precision.push(evaluation.metrics.precision);
            recall.push(evaluation.metrics.recall);
            f1.push(evaluation.metrics.f1);
            clip_count += 1;
        }

        if clip_count == 0 {
            continue;
        }

        let record = EvaluationRecord {
            alpha,
            confidence_threshold,
            similarity_threshold,
            precision: precision.average(),
            recall: recall.average(),
            f1: f1.average(),
            clip_count,
        };
        debug!(
            alpha,
            confidence_threshold,
            similarity_threshold,
            precision = record.precision,
            recall = record.recall,
            f1 = record.f1,
            "sweep combination evaluated"
        );
        records.push(record);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrases(clip_id: &str, words: &[&str]) -> ClipPhrases {
        ClipPhrases {
            clip_id: clip_id.to_string(),
            phrases: words.iter().map(|w| (*w).to_string()).collect(),
            num_captions: 1,
        }
    }

    #[test]
    fn combinations_cover_the_cartesian_product_in_order() {
        let grid = SweepGrid {
            alphas: vec![0.0, 0.5],
            confidence_thresholds: vec![0.3],
            similarity_thresholds: vec![0.3, 0.5],
        };

        let combinations = grid.combinations();

        assert_eq!(
            combinations,
            vec![
                (0.0, 0.3, 0.3),
                (0.0, 0.3, 0.5),
                (0.5, 0.3, 0.3),
                (0.5, 0.3, 0.5),
            ]
        );
    }

    #[test]
    fn align_joins_by_filename_and_tallies_skips() {
        use std::io::Write;

        let mut predictions_file = tempfile::NamedTempFile::new().expect("temp file");
        predictions_file
            .write_all(
                b"filename,tag1,tag1prob\n\
                  present.wav,Speech,0.9\n\
                  empty-gt.wav,Speech,0.9\n\
                  no-gt.wav,Speech,0.9\n",
            )
            .expect("write csv");
        let predictions =
            PredictionTable::load(predictions_file.path()).expect("load predictions");

        let mut ground_truth_file = tempfile::NamedTempFile::new().expect("temp file");
        ground_truth_file
            .write_all(br#"{"present.wav": ["Speech"], "empty-gt.wav": [], "no-preds.wav": ["Dog"]}"#)
            .expect("write json");
        let ground_truth = GroundTruthSet::load(ground_truth_file.path()).expect("load gt");

        let clip_phrases = vec![
            phrases("present", &["speech"]),
            phrases("empty-gt", &["speech"]),
            phrases("no-gt", &["speech"]),
            phrases("no-preds", &["dog"]),
        ];

        let (clips, skips) = align(clip_phrases, &predictions, &ground_truth);

        assert_eq!(clips.len(), 1);
        assert_eq!(clips[0].filename, "present.wav");
        assert_eq!(clips[0].tags, vec![AudioTag::new("Speech", 0.9)]);
        assert_eq!(skips.missing_predictions, 1);
        assert_eq!(skips.missing_ground_truth, 1);
        assert_eq!(skips.empty_ground_truth, 1);
        assert_eq!(skips.total(), 3);
    }
}
