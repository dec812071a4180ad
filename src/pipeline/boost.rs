//! キャプション根拠による音声タグ信頼度のブースト。

use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::semantic::SemanticScorer;

/// 音声タギングモデルが付与したタグ。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct AudioTag {
    pub label: String,
    #[serde(default)]
    pub confidence: f32,
}

impl AudioTag {
    #[must_use]
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// ブースト戦略。
///
/// 比率ベースと最大類似度ベースは交換可能ではなく、スイープは
/// どちらかを明示的に選択します。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoostStrategy {
    /// 一致フレーズ比率と元の信頼度をαで線形補間する。
    Ratio,
    /// 最大類似度がゲートを超えたときだけ重み付きボーナスを加算する。
    MaxSimilarity { weight: f32, gate: f32 },
}

/// 1つのパラメータ組み合わせにおけるブースト入力。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostParams {
    /// テキスト一致シグナルの重み。0で音声信頼度のみ、1でテキストのみ。
    pub alpha: f32,
    /// フレーズが一致とみなされる類似度の下限（狭義）。
    pub sim_threshold: f32,
}

/// 1タグ分のブースト結果。タグが落とされることはない。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostResult {
    pub label: String,
    pub original: f32,
    pub boosted: f32,
    pub match_count: usize,
    pub match_ratio: f32,
}

/// 設定された戦略でタグ信頼度を再計算するブースタ。
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceBooster {
    strategy: BoostStrategy,
}

impl ConfidenceBooster {
    #[must_use]
    pub fn new(strategy: BoostStrategy) -> Self {
        Self { strategy }
    }

    #[must_use]
    pub fn strategy(&self) -> BoostStrategy {
        self.strategy
    }

    /// タグ列をブーストする。入力順を保ち、タグは1つも落とさない。
    ///
    /// # Errors
    /// 類似度計算（埋め込み符号化）に失敗した場合はエラーを返す。
    pub async fn boost(
        &self,
        scorer: &mut SemanticScorer,
        tags: &[AudioTag],
        phrases: &BTreeSet<String>,
        num_captions: usize,
        params: &BoostParams,
    ) -> Result<Vec<BoostResult>> {
        let mut results = Vec::with_capacity(tags.len());
        for tag in tags {
            results.push(self.boost_tag(scorer, tag, phrases, num_captions, params).await?);
        }
        Ok(results)
    }

    async fn boost_tag(
        &self,
        scorer: &mut SemanticScorer,
        tag: &AudioTag,
        phrases: &BTreeSet<String>,
        num_captions: usize,
        params: &BoostParams,
    ) -> Result<BoostResult> {
        let mut match_count = 0_usize;
        let mut max_similarity = 0.0_f32;
        for phrase in phrases {
            let similarity = scorer.similarity(phrase, &tag.label).await?;
            if similarity > params.sim_threshold {
                match_count += 1;
            }
            max_similarity = max_similarity.max(similarity);
        }

        let match_ratio = if num_captions > 0 {
            #[allow(clippy::cast_precision_loss)]
            let ratio = match_count as f32 / num_captions as f32;
            ratio.min(1.0)
        } else {
            0.0
        };

        let boosted = match self.strategy {
            BoostStrategy::Ratio => {
                (params.alpha * match_ratio + (1.0 - params.alpha) * tag.confidence).min(1.0)
            }
            BoostStrategy::MaxSimilarity { weight, gate } => {
                if max_similarity > gate {
                    (tag.confidence + max_similarity * weight).min(1.0)
                } else {
                    tag.confidence
                }
            }
        };

        Ok(BoostResult {
            label: tag.label.clone(),
            original: tag.confidence,
            boosted,
            match_count,
            match_ratio,
        })
    }
}
