use std::collections::HashSet;

/// 1クリップ分の集合ベース分類メトリクス。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SetMetrics {
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// 予測ラベル集合を正解集合に対して採点する。
///
/// ラベルは文字列の完全一致で比較する。分母が0になる場合、対応する
/// 指標は0とする（エラーにはしない）。
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn score_prediction(
    predicted: &HashSet<String>,
    ground_truth: &HashSet<String>,
) -> SetMetrics {
    let true_positives = predicted.intersection(ground_truth).count();
    let false_positives = predicted.len() - true_positives;
    let false_negatives = ground_truth.len() - true_positives;

    let precision = if true_positives + false_positives > 0 {
        true_positives as f32 / (true_positives + false_positives) as f32
    } else {
        0.0
    };
    let recall = if true_positives + false_negatives > 0 {
        true_positives as f32 / (true_positives + false_negatives) as f32
    } else {
        0.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    SetMetrics {
        precision,
        recall,
        f1,
        true_positives,
        false_positives,
        false_negatives,
    }
}

/// クリップ横断の算術平均アキュムレータ。
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct MeanAccumulator {
    sum: f32,
    count: usize,
}

impl MeanAccumulator {
    pub(crate) fn push(&mut self, value: f32) {
        self.sum += value;
        self.count += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn average(self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f32
        }
    }
}
