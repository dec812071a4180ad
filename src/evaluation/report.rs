//! 評価結果の表描画とCSV出力。

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use crate::pipeline::boost::BoostResult;

use super::sweep::EvaluationRecord;

/// 1クリップ分の検分レポート。
///
/// ブースト結果をブースト後信頼度の降順に保持する。
#[derive(Debug, Clone, PartialEq)]
pub struct ClipReport {
    pub filename: String,
    pub alpha: f32,
    pub similarity_threshold: f32,
    pub num_captions: usize,
    pub results: Vec<BoostResult>,
    pub ground_truth: HashSet<String>,
}

impl ClipReport {
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        alpha: f32,
        similarity_threshold: f32,
        num_captions: usize,
        mut results: Vec<BoostResult>,
        ground_truth: HashSet<String>,
    ) -> Self {
        results.sort_by(|a, b| {
            b.boosted
                .partial_cmp(&a.boosted)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Self {
            filename: filename.into(),
            alpha,
            similarity_threshold,
            num_captions,
            results,
            ground_truth,
        }
    }
}

/// スイープ結果をCSVレポートとして書き出す。
///
/// # Errors
/// ファイルの作成またはレコードの書き込みに失敗した場合はエラーを返す。
pub fn write_csv(path: &Path, records: &[EvaluationRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create report file {}", path.display()))?;
    for record in records {
        writer
            .serialize(record)
            .context("failed to serialize evaluation record")?;
    }
    writer.flush().context("failed to flush report file")?;
    Ok(())
}

/// スイープ結果CSVを読み戻す。
///
/// # Errors
/// ファイルが読めない、またはレコードの解釈に失敗した場合はエラーを返す。
pub fn read_csv(path: &Path) -> Result<Vec<EvaluationRecord>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open report file {}", path.display()))?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record.context("failed to deserialize evaluation record")?);
    }
    Ok(records)
}

/// スイープ結果の集計表を文字列として描画する。
#[must_use]
pub fn render_summary_table(records: &[EvaluationRecord]) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{}",
        style("alpha   conf    sim     precision  recall   f1       clips").bold()
    );
    for record in records {
        let _ = writeln!(
            output,
            "{:<7.2} {:<7.2} {:<7.2} {:<10.3} {:<8.3} {:<8.3} {}",
            record.alpha,
            record.confidence_threshold,
            record.similarity_threshold,
            record.precision,
            record.recall,
            record.f1,
            record.clip_count
        );
    }
    output
}

/// クリップ検分レポートを文字列として描画する。
///
/// 正解ラベルに含まれるタグには `(GT)` を付す。一致比率は
/// `count/num (ratio)` の形式で表示する。
#[must_use]
pub fn render_clip_report(report: &ClipReport) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{}",
        style(format!(
            "{} (alpha={}, sim_threshold={})",
            report.filename, report.alpha, report.similarity_threshold
        ))
        .bold()
    );
    let _ = writeln!(
        output,
        "{:<40} {:<10} {:<10} {}",
        "tag", "original", "boosted", "matches"
    );
    for result in &report.results {
        let label = if report.ground_truth.contains(&result.label) {
            format!("{} (GT)", result.label)
        } else {
            result.label.clone()
        };
        let _ = writeln!(
            output,
            "{:<40} {:<10.3} {:<10.3} {}/{} ({:.3})",
            label,
            result.original,
            result.boosted,
            result.match_count,
            report.num_captions,
            result.match_ratio
        );
    }
    output
}
