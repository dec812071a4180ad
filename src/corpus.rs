//! 永続化された入力コーパス（キャプション・予測表・正解データ）の読み込み。

use std::path::PathBuf;

use thiserror::Error;

pub mod captions;
pub mod ground_truth;
pub mod predictions;

/// コーパス読み込みの失敗。
///
/// コーパス自体の破損は実行を中断させる。クリップ単位のデータ欠落は
/// ここではなく評価側のスキップ集計で扱う。
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to parse CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("prediction table {path} is missing column {column}")]
    MissingColumn { path: PathBuf, column: String },
}

/// キャプションストアのクリップIDを予測表・正解データのファイル名に揃える。
///
/// キャプション側は拡張子なしのIDで記録されることがある。結合は常に
/// この正規化済みファイル名で行い、位置対応には決して頼らない。
#[must_use]
pub fn clip_filename(clip_id: &str) -> String {
    if clip_id.ends_with(".wav") {
        clip_id.to_string()
    } else {
        format!("{clip_id}.wav")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_filename_appends_extension_once() {
        assert_eq!(clip_filename("4963357278"), "4963357278.wav");
        assert_eq!(clip_filename("4963357278.wav"), "4963357278.wav");
    }
}
