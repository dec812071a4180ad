//! 評価専用の正解ラベル集合。

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use super::CorpusError;

/// ファイル名から正解ラベル集合への写像。実行中は不変。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroundTruthSet {
    clips: BTreeMap<String, HashSet<String>>,
}

impl GroundTruthSet {
    /// 正解データJSON（ファイル名 → ラベル配列）を読み込む。
    ///
    /// # Errors
    /// ファイルが読めない、またはJSONとして不正な場合は [`CorpusError`] を返す。
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let raw = fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&raw).map_err(|source| CorpusError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let clips = entries
            .into_iter()
            .map(|(filename, labels)| (filename, labels.into_iter().collect()))
            .collect();
        Ok(Self { clips })
    }

    /// クリップの正解ラベル集合。登録が無いクリップは `None`。
    #[must_use]
    pub fn labels(&self, filename: &str) -> Option<&HashSet<String>> {
        self.clips.get(filename)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
