//! 音声タギングモデルの予測表（CSV）。

use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::CorpusError;
use crate::pipeline::boost::AudioTag;

/// 1クリップあたりのタグ列数。列は `tag1..tag10` / `tag1prob..tag10prob`。
pub const MAX_TAG_COLUMNS: usize = 10;

/// ファイル名をキーとする予測表。
#[derive(Debug, Clone, Default)]
pub struct PredictionTable {
    rows: FxHashMap<String, Vec<AudioTag>>,
}

impl PredictionTable {
    /// 予測表CSVを読み込む。
    ///
    /// タグ名が空、または確率が数値でないセルの組はその組だけ読み飛ばす。
    /// `filename` 列が無い場合は表全体を不正として扱う。
    ///
    /// # Errors
    /// ファイルが読めない、CSVとして不正、または `filename` 列が
    /// 存在しない場合は [`CorpusError`] を返す。
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let mut reader = csv::Reader::from_path(path).map_err(|source| CorpusError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

        let headers = reader
            .headers()
            .map_err(|source| CorpusError::Csv {
                path: path.to_path_buf(),
                source,
            })?
            .clone();
        let filename_index = headers.iter().position(|name| name == "filename").ok_or_else(|| {
            CorpusError::MissingColumn {
                path: path.to_path_buf(),
                column: "filename".to_string(),
            }
        })?;

        // Resolve (tagN, tagNprob) column pairs present in this table.
        let mut column_pairs: Vec<(usize, usize)> = Vec::new();
        for i in 1..=MAX_TAG_COLUMNS {
            let tag_column = headers.iter().position(|name| name == format!("tag{i}"));
            let prob_column = headers.iter().position(|name| name == format!("tag{i}prob"));
            if let (Some(tag_column), Some(prob_column)) = (tag_column, prob_column) {
                column_pairs.push((tag_column, prob_column));
            }
        }

        let mut rows: FxHashMap<String, Vec<AudioTag>> = FxHashMap::default();
        let mut skipped_cells = 0_usize;
        for record in reader.records() {
            let record = record.map_err(|source| CorpusError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
            let Some(filename) = record.get(filename_index) else {
                continue;
            };
            let filename = filename.trim();
            if filename.is_empty() {
                continue;
            }

            let mut tags = Vec::new();
            for &(tag_column, prob_column) in &column_pairs {
                let label = record.get(tag_column).map(str::trim).unwrap_or_default();
                let prob = record
                    .get(prob_column)
                    .map(str::trim)
                    .unwrap_or_default()
                    .parse::<f32>();
                match (label.is_empty(), prob) {
                    (false, Ok(prob)) => tags.push(AudioTag::new(label, prob)),
                    _ => skipped_cells += 1,
                }
            }
            rows.insert(filename.to_string(), tags);
        }

        debug!(
            rows = rows.len(),
            skipped_cells, "loaded prediction table"
        );
        Ok(Self { rows })
    }

    #[must_use]
    pub fn tags(&self, filename: &str) -> Option<&[AudioTag]> {
        self.rows.get(filename).map(Vec::as_slice)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
