//! クリップごとの分類済みキャプション。

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::CorpusError;

/// キャプションのカテゴリ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionSource {
    Audio,
    Visual,
    AudioVisual,
    Generated,
}

impl CaptionSource {
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "audio" => Some(Self::Audio),
            "visual" => Some(Self::Visual),
            "audio_visual" | "audio-visual" => Some(Self::AudioVisual),
            "generated" => Some(Self::Generated),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Visual => "visual",
            Self::AudioVisual => "audio_visual",
            Self::Generated => "generated",
        }
    }
}

/// 1クリップ分のキャプション集合。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CaptionDocument {
    #[serde(default)]
    pub audio_captions: Vec<String>,
    #[serde(default)]
    pub visual_captions: Vec<String>,
    #[serde(default)]
    pub audio_visual_captions: Vec<String>,
    #[serde(default, rename = "GPT_AV_captions")]
    pub generated_captions: Vec<String>,
}

impl CaptionDocument {
    /// 指定カテゴリのキャプションを宣言順に連結して返す。
    #[must_use]
    pub fn select(&self, sources: &[CaptionSource]) -> Vec<&str> {
        let mut selected = Vec::new();
        for source in sources {
            let captions = match source {
                CaptionSource::Audio => &self.audio_captions,
                CaptionSource::Visual => &self.visual_captions,
                CaptionSource::AudioVisual => &self.audio_visual_captions,
                CaptionSource::Generated => &self.generated_captions,
            };
            selected.extend(captions.iter().map(String::as_str));
        }
        selected
    }
}

/// クリップIDからキャプション文書への写像。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptionStore {
    documents: BTreeMap<String, CaptionDocument>,
}

impl CaptionStore {
    /// キャプションJSONをファイルから読み込む。
    ///
    /// # Errors
    /// ファイルが読めない、またはJSONとして不正な場合は [`CorpusError`] を返す。
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let raw = fs::read_to_string(path).map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let documents: BTreeMap<String, CaptionDocument> =
            serde_json::from_str(&raw).map_err(|source| CorpusError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { documents })
    }

    #[must_use]
    pub fn get(&self, clip_id: &str) -> Option<&CaptionDocument> {
        self.documents.get(clip_id)
    }

    /// クリップID順の決定的なイテレータ。
    pub fn iter(&self) -> impl Iterator<Item = (&String, &CaptionDocument)> {
        self.documents.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
