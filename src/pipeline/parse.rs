//! 依存構造解析サービスが返す文の構造。
//!
//! 解析そのものは外部サービスの責務であり、本クレートはトークンの
//! 統語役割と名詞句スパンのみを消費します。

use serde::{Deserialize, Serialize};

/// 解析済みトークン。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedToken {
    pub text: String,
    /// 粗粒度品詞タグ（`VERB`、`NOUN` など）。
    pub pos: String,
    /// 依存関係ラベル（`nsubj`、`dobj`、`compound` など）。
    pub dep: String,
    /// 文内の主辞トークンの添字。文のルートは `None`。
    #[serde(default)]
    pub head: Option<usize>,
    #[serde(default)]
    pub is_stop: bool,
    #[serde(default)]
    pub is_punct: bool,
}

/// 名詞句スパン。`start..end` のトークン添字半開区間。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NounChunk {
    pub start: usize,
    pub end: usize,
}

/// 解析済みの一文。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedSentence {
    pub tokens: Vec<ParsedToken>,
    #[serde(default)]
    pub noun_chunks: Vec<NounChunk>,
}

impl ParsedSentence {
    /// `head` が指定トークンである子トークンの添字を文順で返す。
    #[must_use]
    pub fn children_of(&self, index: usize) -> Vec<usize> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(child, token)| *child != index && token.head == Some(index))
            .map(|(child, _)| child)
            .collect()
    }
}
