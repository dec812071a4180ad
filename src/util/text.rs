/// テキスト処理ユーティリティ。
///
/// キャプションの正規化と文分割を提供します。
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// テキストをNFC正規化する。
#[must_use]
pub fn normalize_text(input: &str) -> String {
    input.nfc().collect::<String>()
}

/// テキストを文に分割する。
///
/// Unicode UAX#29に準拠した文境界検出を使用します。
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    text.unicode_sentences()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
