//! キャプションからの候補フレーズ抽出。
//!
//! 依存構造解析済みの文からSVO三つ組、名詞句、複合名詞を組み立てます。
//! 同一文内ではトークン添字の重複を許さず、長いスパンほど優先されます。

use std::collections::BTreeSet;

use rustc_hash::FxHashSet;

use super::parse::ParsedSentence;

/// 主語とみなす依存関係ラベル。
const SUBJECT_ROLES: [&str; 2] = ["nsubj", "nsubjpass"];
/// 目的語相当とみなす依存関係ラベル。
const OBJECT_ROLES: [&str; 4] = ["dobj", "attr", "prep", "pobj"];

/// フレーズ抽出モード。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorMode {
    /// SVO三つ組 → 名詞句 → 複合名詞の固定順で抽出する。
    SyntacticPhrases,
    /// 名詞・動詞トークンを単語フレーズとして抽出する。
    ContentWords,
}

/// 解析済みの文集合からフレーズ集合を抽出する。
///
/// 結果は重複のない集合で、順序は下流の処理に影響しません。
#[must_use]
pub fn extract_phrases(sentences: &[ParsedSentence], mode: ExtractorMode) -> BTreeSet<String> {
    let mut phrases = BTreeSet::new();
    for sentence in sentences {
        match mode {
            ExtractorMode::SyntacticPhrases => extract_syntactic(sentence, &mut phrases),
            ExtractorMode::ContentWords => extract_content_words(sentence, &mut phrases),
        }
    }
    phrases
}

fn extract_syntactic(sentence: &ParsedSentence, phrases: &mut BTreeSet<String>) {
    // Consumed indices are tracked per sentence, not across the clip.
    let mut used: FxHashSet<usize> = FxHashSet::default();

    // Step 1: SVO triplets
    for (index, token) in sentence.tokens.iter().enumerate() {
        if token.pos != "VERB" {
            continue;
        }
        let children = sentence.children_of(index);
        let subjects: Vec<usize> = children
            .iter()
            .copied()
            .filter(|&child| SUBJECT_ROLES.contains(&sentence.tokens[child].dep.as_str()))
            .collect();
        let objects: Vec<usize> = children
            .iter()
            .copied()
            .filter(|&child| OBJECT_ROLES.contains(&sentence.tokens[child].dep.as_str()))
            .collect();

        if subjects.is_empty() && objects.is_empty() {
            continue;
        }
        let mut span: Vec<usize> = subjects;
        span.push(index);
        span.extend(objects);
        span.sort_unstable();

        if span.iter().any(|i| used.contains(i)) {
            continue;
        }
        if let Some(phrase) = render_span(sentence, &span) {
            phrases.insert(phrase);
            used.extend(span);
        }
    }

    // Step 2: noun chunks
    for chunk in &sentence.noun_chunks {
        let span: Vec<usize> = (chunk.start..chunk.end.min(sentence.tokens.len())).collect();
        if span.is_empty() || span.iter().any(|i| used.contains(i)) {
            continue;
        }
        if let Some(phrase) = render_span(sentence, &span) {
            phrases.insert(phrase);
            used.extend(span);
        }
    }

    // Step 3: compound noun pairs
    for (index, token) in sentence.tokens.iter().enumerate() {
        if token.dep != "compound" {
            continue;
        }
        let Some(head_index) = token.head else {
            continue;
        };
        let Some(head) = sentence.tokens.get(head_index) else {
            continue;
        };
        if head.pos != "NOUN" {
            continue;
        }
        if used.contains(&index) || used.contains(&head_index) {
            continue;
        }
        if token.is_stop || token.is_punct || head.is_stop || head.is_punct {
            continue;
        }
        let phrase = format!(
            "{} {}",
            token.text.to_lowercase(),
            head.text.to_lowercase()
        );
        let phrase = phrase.trim().to_string();
        if !phrase.is_empty() {
            phrases.insert(phrase);
            used.insert(index);
            used.insert(head_index);
        }
    }
}

fn extract_content_words(sentence: &ParsedSentence, phrases: &mut BTreeSet<String>) {
    for token in &sentence.tokens {
        if token.is_stop || token.is_punct {
            continue;
        }
        if token.pos == "NOUN" || token.pos == "VERB" {
            let word = token.text.to_lowercase();
            if !word.trim().is_empty() {
                phrases.insert(word.trim().to_string());
            }
        }
    }
}

/// スパンを非ストップ・非句読点トークンの小文字連結として描画する。
///
/// フィルタ後に何も残らない場合は `None`。
fn render_span(sentence: &ParsedSentence, span: &[usize]) -> Option<String> {
    let words: Vec<String> = span
        .iter()
        .filter_map(|&i| sentence.tokens.get(i))
        .filter(|token| !token.is_stop && !token.is_punct)
        .map(|token| token.text.to_lowercase())
        .collect();
    let phrase = words.join(" ").trim().to_string();
    if phrase.is_empty() { None } else { Some(phrase) }
}
