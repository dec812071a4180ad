#![allow(dead_code)]

use std::collections::BTreeSet;
use std::collections::HashMap;

use anyhow::{Result, bail};
use async_trait::async_trait;

use tagboost_worker::clients::parser::CaptionParser;
use tagboost_worker::evaluation::sweep::EvaluationClip;
use tagboost_worker::pipeline::boost::AudioTag;
use tagboost_worker::pipeline::embedding::Embedder;
use tagboost_worker::pipeline::parse::{NounChunk, ParsedSentence, ParsedToken};

/// Deterministic embedder over a fixed test vocabulary.
///
/// Labels and phrases map to hand-picked directions so pairwise cosine
/// similarities are known exactly. Unknown strings are an error so that
/// vocabulary gaps fail loudly instead of silently scoring zero.
pub struct StaticEmbedder;

pub fn static_vector(text: &str) -> Result<Vec<f32>> {
    match text {
        "Speech" | "speech" => Ok(vec![1.0, 0.0, 0.0, 0.0]),
        "Dog" | "dog" => Ok(vec![0.0, 1.0, 0.0, 0.0]),
        "Music" | "music" => Ok(vec![0.0, 0.0, 1.0, 0.0]),
        // cos("man talks", "Speech") = 0.8
        "man talks" | "man talking" => Ok(vec![0.8, 0.0, 0.0, 0.6]),
        // cos("dog barks", "Dog") = 0.8
        "dog barks" => Ok(vec![0.0, 0.8, 0.0, 0.6]),
        // cos("music plays", "Music") = 0.8
        "music plays" => Ok(vec![0.0, 0.0, 0.8, 0.6]),
        other => bail!("no static embedding for {other}"),
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| static_vector(text)).collect()
    }
}

/// Static caption parser keyed by exact sentence text.
#[derive(Default)]
pub struct StaticParser {
    sentences: HashMap<String, ParsedSentence>,
}

impl StaticParser {
    #[must_use]
    pub fn new() -> Self {
        let mut sentences = HashMap::new();
        sentences.insert(
            "A man talks.".to_string(),
            svo_sentence("A", "man", "talks"),
        );
        sentences.insert(
            "A dog barks.".to_string(),
            svo_sentence("A", "dog", "barks"),
        );
        sentences.insert(
            "Music plays.".to_string(),
            subject_verb_sentence("Music", "plays"),
        );
        Self { sentences }
    }
}

#[async_trait]
impl CaptionParser for StaticParser {
    async fn parse(&self, sentences: &[String]) -> Result<Vec<ParsedSentence>> {
        sentences
            .iter()
            .map(|sentence| {
                self.sentences
                    .get(sentence)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("no static parse for {sentence}"))
            })
            .collect()
    }
}

pub fn token(
    text: &str,
    pos: &str,
    dep: &str,
    head: Option<usize>,
    is_stop: bool,
    is_punct: bool,
) -> ParsedToken {
    ParsedToken {
        text: text.to_string(),
        pos: pos.to_string(),
        dep: dep.to_string(),
        head,
        is_stop,
        is_punct,
    }
}

/// "<det> <subject> <verb>." with a trailing period.
pub fn svo_sentence(det: &str, subject: &str, verb: &str) -> ParsedSentence {
    ParsedSentence {
        tokens: vec![
            token(det, "DET", "det", Some(1), true, false),
            token(subject, "NOUN", "nsubj", Some(2), false, false),
            token(verb, "VERB", "ROOT", None, false, false),
            token(".", "PUNCT", "punct", Some(2), false, true),
        ],
        noun_chunks: vec![NounChunk { start: 0, end: 2 }],
    }
}

/// "<subject> <verb>." without a determiner.
pub fn subject_verb_sentence(subject: &str, verb: &str) -> ParsedSentence {
    ParsedSentence {
        tokens: vec![
            token(subject, "NOUN", "nsubj", Some(1), false, false),
            token(verb, "VERB", "ROOT", None, false, false),
            token(".", "PUNCT", "punct", Some(1), false, true),
        ],
        noun_chunks: vec![NounChunk { start: 0, end: 1 }],
    }
}

pub fn clip(
    clip_id: &str,
    tags: &[(&str, f32)],
    phrases: &[&str],
    num_captions: usize,
    ground_truth: &[&str],
) -> EvaluationClip {
    let phrases: BTreeSet<String> = phrases.iter().map(|p| (*p).to_string()).collect();
    EvaluationClip {
        clip_id: clip_id.to_string(),
        filename: format!("{clip_id}.wav"),
        tags: tags
            .iter()
            .map(|(label, confidence)| AudioTag::new(*label, *confidence))
            .collect(),
        phrases,
        num_captions,
        ground_truth: ground_truth.iter().map(|l| (*l).to_string()).collect(),
    }
}
