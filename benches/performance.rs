/// フレーズ抽出とメトリクス計算の性能ベンチマーク。
use std::collections::HashSet;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tagboost_worker::evaluation::metrics::score_prediction;
use tagboost_worker::pipeline::parse::{NounChunk, ParsedSentence, ParsedToken};
use tagboost_worker::pipeline::phrase::{ExtractorMode, extract_phrases};

fn token(text: String, pos: &str, dep: &str, head: Option<usize>) -> ParsedToken {
    ParsedToken {
        text,
        pos: pos.to_string(),
        dep: dep.to_string(),
        head,
        is_stop: false,
        is_punct: false,
    }
}

/// 「主語 動詞 目的語 複合名詞対」からなる合成文を生成する。
fn synthetic_sentences(count: usize) -> Vec<ParsedSentence> {
    (0..count)
        .map(|i| ParsedSentence {
            tokens: vec![
                token(format!("subject{i}"), "NOUN", "nsubj", Some(1)),
                token(format!("verb{i}"), "VERB", "ROOT", None),
                token(format!("object{i}"), "NOUN", "dobj", Some(1)),
                token(format!("modifier{i}"), "NOUN", "compound", Some(4)),
                token(format!("head{i}"), "NOUN", "appos", Some(1)),
            ],
            noun_chunks: vec![
                NounChunk { start: 0, end: 1 },
                NounChunk { start: 2, end: 3 },
                NounChunk { start: 3, end: 5 },
            ],
        })
        .collect()
}

fn bench_phrase_extraction(c: &mut Criterion) {
    let sentences = synthetic_sentences(512);
    c.bench_function("extract_phrases_512_sentences", |b| {
        b.iter(|| {
            let phrases = extract_phrases(&sentences, ExtractorMode::SyntacticPhrases);
            black_box(phrases.len());
        });
    });
}

fn bench_metric_scoring(c: &mut Criterion) {
    let predicted: HashSet<String> = (0..64).map(|i| format!("tag{i}")).collect();
    let ground_truth: HashSet<String> = (32..96).map(|i| format!("tag{i}")).collect();
    c.bench_function("score_prediction_64_labels", |b| {
        b.iter(|| {
            let metrics = score_prediction(&predicted, &ground_truth);
            black_box(metrics.f1);
        });
    });
}

criterion_group!(benches, bench_phrase_extraction, bench_metric_scoring);
criterion_main!(benches);
