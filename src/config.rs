use std::{env, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::corpus::captions::CaptionSource;
use crate::pipeline::boost::BoostStrategy;
use crate::pipeline::phrase::ExtractorMode;

#[cfg(test)]
use once_cell::sync::Lazy;
#[cfg(test)]
pub(crate) static ENV_MUTEX: Lazy<std::sync::Mutex<()>> = Lazy::new(|| std::sync::Mutex::new(()));

/// ブーストスイープ実行の設定値。
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    captions_path: PathBuf,
    predictions_path: PathBuf,
    ground_truth_path: PathBuf,
    report_path: PathBuf,
    parser_base_url: String,
    parser_connect_timeout: Duration,
    parser_total_timeout: Duration,
    parser_service_token: Option<String>,
    alphas: Vec<f32>,
    confidence_thresholds: Vec<f32>,
    similarity_thresholds: Vec<f32>,
    boost_strategy: BoostStrategy,
    extractor_mode: ExtractorMode,
    caption_sources: Vec<CaptionSource>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数からワーカーの設定値を読み込み、検証する。
    ///
    /// # Errors
    /// コーパスのパスが未設定、もしくは各種値のパースに失敗した場合は [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let captions_path = PathBuf::from(env_var("TAGBOOST_CAPTIONS_PATH")?);
        let predictions_path = PathBuf::from(env_var("TAGBOOST_PREDICTIONS_PATH")?);
        let ground_truth_path = PathBuf::from(env_var("TAGBOOST_GROUND_TRUTH_PATH")?);
        let report_path = PathBuf::from(
            env::var("TAGBOOST_REPORT_PATH").unwrap_or_else(|_| "evaluation_report.csv".to_string()),
        );

        let parser_base_url = env::var("TAGBOOST_PARSER_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:9010".to_string());
        let parser_connect_timeout = parse_duration_ms("TAGBOOST_PARSER_CONNECT_TIMEOUT_MS", 3000)?;
        let parser_total_timeout = parse_duration_ms("TAGBOOST_PARSER_TOTAL_TIMEOUT_MS", 30000)?;
        let parser_service_token = env::var("TAGBOOST_PARSER_SERVICE_TOKEN").ok();

        // Sweep grids (defaults mirror the validated parameter study)
        let alphas = parse_f32_list("TAGBOOST_ALPHAS", "0.0,0.1,0.3,0.5,0.7,0.9")?;
        let confidence_thresholds = parse_f32_list("TAGBOOST_CONFIDENCE_THRESHOLDS", "0.3,0.5")?;
        let similarity_thresholds = parse_f32_list("TAGBOOST_SIMILARITY_THRESHOLDS", "0.3,0.5")?;

        let boost_strategy = parse_boost_strategy(
            "TAGBOOST_BOOST_STRATEGY",
            parse_f32("TAGBOOST_MAX_SIM_WEIGHT", 0.5)?,
            parse_f32("TAGBOOST_MAX_SIM_GATE", 0.5)?,
        )?;
        let extractor_mode = parse_extractor_mode("TAGBOOST_EXTRACTOR_MODE")?;
        let caption_sources = parse_caption_sources("TAGBOOST_CAPTION_SOURCES", "audio")?;

        Ok(Self {
            captions_path,
            predictions_path,
            ground_truth_path,
            report_path,
            parser_base_url,
            parser_connect_timeout,
            parser_total_timeout,
            parser_service_token,
            alphas,
            confidence_thresholds,
            similarity_thresholds,
            boost_strategy,
            extractor_mode,
            caption_sources,
        })
    }

    #[must_use]
    pub fn captions_path(&self) -> &PathBuf {
        &self.captions_path
    }

    #[must_use]
    pub fn predictions_path(&self) -> &PathBuf {
        &self.predictions_path
    }

    #[must_use]
    pub fn ground_truth_path(&self) -> &PathBuf {
        &self.ground_truth_path
    }

    #[must_use]
    pub fn report_path(&self) -> &PathBuf {
        &self.report_path
    }

    #[must_use]
    pub fn parser_base_url(&self) -> &str {
        &self.parser_base_url
    }

    #[must_use]
    pub fn parser_connect_timeout(&self) -> Duration {
        self.parser_connect_timeout
    }

    #[must_use]
    pub fn parser_total_timeout(&self) -> Duration {
        self.parser_total_timeout
    }

    #[must_use]
    pub fn parser_service_token(&self) -> Option<&str> {
        self.parser_service_token.as_deref()
    }

    #[must_use]
    pub fn alphas(&self) -> &[f32] {
        &self.alphas
    }

    #[must_use]
    pub fn confidence_thresholds(&self) -> &[f32] {
        &self.confidence_thresholds
    }

    #[must_use]
    pub fn similarity_thresholds(&self) -> &[f32] {
        &self.similarity_thresholds
    }

    #[must_use]
    pub fn boost_strategy(&self) -> BoostStrategy {
        self.boost_strategy
    }

    #[must_use]
    pub fn extractor_mode(&self) -> ExtractorMode {
        self.extractor_mode
    }

    #[must_use]
    pub fn caption_sources(&self) -> &[CaptionSource] {
        &self.caption_sources
    }
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_duration_ms(name: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default_ms.to_string());
    let ms = raw.parse::<u64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    Ok(Duration::from_millis(ms))
}

fn parse_f32(name: &'static str, default: f32) -> Result<f32, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let parsed = raw.parse::<f32>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    if !(0.0..=1.0).contains(&parsed) {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be between 0.0 and 1.0"),
        });
    }
    Ok(parsed)
}

fn parse_f32_list(name: &'static str, default: &str) -> Result<Vec<f32>, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let values = raw
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            piece.parse::<f32>().map_err(|error| ConfigError::Invalid {
                name,
                source: anyhow::Error::new(error),
            })
        })
        .collect::<Result<Vec<f32>, ConfigError>>()?;
    if values.is_empty() {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("at least one value is required"),
        });
    }
    if let Some(out_of_range) = values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value {out_of_range} must be between 0.0 and 1.0"),
        });
    }
    Ok(values)
}

fn parse_boost_strategy(
    name: &'static str,
    max_sim_weight: f32,
    max_sim_gate: f32,
) -> Result<BoostStrategy, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| "ratio".to_string());
    match raw.to_lowercase().as_str() {
        "ratio" => Ok(BoostStrategy::Ratio),
        "max-similarity" | "max_similarity" => Ok(BoostStrategy::MaxSimilarity {
            weight: max_sim_weight,
            gate: max_sim_gate,
        }),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("unknown boost strategy: {raw}"),
        }),
    }
}

fn parse_extractor_mode(name: &'static str) -> Result<ExtractorMode, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| "syntactic-phrases".to_string());
    match raw.to_lowercase().as_str() {
        "syntactic-phrases" | "syntactic_phrases" => Ok(ExtractorMode::SyntacticPhrases),
        "content-words" | "content_words" => Ok(ExtractorMode::ContentWords),
        _ => Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("unknown extractor mode: {raw}"),
        }),
    }
}

fn parse_caption_sources(
    name: &'static str,
    default: &str,
) -> Result<Vec<CaptionSource>, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let sources = raw
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            CaptionSource::from_name(piece).ok_or_else(|| ConfigError::Invalid {
                name,
                source: anyhow::anyhow!("unknown caption source: {piece}"),
            })
        })
        .collect::<Result<Vec<CaptionSource>, ConfigError>>()?;
    if sources.is_empty() {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("at least one caption source is required"),
        });
    }
    Ok(sources)
}
