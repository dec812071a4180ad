/// 依存構造解析サービスのクライアント。
///
/// 文のバッチ解析とタイムアウトをサポートします。
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::parse::ParsedSentence;

/// 解析リクエスト。
#[derive(Debug, Serialize)]
struct ParseRequest {
    sentences: Vec<String>,
}

/// 解析レスポンス。
#[derive(Debug, Deserialize)]
struct ParseResponse {
    success: bool,
    sentences: Vec<ParsedSentence>,
}

/// 文の統語構造を提供する外部コラボレータ。
///
/// 解析器の内部は本クレートの関心外であり、テストでは静的な実装を
/// 注入できます。
#[async_trait]
pub trait CaptionParser: Send + Sync {
    /// 文のバッチを解析する。返り値は入力と同数・同順。
    ///
    /// # Errors
    /// 解析サービスとの通信、またはレスポンスの解釈に失敗した場合は
    /// エラーを返す。
    async fn parse(&self, sentences: &[String]) -> Result<Vec<ParsedSentence>>;
}

/// 解析クライアントの設定。
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub total_timeout: Duration,
    pub service_token: Option<String>,
}

/// 解析サービスとの通信を管理するクライアント。
#[derive(Debug, Clone)]
pub struct HttpParserClient {
    client: Client,
    base_url: Url,
    service_token: Option<String>,
}

impl HttpParserClient {
    /// 新しい解析クライアントを作成する。
    ///
    /// # Errors
    /// URLのパースまたはHTTPクライアントの構築に失敗した場合はエラーを返します。
    pub fn new(config: &ParserConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.total_timeout)
            .build()
            .context("failed to build parser HTTP client")?;

        let base_url = Url::parse(&config.base_url).context("invalid parser base URL")?;

        Ok(Self {
            client,
            base_url,
            service_token: config.service_token.clone(),
        })
    }
}

#[async_trait]
impl CaptionParser for HttpParserClient {
    async fn parse(&self, sentences: &[String]) -> Result<Vec<ParsedSentence>> {
        if sentences.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = sentences.len(), "parsing sentences in batch");

        let url = self
            .base_url
            .join("api/v1/parse")
            .context("failed to build parse URL")?;

        let request_body = ParseRequest {
            sentences: sentences.to_vec(),
        };

        let mut request = self.client.post(url).json(&request_body);

        // Add service authentication token if configured
        if let Some(ref token) = self.service_token {
            request = request.header("X-Service-Token", token);
        }

        let response = request.send().await.context("parser request failed")?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("parser returned error status {}: {}", status, error_body);
        }

        let parse_response: ParseResponse = response
            .json()
            .await
            .context("failed to deserialize parser response")?;

        if !parse_response.success {
            anyhow::bail!("parser returned success=false");
        }

        if parse_response.sentences.len() != sentences.len() {
            anyhow::bail!(
                "parser returned {} sentences for {} inputs",
                parse_response.sentences.len(),
                sentences.len()
            );
        }

        Ok(parse_response.sentences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> ParserConfig {
        ParserConfig {
            base_url,
            connect_timeout: Duration::from_secs(3),
            total_timeout: Duration::from_secs(30),
            service_token: Some("test-token".to_string()),
        }
    }

    fn sentence_json() -> serde_json::Value {
        serde_json::json!({
            "tokens": [
                {"text": "man", "pos": "NOUN", "dep": "nsubj", "head": 1,
                 "is_stop": false, "is_punct": false},
                {"text": "talks", "pos": "VERB", "dep": "ROOT", "head": null,
                 "is_stop": false, "is_punct": false}
            ],
            "noun_chunks": [{"start": 0, "end": 1}]
        })
    }

    #[tokio::test]
    async fn parse_returns_sentences() {
        let server = MockServer::start().await;

        let request_body = serde_json::json!({
            "sentences": ["A man talks."]
        });
        let response_body = serde_json::json!({
            "success": true,
            "sentences": [sentence_json()]
        });

        Mock::given(method("POST"))
            .and(path("/api/v1/parse"))
            .and(header("X-Service-Token", "test-token"))
            .and(body_json(&request_body))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&server)
            .await;

        let client = HttpParserClient::new(&test_config(server.uri())).expect("client should build");
        let sentences = client
            .parse(&["A man talks.".to_string()])
            .await
            .expect("parse should succeed");

        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].tokens.len(), 2);
        assert_eq!(sentences[0].tokens[0].text, "man");
        assert_eq!(sentences[0].tokens[1].head, None);
        assert_eq!(sentences[0].noun_chunks.len(), 1);
    }

    #[tokio::test]
    async fn parse_handles_empty_input_without_a_request() {
        let client = HttpParserClient::new(&test_config("http://localhost:9010".to_string()))
            .expect("client should build");
        let sentences = client.parse(&[]).await.expect("parse should succeed");

        assert!(sentences.is_empty());
    }

    #[tokio::test]
    async fn parse_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/parse"))
            .respond_with(ResponseTemplate::new(500).set_body_string("parser crashed"))
            .mount(&server)
            .await;

        let client = HttpParserClient::new(&test_config(server.uri())).expect("client should build");
        let error = client
            .parse(&["A man talks.".to_string()])
            .await
            .expect_err("parse should fail");

        assert!(error.to_string().contains("500"));
    }

    #[tokio::test]
    async fn parse_rejects_count_mismatch() {
        let server = MockServer::start().await;
        let response_body = serde_json::json!({
            "success": true,
            "sentences": []
        });
        Mock::given(method("POST"))
            .and(path("/api/v1/parse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&server)
            .await;

        let client = HttpParserClient::new(&test_config(server.uri())).expect("client should build");
        let error = client
            .parse(&["A man talks.".to_string()])
            .await
            .expect_err("parse should fail");

        assert!(error.to_string().contains("0 sentences for 1 inputs"));
    }

    #[tokio::test]
    async fn parse_rejects_unsuccessful_response() {
        let server = MockServer::start().await;
        let response_body = serde_json::json!({
            "success": false,
            "sentences": []
        });
        Mock::given(method("POST"))
            .and(path("/api/v1/parse"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&server)
            .await;

        let client = HttpParserClient::new(&test_config(server.uri())).expect("client should build");
        let error = client
            .parse(&["A man talks.".to_string()])
            .await
            .expect_err("parse should fail");

        assert!(error.to_string().contains("success=false"));
    }
}
