//! Model-backed analysis over a messages-style HTTP API.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

use crate::analysis::{recommendations_for, summarize, AnalysisEngine, FALLBACK_INSIGHT};
use crate::config::RemoteConfig;
use crate::diary_entry::{Analysis, Sentiment};
use crate::error::{DiaryError, Result};

const API_VERSION: &str = "2023-06-01";

const PROMPT: &str = "You are reviewing a personal journal entry. Reply with a single JSON object \
and nothing else, shaped as {\"sentiment\": \"positive\" | \"neutral\" | \"negative\" | \"mixed\", \
\"summary\": string, \"insights\": [string], \"recommendations\": [string]}. Keep insights and \
recommendations short. The entry follows.\n\n";

pub struct RemoteEngine {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct ModelAnalysis {
    sentiment: Sentiment,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    insights: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

impl RemoteEngine {
    /// Returns `None` unless both endpoint and API key are set.
    pub fn from_config(config: &RemoteConfig) -> Option<Self> {
        if config.endpoint.trim().is_empty() || config.api_key.trim().is_empty() {
            return None;
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .ok()?;

        Some(RemoteEngine {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    async fn call_model(&self, content: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: format!("{PROMPT}{content}"),
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "analysis endpoint rejected the request");
            return Err(DiaryError::EngineFailure(format!(
                "endpoint returned {status}"
            )));
        }

        let body: MessagesResponse = response.json().await?;
        body.content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| DiaryError::EngineFailure("response had no content".to_string()))
    }
}

/// Extracts the JSON object from the model reply, tolerating surrounding prose or fences.
fn parse_model_reply(reply: &str) -> Result<ModelAnalysis> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => {
            return Err(DiaryError::EngineFailure(
                "model reply did not contain a JSON object".to_string(),
            ))
        }
    };
    serde_json::from_str(json)
        .map_err(|e| DiaryError::EngineFailure(format!("unreadable model reply: {e}")))
}

/// Fills any empty field so the result upholds the same guarantees as the heuristic engine.
fn complete(model: ModelAnalysis, content: &str) -> Analysis {
    let summary = if model.summary.trim().is_empty() {
        summarize(content)
    } else {
        model.summary
    };

    let mut insights: Vec<String> = model
        .insights
        .into_iter()
        .filter(|i| !i.trim().is_empty())
        .collect();
    if insights.is_empty() {
        insights.push(FALLBACK_INSIGHT.to_string());
    }

    let mut recommendations: Vec<String> = model
        .recommendations
        .into_iter()
        .filter(|r| !r.trim().is_empty())
        .collect();
    if recommendations.is_empty() {
        recommendations = recommendations_for(model.sentiment)
            .iter()
            .map(|r| r.to_string())
            .collect();
    }

    Analysis {
        sentiment: model.sentiment,
        summary,
        insights,
        recommendations,
        generated_at: Utc::now(),
    }
}

#[async_trait]
impl AnalysisEngine for RemoteEngine {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn analyze(&self, content: &str) -> Result<Analysis> {
        if content.is_empty() {
            return Err(DiaryError::InvalidInput);
        }

        let reply = self.call_model(content).await?;
        let analysis = complete(parse_model_reply(&reply)?, content);
        debug!(sentiment = %analysis.sentiment, model = %self.model, "remote analysis complete");
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine_for(server: &MockServer) -> RemoteEngine {
        RemoteEngine::from_config(&RemoteConfig {
            endpoint: format!("{}/v1/messages", server.uri()),
            api_key: "test-key".to_string(),
            ..RemoteConfig::default()
        })
        .unwrap()
    }

    fn reply_with(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": text }]
        }))
    }

    #[tokio::test]
    async fn parses_model_analysis() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", API_VERSION))
            .respond_with(reply_with(
                r#"{"sentiment":"negative","summary":"A rough week.","insights":["Work is weighing on you"],"recommendations":["Take a walk"]}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let analysis = engine_for(&server).analyze("Rough week at work.").await.unwrap();
        assert_eq!(analysis.sentiment, Sentiment::Negative);
        assert_eq!(analysis.summary, "A rough week.");
        assert_eq!(analysis.insights, vec!["Work is weighing on you"]);
        assert_eq!(analysis.recommendations, vec!["Take a walk"]);
    }

    #[tokio::test]
    async fn fills_empty_fields_from_fallbacks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply_with(
                "Here you go:\n```json\n{\"sentiment\":\"mixed\",\"insights\":[]}\n```",
            ))
            .mount(&server)
            .await;

        let analysis = engine_for(&server).analyze("Up and down. Mostly fine.").await.unwrap();
        assert_eq!(analysis.sentiment, Sentiment::Mixed);
        assert_eq!(analysis.summary, "Up and down. Mostly fine.");
        assert_eq!(analysis.insights, vec![FALLBACK_INSIGHT]);
        assert_eq!(analysis.recommendations.len(), recommendations_for(Sentiment::Mixed).len());
    }

    #[tokio::test]
    async fn server_error_is_engine_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = engine_for(&server).analyze("anything").await;
        assert!(matches!(result, Err(DiaryError::EngineFailure(_))));
    }

    #[tokio::test]
    async fn garbage_reply_is_engine_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply_with("I'd rather not say."))
            .mount(&server)
            .await;

        let result = engine_for(&server).analyze("anything").await;
        assert!(matches!(result, Err(DiaryError::EngineFailure(_))));
    }

    #[tokio::test]
    async fn empty_content_never_reaches_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply_with("{}"))
            .expect(0)
            .mount(&server)
            .await;

        let result = engine_for(&server).analyze("").await;
        assert!(matches!(result, Err(DiaryError::InvalidInput)));
    }

    #[test]
    fn requires_endpoint_and_key() {
        assert!(RemoteEngine::from_config(&RemoteConfig::default()).is_none());
    }
}
