use std::env;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{ChatRequest, ChatResponse, Message, ResponseFormat};
use super::{PlannerError, QueryPlanner, parse_query_plan};

const API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-2024-08-06";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);
const TEMPERATURE: f32 = 0.5;
const MAX_TOKENS: u32 = 500;

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

const PLAN_PROMPT: &str = r#"Formulate search engine queries for the event question below. The question has only two outcomes: the event either occurs or it does not.

* Write 1 to 5 unique queries likely to surface recent, relevant information for judging how likely the event is.
* Queries must not overlap or yield the same set of results.
* Respond with a single JSON object {"queries": [...]} and nothing else.

EVENT QUESTION:
```
{question}
```"#;

#[derive(Clone)]
struct ApiKey(String);

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Query planner backed by an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatPlanner {
    http: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl ChatPlanner {
    pub fn from_env(http: Client) -> Result<Self, PlannerError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| PlannerError::ApiKeyNotSet)?;
        if api_key.trim().is_empty() {
            return Err(PlannerError::ApiKeyNotSet);
        }
        let model = env::var("OPENAI_MODEL")
            .ok()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Ok(Self {
            http,
            api_key: ApiKey(api_key.trim().to_string()),
            model,
            base_url: API_BASE.to_string(),
        })
    }

    pub fn with_base_url(http: Client, api_key: &str, base_url: &str) -> Self {
        Self {
            http,
            api_key: ApiKey(api_key.to_string()),
            model: DEFAULT_MODEL.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn complete(&self, prompt: String) -> Result<String, PlannerError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: Some(SYSTEM_PROMPT.to_string()),
                },
                Message {
                    role: "user".to_string(),
                    content: Some(prompt),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key.0)
            .header("User-Agent", crate::USER_AGENT)
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("planner API rate limited");
            return Err(PlannerError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ChatResponse>(&text)
                .ok()
                .and_then(|body| body.error)
                .and_then(|err| err.message)
                .unwrap_or_else(|| {
                    let end = text.floor_char_boundary(200);
                    format!("HTTP {status}: {}", &text[..end])
                });
            warn!(status = %status, "planner API error");
            return Err(PlannerError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        if let Some(err) = body.error {
            return Err(PlannerError::Api {
                code: status.as_u16(),
                message: err.message.unwrap_or_else(|| "Unknown error".to_string()),
            });
        }

        body.choices
            .and_then(|choices| choices.into_iter().next())
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(PlannerError::EmptyResponse)
    }
}

impl QueryPlanner for ChatPlanner {
    async fn plan(&self, question: &str) -> Result<Vec<String>, PlannerError> {
        let content = self.complete(PLAN_PROMPT.replace("{question}", question)).await?;
        let queries = parse_query_plan(&content)?;
        debug!(model = %self.model, queries = queries.len(), "query plan ready");
        Ok(queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": content}
            }]
        })
    }

    #[tokio::test]
    async fn plan_returns_parsed_queries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"queries": ["x election result", "x election date"]}"#,
            )))
            .mount(&server)
            .await;

        let planner = ChatPlanner::with_base_url(Client::new(), "test-key", &server.uri());
        let queries = planner.plan("Will X win the election?").await.unwrap();

        assert_eq!(queries, vec!["x election result", "x election date"]);
    }

    #[tokio::test]
    async fn plan_can_run_on_a_spawned_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion(r#"{"queries": ["q"]}"#)),
            )
            .mount(&server)
            .await;

        let planner = ChatPlanner::with_base_url(Client::new(), "k", &server.uri());
        let queries = tokio::spawn(async move { planner.plan("Will it open?").await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(queries, vec!["q"]);
    }

    #[tokio::test]
    async fn plan_prompt_contains_question() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion(r#"{"queries": ["q"]}"#)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let planner = ChatPlanner::with_base_url(Client::new(), "k", &server.uri());
        planner.plan("Will the bridge open?").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = requests[0].body_json().unwrap();
        let user = body["messages"][1]["content"].as_str().unwrap();
        assert!(user.contains("Will the bridge open?"));
    }

    #[tokio::test]
    async fn plan_429_returns_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let planner = ChatPlanner::with_base_url(Client::new(), "k", &server.uri());
        assert!(matches!(
            planner.plan("q").await,
            Err(PlannerError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn plan_api_error_uses_body_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"code": "invalid_api_key", "message": "Incorrect API key"}
            })))
            .mount(&server)
            .await;

        let planner = ChatPlanner::with_base_url(Client::new(), "k", &server.uri());
        match planner.plan("q").await {
            Err(PlannerError::Api { code: 401, message }) => {
                assert_eq!(message, "Incorrect API key");
            }
            other => panic!("expected Api(401), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn plan_empty_content_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("  ")))
            .mount(&server)
            .await;

        let planner = ChatPlanner::with_base_url(Client::new(), "k", &server.uri());
        assert!(matches!(
            planner.plan("q").await,
            Err(PlannerError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn plan_refusal_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Error")))
            .mount(&server)
            .await;

        let planner = ChatPlanner::with_base_url(Client::new(), "k", &server.uri());
        assert!(matches!(
            planner.plan("q").await,
            Err(PlannerError::Malformed(_))
        ));
    }
}
