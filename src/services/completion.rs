use crate::models::ChatTurn;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Reply used when no completion provider is configured
pub const FALLBACK_REPLY: &str =
    "Recebemos sua mensagem. Nossa equipe de enfermagem vai analisá-la e entrar em contato em breve.";

/// Anthropic API revision sent with every Messages request
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Chat API flavour spoken by the completion client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionProvider {
    /// `POST {base}/chat/completions` with bearer auth
    #[default]
    OpenAi,
    /// `POST {base}/messages` with `x-api-key`
    Anthropic,
}

impl CompletionProvider {
    pub fn default_base_url(self) -> &'static str {
        match self {
            CompletionProvider::OpenAi => "https://api.openai.com/v1",
            CompletionProvider::Anthropic => "https://api.anthropic.com/v1",
        }
    }
}

/// Errors that can occur when calling the completion provider
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Chat completion client for conversational replies, OpenAI-compatible by
/// default or Anthropic via [`with_provider`](Self::with_provider).
///
/// The reply text is opaque to triage: symptom detection never depends on it.
pub struct CompletionClient {
    provider: CompletionProvider,
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
    temperature: f32,
    max_tokens: u32,
}

impl CompletionClient {
    pub fn new(base_url: String, api_key: String, model: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            provider: CompletionProvider::OpenAi,
            base_url,
            api_key,
            model,
            client,
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    pub fn with_provider(mut self, provider: CompletionProvider) -> Self {
        self.provider = provider;
        self
    }

    pub fn provider(&self) -> CompletionProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate the assistant reply for the latest patient message
    pub async fn reply(
        &self,
        message: &str,
        patient_context: &Map<String, Value>,
        history: &[ChatTurn],
    ) -> Result<String, CompletionError> {
        let system_prompt = build_system_prompt(patient_context);

        let mut turns: Vec<ChatMessage> = history
            .iter()
            .map(|turn| ChatMessage {
                role: &turn.role,
                content: &turn.content,
            })
            .collect();
        turns.push(ChatMessage {
            role: "user",
            content: message,
        });

        tracing::debug!(
            provider = ?self.provider,
            model = %self.model,
            turns = history.len(),
            "Requesting completion"
        );

        match self.provider {
            CompletionProvider::OpenAi => self.chat_completion(&system_prompt, turns).await,
            CompletionProvider::Anthropic => self.anthropic_message(&system_prompt, turns).await,
        }
    }

    async fn chat_completion(
        &self,
        system_prompt: &str,
        turns: Vec<ChatMessage<'_>>,
    ) -> Result<String, CompletionError> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(ChatMessage {
            role: "system",
            content: system_prompt,
        });
        messages.extend(turns);

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CompletionError::InvalidResponse("No completion choices".into()))
    }

    async fn anthropic_message(
        &self,
        system_prompt: &str,
        turns: Vec<ChatMessage<'_>>,
    ) -> Result<String, CompletionError> {
        // The Messages API carries the system prompt outside the turn list
        let messages = turns.into_iter().filter(|m| m.role != "system").collect();

        let body = MessagesRequest {
            model: &self.model,
            system: system_prompt,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint("messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| CompletionError::InvalidResponse("No text content block".into()))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, CompletionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
    Err(CompletionError::ApiError {
        status: status.as_u16(),
        body,
    })
}

fn context_field<'a>(ctx: &'a Map<String, Value>, key: &str, default: &'a str) -> &'a str {
    ctx.get(key).and_then(Value::as_str).unwrap_or(default)
}

/// System prompt framing the assistant for one patient
pub fn build_system_prompt(patient_context: &Map<String, Value>) -> String {
    format!(
        "You are a virtual health assistant talking with oncology patients over WhatsApp. \
Reply in Brazilian Portuguese, in simple and empathetic language, one question at a time.

Goals:
1. Collect symptoms and quality-of-life information conversationally
2. Flag critical symptoms that need immediate attention
3. Never diagnose or prescribe

Critical symptoms (tell the patient the care team is being notified):
- Fever above 38°C
- Severe shortness of breath
- Active bleeding
- Intense pain (8-10/10)
- Persistent nausea or vomiting
- Signs of infection

Always ask about fever when the patient reports feeling unwell.

Patient context:
Name: {}
Cancer type: {}
Current treatment: {}
",
        context_field(patient_context, "name", "Paciente"),
        context_field(patient_context, "cancer_type", "not specified"),
        context_field(patient_context, "treatment", "not specified"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_prompt_uses_context() {
        let ctx = json!({"name": "Maria", "cancer_type": "mama"});
        let prompt = build_system_prompt(ctx.as_object().unwrap());

        assert!(prompt.contains("Name: Maria"));
        assert!(prompt.contains("Cancer type: mama"));
        assert!(prompt.contains("Current treatment: not specified"));
    }

    #[tokio::test]
    async fn test_reply_parses_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Olá!"}}]}"#)
            .create_async()
            .await;

        let client = CompletionClient::new(
            server.url(),
            "sk-test".to_string(),
            "gpt-4".to_string(),
            Duration::from_secs(5),
        );
        let history = vec![ChatTurn {
            role: "assistant".to_string(),
            content: "Como você está?".to_string(),
        }];

        let reply = client.reply("bem", &Map::new(), &history).await.unwrap();
        assert_eq!(reply, "Olá!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_reply_surfaces_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let client = CompletionClient::new(
            server.url(),
            "sk-test".to_string(),
            "gpt-4".to_string(),
            Duration::from_secs(5),
        );

        let err = client.reply("oi", &Map::new(), &[]).await.unwrap_err();
        assert!(matches!(err, CompletionError::ApiError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_anthropic_reply_reads_text_block() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "sk-ant")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": "claude-3-5-sonnet-latest",
                "max_tokens": 500,
                "messages": [{"role": "user", "content": "oi"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content":[{"type":"text","text":"Olá, tudo bem?"}]}"#)
            .create_async()
            .await;

        let client = CompletionClient::new(
            server.url(),
            "sk-ant".to_string(),
            "claude-3-5-sonnet-latest".to_string(),
            Duration::from_secs(5),
        )
        .with_provider(CompletionProvider::Anthropic);

        assert_eq!(client.provider(), CompletionProvider::Anthropic);
        let reply = client.reply("oi", &Map::new(), &[]).await.unwrap();
        assert_eq!(reply, "Olá, tudo bem?");
        mock.assert_async().await;
    }

    #[test]
    fn test_provider_base_urls() {
        assert_eq!(CompletionProvider::default(), CompletionProvider::OpenAi);
        assert_eq!(
            CompletionProvider::Anthropic.default_base_url(),
            "https://api.anthropic.com/v1"
        );
    }
}
