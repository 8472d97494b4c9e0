//! The remote generative-model endpoint.
//!
//! [`ModelBackend`] captures the two call shapes the chat flow needs: a
//! streamed chat turn carrying a system instruction and prior history, and a
//! one-shot generation that can be constrained to JSON output.
//! [`HttpBackend`] talks to an OpenAI-compatible `chat/completions` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use tracing::debug;

use crate::api::{ChatMessage, ChatRequest, CompletionResponse, ResponseFormat};
use crate::core::chat_stream::{format_api_error, fragment_stream};
use crate::core::error::ChatError;
use crate::utils::url::construct_api_url;

/// Text fragments of one generation, in generation order.
pub type FragmentStream = BoxStream<'static, Result<String, ChatError>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurnRequest {
    pub model: String,
    pub system_instruction: String,
    pub history: Vec<ChatMessage>,
    pub text: String,
}

impl ChatTurnRequest {
    /// System instruction first, then the history, then the new user text.
    pub fn into_api_messages(self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if !self.system_instruction.trim().is_empty() {
            messages.push(ChatMessage::system(self.system_instruction));
        }
        messages.extend(self.history);
        messages.push(ChatMessage::user(self.text));
        messages
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub json_output: bool,
}

#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Starts a streamed reply. Failures after the stream has started arrive
    /// as `Err` items inside the stream.
    async fn stream_chat(&self, request: ChatTurnRequest) -> Result<FragmentStream, ChatError>;

    /// Single round trip returning the full text of the answer.
    async fn generate(&self, request: GenerateRequest) -> Result<String, ChatError>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, ChatError> {
        // No whole-request timeout on the client: it would cut long streams.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| ChatError::Initialization(format!("HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            request_timeout,
        })
    }

    fn post(&self, body: &ChatRequest) -> reqwest::RequestBuilder {
        self.client
            .post(construct_api_url(&self.base_url, "chat/completions"))
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
    }
}

async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    format!("{} ({status})", format_api_error(&text))
}

#[async_trait]
impl ModelBackend for HttpBackend {
    async fn stream_chat(&self, request: ChatTurnRequest) -> Result<FragmentStream, ChatError> {
        let body = ChatRequest {
            model: request.model.clone(),
            messages: request.into_api_messages(),
            stream: true,
            response_format: None,
        };
        debug!(model = %body.model, messages = body.messages.len(), "starting chat stream");

        let response = self
            .post(&body)
            .send()
            .await
            .map_err(|err| ChatError::Generation(format_api_error(&err.to_string())))?;

        if !response.status().is_success() {
            return Err(ChatError::Generation(error_body(response).await));
        }

        Ok(fragment_stream(response.bytes_stream()))
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, ChatError> {
        let body = ChatRequest {
            model: request.model,
            messages: vec![ChatMessage::user(request.prompt)],
            stream: false,
            response_format: request.json_output.then(ResponseFormat::json_object),
        };

        let response = self
            .post(&body)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|err| ChatError::Generation(format_api_error(&err.to_string())))?;

        if !response.status().is_success() {
            return Err(ChatError::Generation(error_body(response).await));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|err| ChatError::Generation(format!("invalid completion body: {err}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ChatError::Generation("empty response from model".to_string()))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accepts one connection, captures the request body and replies with
    /// the canned response.
    async fn serve_once(response: String) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buffer = Vec::new();
            let mut chunk = [0_u8; 4096];
            let body = loop {
                let read = stream.read(&mut chunk).await.unwrap();
                assert!(read > 0, "client closed before sending a full request");
                buffer.extend_from_slice(&chunk[..read]);
                let Some(header_end) = buffer
                    .windows(4)
                    .position(|w| w == b"\r\n\r\n")
                    .map(|i| i + 4)
                else {
                    continue;
                };
                let headers = String::from_utf8_lossy(&buffer[..header_end]).to_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buffer.len() >= header_end + content_length {
                    break String::from_utf8_lossy(&buffer[header_end..header_end + content_length])
                        .to_string();
                }
            };
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            body
        });
        (format!("http://{addr}/v1/"), handle)
    }

    fn http_response(status: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn turn(text: &str) -> ChatTurnRequest {
        ChatTurnRequest {
            model: "test-model".into(),
            system_instruction: "be kind".into(),
            history: vec![
                ChatMessage::user("earlier"),
                ChatMessage::new("assistant", "earlier reply"),
            ],
            text: text.into(),
        }
    }

    #[test]
    fn api_messages_put_system_first_and_new_text_last() {
        let messages = turn("now").into_api_messages();
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(messages.last().unwrap().content, "now");
    }

    #[tokio::test]
    async fn stream_chat_decodes_sse_body() {
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"你\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"好\"}}]}\n\n",
            "data: [DONE]\n\n"
        );
        let (base_url, server) =
            serve_once(http_response("200 OK", "text/event-stream", sse)).await;
        let backend = HttpBackend::new(base_url, "secret", Duration::from_secs(5)).unwrap();

        let stream = backend.stream_chat(turn("hi")).await.unwrap();
        let fragments: Vec<String> = stream.map(|item| item.unwrap()).collect().await;
        assert_eq!(fragments.concat(), "你好");

        let request_body: serde_json::Value =
            serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(request_body["stream"], true);
        assert_eq!(request_body["model"], "test-model");
        assert_eq!(request_body["messages"][0]["role"], "system");
        assert_eq!(request_body["messages"][3]["content"], "hi");
    }

    #[tokio::test]
    async fn stream_chat_reports_http_errors_as_generation_errors() {
        let (base_url, _server) = serve_once(http_response(
            "401 Unauthorized",
            "application/json",
            r#"{"error":{"message":"bad key"}}"#,
        ))
        .await;
        let backend = HttpBackend::new(base_url, "wrong", Duration::from_secs(5)).unwrap();

        match backend.stream_chat(turn("hi")).await {
            Err(ChatError::Generation(message)) => {
                assert!(message.contains("bad key"), "{message}");
                assert!(message.contains("401"), "{message}");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[tokio::test]
    async fn generate_requests_json_mode_and_returns_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"[\"a\",\"b\",\"c\"]"}}]}"#;
        let (base_url, server) =
            serve_once(http_response("200 OK", "application/json", body)).await;
        let backend = HttpBackend::new(base_url, "secret", Duration::from_secs(5)).unwrap();

        let answer = backend
            .generate(GenerateRequest {
                model: "utility".into(),
                prompt: "suggest".into(),
                json_output: true,
            })
            .await
            .unwrap();
        assert_eq!(answer, r#"["a","b","c"]"#);

        let request_body: serde_json::Value =
            serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(request_body["stream"], false);
        assert_eq!(request_body["response_format"]["type"], "json_object");
    }

    #[tokio::test]
    async fn generate_rejects_empty_answers() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  "}}]}"#;
        let (base_url, _server) =
            serve_once(http_response("200 OK", "application/json", body)).await;
        let backend = HttpBackend::new(base_url, "secret", Duration::from_secs(5)).unwrap();

        let result = backend
            .generate(GenerateRequest {
                model: "utility".into(),
                prompt: "classify".into(),
                json_output: false,
            })
            .await;
        assert!(matches!(result, Err(ChatError::Generation(_))));
    }
}
