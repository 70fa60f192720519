//! `/chatlaya/*` endpoints: search, chat, ask, feedback and ingest.

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::path::Path;

use crate::client::{ApiClient, RequestOptions};
use crate::error::{ClientError, Result};
use crate::models::{
    ChatReply, FeedbackAck, FeedbackRequest, Message, Rating, RawChatResponse, SearchHit, SearchResponse,
};

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<&'a str>,
}

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

/// A document queued for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl IngestFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { name, bytes })
    }
}

impl ApiClient {
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::validation("Search query is empty"));
        }

        let options = RequestOptions::get().query("query", query).query("limit", limit);
        let response: SearchResponse = self.request("/chatlaya/search", options).await?;
        tracing::debug!(query, hits = response.hits.len(), "search complete");
        Ok(response.hits)
    }

    /// Send the whole conversation; the backend answers the last user message.
    pub async fn chat(&self, messages: &[Message], top_k: Option<u32>) -> Result<ChatReply> {
        self.chat_with_intent(messages, top_k, None).await
    }

    /// Same as [`ApiClient::chat`] with an explicit intent hint ("qa",
    /// "summarize", ...). Without one the backend detects it from the prompt.
    pub async fn chat_with_intent(
        &self,
        messages: &[Message],
        top_k: Option<u32>,
        intent: Option<&str>,
    ) -> Result<ChatReply> {
        if messages.is_empty() {
            return Err(ClientError::validation("Nothing to send"));
        }

        let intent = intent.map(str::trim).filter(|i| !i.is_empty());
        let options = RequestOptions::post_json(&ChatRequest {
            messages,
            top_k,
            intent,
        })?;
        let raw: RawChatResponse = self.request("/chatlaya/chat", options).await?;
        Ok(raw.into())
    }

    /// Single-question endpoint without history.
    pub async fn ask(&self, question: &str, top_k: Option<u32>) -> Result<ChatReply> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ClientError::validation("Question is empty"));
        }

        let options = RequestOptions::post_json(&AskRequest { question, top_k })?;
        let raw: RawChatResponse = self.request("/chatlaya/ask", options).await?;
        Ok(raw.into())
    }

    pub async fn feedback(
        &self,
        message_id: Option<i64>,
        rating: Rating,
        comment: Option<&str>,
    ) -> Result<FeedbackAck> {
        let body = FeedbackRequest {
            message_id,
            rating,
            comment: comment.map(str::trim).filter(|c| !c.is_empty()),
        };
        let options = RequestOptions::post_json(&body)?;
        self.request("/chatlaya/feedback", options).await
    }

    /// Upload documents for indexing. Returns `Ok(None)` without touching the
    /// network when `files` is empty; otherwise the raw response body.
    ///
    /// Indexing happens asynchronously on the server, so a 2xx only means the
    /// upload was accepted.
    pub async fn ingest(&self, files: Vec<IngestFile>) -> Result<Option<String>> {
        if files.is_empty() {
            return Ok(None);
        }

        let count = files.len();
        let mut form = Form::new();
        for file in files {
            form = form.part("file", Part::bytes(file.bytes).file_name(file.name));
        }

        let body = self.request_text("/chatlaya/ingest", RequestOptions::multipart(form)).await?;
        tracing::info!(files = count, "upload accepted");
        Ok(Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Port 9 is discard; any request sent there would fail with Transport,
    // so these only pass if validation short-circuits first.
    fn offline() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9")
    }

    #[tokio::test]
    async fn test_blank_search_is_rejected_locally() {
        let err = offline().search("   ", 5).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected_locally() {
        let err = offline().ask("", None).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_history_is_rejected_locally() {
        let err = offline().chat(&[], Some(4)).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_ingest_without_files_is_noop() {
        assert_eq!(offline().ingest(Vec::new()).await.unwrap(), None);
    }

    #[test]
    fn test_chat_request_omits_missing_top_k() {
        let messages = vec![Message::user("salut")];
        let body = serde_json::to_value(ChatRequest {
            messages: &messages,
            top_k: None,
            intent: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"messages": [{"role": "user", "content": "salut"}]}));
    }

    #[test]
    fn test_chat_request_carries_intent() {
        let messages = vec![Message::user("résume ce document")];
        let body = serde_json::to_value(ChatRequest {
            messages: &messages,
            top_k: Some(4),
            intent: Some("summarize"),
        })
        .unwrap();
        assert_eq!(body["intent"], serde_json::json!("summarize"));
        assert_eq!(body["top_k"], serde_json::json!(4));
    }
}
