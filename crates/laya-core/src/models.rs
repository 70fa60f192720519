//! Wire types shared with the LAYA backend.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Speaker of a message sent to `/chatlaya/chat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Identifier of a hit. The backend sends signed or unsigned 64-bit integers
/// (vector store point ids) or strings; it is only ever compared and
/// displayed, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HitId {
    Int(i64),
    Uint(u64),
    Text(String),
}

impl fmt::Display for HitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitId::Int(n) => write!(f, "{}", n),
            HitId::Uint(n) => write!(f, "{}", n),
            HitId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for HitId {
    fn from(n: i64) -> Self {
        HitId::Int(n)
    }
}

impl From<&str> for HitId {
    fn from(s: &str) -> Self {
        HitId::Text(s.to_string())
    }
}

/// One retrieved snippet. Every payload field is optional, including the payload itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: HitId,
    #[serde(default, deserialize_with = "score_or_zero")]
    pub score: f64,
    #[serde(default)]
    pub payload: Option<Map<String, Value>>,
}

/// A `null` score reads as 0.0 instead of failing the whole response.
fn score_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

impl SearchHit {
    /// Payload value rendered as text. Strings are borrowed, numbers and
    /// booleans are formatted, anything else counts as absent.
    pub fn field(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.payload.as_ref()?.get(key)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<Cow<'_, str>> {
        self.field("text")
    }

    pub fn title(&self) -> Option<Cow<'_, str>> {
        self.field("title")
    }

    pub fn source(&self) -> Option<Cow<'_, str>> {
        self.field("source")
    }

    pub fn url(&self) -> Option<Cow<'_, str>> {
        self.field("url")
    }

    pub fn kind(&self) -> Option<Cow<'_, str>> {
        self.field("type")
    }

    /// Best label for a list row: title, then source, then the id.
    pub fn label(&self) -> String {
        self.title()
            .or_else(|| self.source())
            .map(Cow::into_owned)
            .unwrap_or_else(|| format!("#{}", self.id))
    }

    fn from_citation_text(index: usize, text: String) -> Self {
        let mut payload = Map::new();
        payload.insert("text".to_string(), Value::String(text));
        Self::from_citation_payload(index, payload)
    }

    /// A citation object that is not a full hit: its fields become the payload.
    fn from_citation_payload(index: usize, payload: Map<String, Value>) -> Self {
        Self {
            id: HitId::Int(index as i64),
            score: 0.0,
            payload: Some(payload),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub hits: Vec<SearchHit>,
}

/// A citation as sent by the backend: a full hit, a bare string, or any other
/// object (e.g. one without an id).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawCitation {
    Hit(SearchHit),
    Text(String),
    Other(Map<String, Value>),
}

/// Any of the chat response shapes the backend has used so far.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawChatResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    citations: Option<Vec<RawCitation>>,
    #[serde(default)]
    sources: Option<Vec<RawCitation>>,
    #[serde(default)]
    rag_error: Option<String>,
}

pub const FALLBACK_ANSWER: &str = "Response received.";

/// Normalized answer from `/chatlaya/chat` or `/chatlaya/ask`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub answer: String,
    pub citations: Vec<SearchHit>,
    pub rag_error: Option<String>,
}

impl From<RawChatResponse> for ChatReply {
    fn from(raw: RawChatResponse) -> Self {
        let answer = raw
            .answer
            .or(raw.message)
            .unwrap_or_else(|| FALLBACK_ANSWER.to_string());

        let citations = raw
            .citations
            .or(raw.sources)
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(i, c)| match c {
                RawCitation::Hit(hit) => hit,
                RawCitation::Text(text) => SearchHit::from_citation_text(i, text),
                RawCitation::Other(fields) => SearchHit::from_citation_payload(i, fields),
            })
            .collect();

        Self {
            answer,
            citations,
            rag_error: raw.rag_error.filter(|e| !e.trim().is_empty()),
        }
    }
}

/// Feedback score for an assistant answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Down,
    Neutral,
    Up,
}

impl Rating {
    pub fn value(self) -> i8 {
        match self {
            Rating::Down => -1,
            Rating::Neutral => 0,
            Rating::Up => 1,
        }
    }
}

impl TryFrom<i8> for Rating {
    type Error = String;

    fn try_from(v: i8) -> std::result::Result<Self, Self::Error> {
        match v {
            -1 => Ok(Rating::Down),
            0 => Ok(Rating::Neutral),
            1 => Ok(Rating::Up),
            other => Err(format!("rating must be -1, 0 or 1 (got {})", other)),
        }
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.value())
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let v = i8::deserialize(deserializer)?;
        Rating::try_from(v).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FeedbackRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<i64>,
    pub rating: Rating,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedbackAck {
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    Published,
    Archived,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Published => "published",
            ProjectStatus::Archived => "archived",
        }
    }

    pub fn all() -> [ProjectStatus; 3] {
        [ProjectStatus::Draft, ProjectStatus::Published, ProjectStatus::Archived]
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(ProjectStatus::Draft),
            "published" => Ok(ProjectStatus::Published),
            "archived" => Ok(ProjectStatus::Archived),
            other => Err(format!("unknown project status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of `POST /projects/`. Blank optional fields go out as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewProject {
    pub name: String,
    pub slug: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_id: Option<String>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub logo_url: Option<String>,
    pub status: Option<ProjectStatus>,
}

impl NewProject {
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Technology {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Person attached to a project, from `GET /contributors/project/{id}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Contributor {
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
}

impl Contributor {
    /// Name, then github handle, then email.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.github.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("(anonymous)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hit_without_payload() {
        let hit: SearchHit = serde_json::from_value(json!({"id": 3, "score": 0.5, "payload": null})).unwrap();
        assert_eq!(hit.id, HitId::Int(3));
        assert!(hit.text().is_none());
        assert!(hit.source().is_none());
        assert_eq!(hit.label(), "#3");
    }

    #[test]
    fn test_hit_field_formats_scalars() {
        let hit: SearchHit = serde_json::from_value(json!({
            "id": "doc-1",
            "score": 0.9,
            "payload": {"title": "Guide", "page": 4, "tags": ["a"]}
        }))
        .unwrap();
        assert_eq!(hit.title().as_deref(), Some("Guide"));
        assert_eq!(hit.field("page").as_deref(), Some("4"));
        assert!(hit.field("tags").is_none());
        assert_eq!(hit.label(), "Guide");
    }

    #[test]
    fn test_chat_reply_current_shape() {
        let raw: RawChatResponse = serde_json::from_value(json!({
            "answer": "Bonjour",
            "citations": [{"id": 1, "score": 0.8, "payload": {"source": "faq.md"}}]
        }))
        .unwrap();
        let reply = ChatReply::from(raw);
        assert_eq!(reply.answer, "Bonjour");
        assert_eq!(reply.citations.len(), 1);
        assert_eq!(reply.citations[0].source().as_deref(), Some("faq.md"));
    }

    #[test]
    fn test_chat_reply_legacy_shape() {
        let raw: RawChatResponse = serde_json::from_value(json!({
            "message": "legacy answer",
            "citations": ["doc a", "doc b"]
        }))
        .unwrap();
        let reply = ChatReply::from(raw);
        assert_eq!(reply.answer, "legacy answer");
        assert_eq!(reply.citations[1].text().as_deref(), Some("doc b"));
    }

    #[test]
    fn test_ask_reply_with_sources_and_rag_error() {
        let raw: RawChatResponse = serde_json::from_value(json!({
            "answer": "partial",
            "sources": [{"id": "x", "score": 0.2}],
            "rag_error": "qdrant unavailable"
        }))
        .unwrap();
        let reply = ChatReply::from(raw);
        assert_eq!(reply.citations[0].id, HitId::from("x"));
        assert_eq!(reply.rag_error.as_deref(), Some("qdrant unavailable"));
    }

    #[test]
    fn test_empty_reply_uses_fallback() {
        let reply = ChatReply::from(RawChatResponse::default());
        assert_eq!(reply.answer, FALLBACK_ANSWER);
        assert!(reply.citations.is_empty());
    }

    #[test]
    fn test_rating_wire_format() {
        assert_eq!(serde_json::to_value(Rating::Down).unwrap(), json!(-1));
        assert!(Rating::try_from(2).is_err());
        let body = FeedbackRequest {
            message_id: None,
            rating: Rating::Up,
            comment: Some("useful"),
        };
        assert_eq!(serde_json::to_value(body).unwrap(), json!({"rating": 1, "comment": "useful"}));
    }

    #[test]
    fn test_new_project_sends_nulls() {
        let mut p = NewProject::new("Laya", "laya");
        p.status = Some(ProjectStatus::Draft);
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["status"], json!("draft"));
        assert_eq!(v["title"], Value::Null);
    }

    #[test]
    fn test_unsigned_point_id() {
        let hit: SearchHit =
            serde_json::from_value(json!({"id": 10000000000000000000u64, "score": 0.5})).unwrap();
        assert_eq!(hit.id, HitId::Uint(10_000_000_000_000_000_000));
        assert_eq!(hit.label(), "#10000000000000000000");
    }

    #[test]
    fn test_null_score_reads_as_zero() {
        let hits: Vec<SearchHit> = serde_json::from_value(json!([
            {"id": 1, "score": null, "payload": {"text": "a"}},
            {"id": 2}
        ]))
        .unwrap();
        assert_eq!(hits[0].score, 0.0);
        assert_eq!(hits[1].score, 0.0);
    }

    #[test]
    fn test_citation_without_id_keeps_fields() {
        let raw: RawChatResponse = serde_json::from_value(json!({
            "answer": "ok",
            "citations": [
                {"id": 7, "score": 0.3},
                {"title": "Guide", "source": "guide.pdf"}
            ]
        }))
        .unwrap();
        let reply = ChatReply::from(raw);
        assert_eq!(reply.citations.len(), 2);
        assert_eq!(reply.citations[1].title().as_deref(), Some("Guide"));
        assert_eq!(reply.citations[1].source().as_deref(), Some("guide.pdf"));
    }

    #[test]
    fn test_domain_id_only_sent_when_set() {
        let mut p = NewProject::new("Laya", "laya");
        assert!(serde_json::to_value(&p).unwrap().get("domain_id").is_none());
        p.domain_id = Some("d1".into());
        assert_eq!(serde_json::to_value(&p).unwrap()["domain_id"], json!("d1"));
    }

    #[test]
    fn test_contributor_display_name() {
        let c: Contributor = serde_json::from_value(json!({
            "id": "c1", "project_id": "p1", "github": "octo"
        }))
        .unwrap();
        assert_eq!(c.display_name(), "octo");
    }

    #[test]
    fn test_project_status_parse() {
        assert_eq!("Published".parse::<ProjectStatus>().unwrap(), ProjectStatus::Published);
        assert!("live".parse::<ProjectStatus>().is_err());
    }
}
