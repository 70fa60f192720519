//! UI-agnostic view state for the search, chat and project screens.
//!
//! Controllers never touch the network themselves. A UI calls `begin*` to
//! move into the loading state and get the request arguments, performs the
//! call however it likes (a spawned task, a blocking CLI await...), then hands
//! the outcome to `finish*`. The async `run` helpers chain the three steps for
//! callers that simply await.
//!
//! There is no cancellation: if two searches overlap, whichever response
//! arrives last wins. Results are replaced wholesale, never merged.

use serde::{Deserialize, Serialize};

use crate::api::{validate_new_project, IngestFile};
use crate::client::ApiClient;
use crate::config::{DEFAULT_ERROR_PREFIX, DEFAULT_SEARCH_LIMIT};
use crate::error::{ClientError, DisplayError};
use crate::facets::{self, Facet, ALL};
use crate::models::{ChatReply, Message, NewProject, Project, ProjectStatus, Role, SearchHit};

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStatus {
    #[default]
    Idle,
    Searching,
    Results,
    Errored,
}

/// Arguments for one search request, handed out by [`SearchController::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub query: String,
    pub limit: usize,
}

#[derive(Debug, Clone)]
pub struct SearchController {
    /// Text currently in the search box.
    pub query: String,
    pub limit: usize,
    status: SearchStatus,
    hits: Vec<SearchHit>,
    error: Option<DisplayError>,
    last_query: Option<String>,
    source_filter: String,
    type_filter: String,
}

impl Default for SearchController {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_LIMIT)
    }
}

impl SearchController {
    pub fn new(limit: usize) -> Self {
        Self {
            query: String::new(),
            limit,
            status: SearchStatus::Idle,
            hits: Vec::new(),
            error: None,
            last_query: None,
            source_filter: ALL.to_string(),
            type_filter: ALL.to_string(),
        }
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn is_searching(&self) -> bool {
        self.status == SearchStatus::Searching
    }

    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    pub fn error(&self) -> Option<&DisplayError> {
        self.error.as_ref()
    }

    /// Query of the most recently started search.
    pub fn last_query(&self) -> Option<&str> {
        self.last_query.as_deref()
    }

    /// Start a search for the current input. Previous results and error are
    /// cleared right away so nothing stale shows while the request is pending.
    pub fn begin(&mut self) -> Option<SearchTicket> {
        let query = self.query.trim().to_string();
        if query.is_empty() {
            return None;
        }

        self.hits.clear();
        self.error = None;
        self.status = SearchStatus::Searching;
        self.last_query = Some(query.clone());

        Some(SearchTicket {
            query,
            limit: self.limit,
        })
    }

    pub fn finish(&mut self, result: Result<Vec<SearchHit>, ClientError>) {
        match result {
            Ok(hits) => {
                self.hits = hits;
                self.error = None;
                self.status = SearchStatus::Results;
                self.reset_filters();
            }
            Err(e) => {
                tracing::warn!(error = %e, status = ?e.status(), "search failed");
                self.hits.clear();
                self.error = Some(DisplayError::from(e));
                self.status = SearchStatus::Errored;
            }
        }
    }

    pub async fn run(&mut self, api: &ApiClient) -> Option<SearchStatus> {
        let ticket = self.begin()?;
        let result = api.search(&ticket.query, ticket.limit).await;
        self.finish(result);
        Some(self.status)
    }

    /// Clear the input. Returns false when there was nothing to clear.
    pub fn clear_query(&mut self) -> bool {
        if self.query.is_empty() {
            return false;
        }
        self.query.clear();
        true
    }

    pub fn source_filter(&self) -> &str {
        &self.source_filter
    }

    pub fn type_filter(&self) -> &str {
        &self.type_filter
    }

    pub fn facet_values(&self, facet: Facet) -> Vec<String> {
        facets::facet_values(&self.hits, facet)
    }

    pub fn set_filter(&mut self, facet: Facet, value: &str) {
        match facet {
            Facet::Source => self.source_filter = value.to_string(),
            Facet::Type => self.type_filter = value.to_string(),
        }
    }

    /// Advance a facet selection to the next value, wrapping back to `all`.
    pub fn cycle_filter(&mut self, facet: Facet) {
        let values = self.facet_values(facet);
        let current = match facet {
            Facet::Source => &self.source_filter,
            Facet::Type => &self.type_filter,
        };
        let next = values
            .iter()
            .position(|v| v == current)
            .map(|i| (i + 1) % values.len())
            .unwrap_or(0);
        let value = values[next].clone();
        self.set_filter(facet, &value);
    }

    pub fn reset_filters(&mut self) {
        self.source_filter = ALL.to_string();
        self.type_filter = ALL.to_string();
    }

    /// Hits passing both facet selections, re-evaluated on every call.
    pub fn visible_hits(&self) -> Vec<&SearchHit> {
        facets::filter_hits(&self.hits, &self.source_filter, &self.type_filter)
    }
}

// ============================================================================
// Chat
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of the chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<SearchHit>,
    /// Set on assistant turns that report a failed request. These stay in the
    /// transcript but are not sent back to the backend as history.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            citations: Vec::new(),
            failed: false,
        }
    }

    pub fn assistant(text: impl Into<String>, citations: Vec<SearchHit>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            citations,
            failed: false,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            citations: Vec::new(),
            failed: true,
        }
    }

    pub fn to_message(&self) -> Message {
        Message {
            role: match self.role {
                ChatRole::User => Role::User,
                ChatRole::Assistant => Role::Assistant,
            },
            content: self.text.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatController {
    turns: Vec<ChatTurn>,
    thinking: bool,
    pub error_prefix: String,
    pub top_k: Option<u32>,
    /// Optional intent hint sent with every request.
    pub intent: Option<String>,
}

impl Default for ChatController {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_PREFIX)
    }
}

impl ChatController {
    pub fn new(error_prefix: impl Into<String>) -> Self {
        Self {
            turns: Vec::new(),
            thinking: false,
            error_prefix: error_prefix.into(),
            top_k: None,
            intent: None,
        }
    }

    /// Start from a transcript restored from disk.
    pub fn restore(&mut self, turns: Vec<ChatTurn>) {
        self.turns = turns;
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// History to send, oldest first, without failed turns.
    pub fn history(&self) -> Vec<Message> {
        self.turns
            .iter()
            .filter(|t| !t.failed)
            .map(ChatTurn::to_message)
            .collect()
    }

    /// Append the user's turn and return the messages to send. `None` for
    /// blank input or while a previous request is still outstanding.
    pub fn begin(&mut self, text: &str) -> Option<Vec<Message>> {
        let text = text.trim();
        if text.is_empty() || self.thinking {
            return None;
        }

        self.turns.push(ChatTurn::user(text));
        self.thinking = true;
        Some(self.history())
    }

    /// Append the assistant's turn. A failure becomes an inline error turn; the
    /// user's turn is always kept.
    pub fn finish(&mut self, result: Result<ChatReply, ClientError>) {
        self.thinking = false;
        let turn = match result {
            Ok(reply) => {
                let text = match reply.rag_error {
                    Some(note) => format!("{}\n\n(retrieval unavailable: {})", reply.answer, note),
                    None => reply.answer,
                };
                ChatTurn::assistant(text, reply.citations)
            }
            Err(e) => {
                tracing::warn!(error = %e, "chat request failed");
                ChatTurn::failure(format!("{}{}", self.error_prefix, DisplayError::from(e)))
            }
        };
        self.turns.push(turn);
    }

    pub async fn run(&mut self, api: &ApiClient, text: &str) -> Option<&ChatTurn> {
        let messages = self.begin(text)?;
        let result = api
            .chat_with_intent(&messages, self.top_k, self.intent.as_deref())
            .await;
        self.finish(result);
        self.turns.last()
    }
}

// ============================================================================
// Ingest
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct UploadController {
    uploading: bool,
    status: Option<String>,
    error: Option<DisplayError>,
}

impl UploadController {
    pub fn is_uploading(&self) -> bool {
        self.uploading
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn error(&self) -> Option<&DisplayError> {
        self.error.as_ref()
    }

    /// `None` (and no state change) when there is nothing to upload.
    pub fn begin(&mut self, files: Vec<IngestFile>) -> Option<Vec<IngestFile>> {
        if files.is_empty() || self.uploading {
            return None;
        }
        self.uploading = true;
        self.error = None;
        self.status = Some(format!("Uploading {} file(s)...", files.len()));
        Some(files)
    }

    /// Report a failure that happened before any request, e.g. an unreadable file.
    pub fn fail(&mut self, err: ClientError) {
        self.uploading = false;
        self.status = None;
        self.error = Some(DisplayError::from(err));
    }

    pub fn finish(&mut self, count: usize, result: Result<Option<String>, ClientError>) {
        self.uploading = false;
        match result {
            Ok(_) => {
                self.status = Some(format!("{} file(s) sent for indexing", count));
                self.error = None;
            }
            Err(e) => {
                self.status = None;
                self.error = Some(DisplayError::from(e));
            }
        }
    }
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// Project list, always refetched in full.
#[derive(Debug, Clone, Default)]
pub struct ProjectList {
    status: LoadStatus,
    projects: Vec<Project>,
    error: Option<DisplayError>,
}

impl ProjectList {
    pub fn status(&self) -> LoadStatus {
        self.status
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn error(&self) -> Option<&DisplayError> {
        self.error.as_ref()
    }

    pub fn begin(&mut self) {
        self.status = LoadStatus::Loading;
        self.error = None;
    }

    pub fn finish(&mut self, result: Result<Vec<Project>, ClientError>) {
        match result {
            Ok(projects) => {
                self.projects = projects;
                self.status = LoadStatus::Loaded;
            }
            Err(e) => {
                self.error = Some(DisplayError::from(e));
                self.status = LoadStatus::Errored;
            }
        }
    }

    pub async fn refresh(&mut self, api: &ApiClient) -> LoadStatus {
        self.begin();
        let result = api.list_projects().await;
        self.finish(result);
        self.status
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectField {
    Name,
    Slug,
    Title,
    Status,
    Description,
    RepoUrl,
    LiveUrl,
    LogoUrl,
}

impl ProjectField {
    pub fn all() -> [ProjectField; 8] {
        [
            ProjectField::Name,
            ProjectField::Slug,
            ProjectField::Title,
            ProjectField::Status,
            ProjectField::Description,
            ProjectField::RepoUrl,
            ProjectField::LiveUrl,
            ProjectField::LogoUrl,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProjectField::Name => "Name *",
            ProjectField::Slug => "Slug *",
            ProjectField::Title => "Title",
            ProjectField::Status => "Status",
            ProjectField::Description => "Description",
            ProjectField::RepoUrl => "Repo URL",
            ProjectField::LiveUrl => "Live URL",
            ProjectField::LogoUrl => "Logo URL",
        }
    }
}

/// Creation form. Fields hold raw input; trimming happens on submit.
#[derive(Debug, Clone, Default)]
pub struct ProjectForm {
    pub name: String,
    pub slug: String,
    pub title: String,
    pub status: String,
    pub description: String,
    pub repo_url: String,
    pub live_url: String,
    pub logo_url: String,
    submitting: bool,
    error: Option<DisplayError>,
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl ProjectForm {
    pub fn field_mut(&mut self, field: ProjectField) -> &mut String {
        match field {
            ProjectField::Name => &mut self.name,
            ProjectField::Slug => &mut self.slug,
            ProjectField::Title => &mut self.title,
            ProjectField::Status => &mut self.status,
            ProjectField::Description => &mut self.description,
            ProjectField::RepoUrl => &mut self.repo_url,
            ProjectField::LiveUrl => &mut self.live_url,
            ProjectField::LogoUrl => &mut self.logo_url,
        }
    }

    pub fn field(&self, field: ProjectField) -> &str {
        match field {
            ProjectField::Name => &self.name,
            ProjectField::Slug => &self.slug,
            ProjectField::Title => &self.title,
            ProjectField::Status => &self.status,
            ProjectField::Description => &self.description,
            ProjectField::RepoUrl => &self.repo_url,
            ProjectField::LiveUrl => &self.live_url,
            ProjectField::LogoUrl => &self.logo_url,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn error(&self) -> Option<&DisplayError> {
        self.error.as_ref()
    }

    pub fn to_payload(&self) -> Result<NewProject, ClientError> {
        let status = match optional(&self.status) {
            Some(s) => Some(s.parse::<ProjectStatus>().map_err(ClientError::Validation)?),
            None => None,
        };
        let payload = NewProject {
            name: self.name.trim().to_string(),
            slug: self.slug.trim().to_string(),
            title: optional(&self.title),
            description: optional(&self.description),
            domain_id: None,
            repo_url: optional(&self.repo_url),
            live_url: optional(&self.live_url),
            logo_url: optional(&self.logo_url),
            status,
        };
        validate_new_project(&payload)?;
        Ok(payload)
    }

    /// Validate locally. On failure the form keeps an error message and no
    /// payload is produced, so nothing is sent.
    pub fn begin_submit(&mut self) -> Option<NewProject> {
        if self.submitting {
            return None;
        }
        self.error = None;
        match self.to_payload() {
            Ok(payload) => {
                self.submitting = true;
                Some(payload)
            }
            Err(e) => {
                self.error = Some(DisplayError::from(e));
                None
            }
        }
    }

    pub fn finish_submit(&mut self, result: Result<Project, ClientError>) -> Option<Project> {
        self.submitting = false;
        match result {
            Ok(project) => {
                *self = ProjectForm::default();
                Some(project)
            }
            Err(e) => {
                self.error = Some(DisplayError::from(e));
                None
            }
        }
    }

    pub async fn submit(&mut self, api: &ApiClient) -> Option<Project> {
        let payload = self.begin_submit()?;
        let result = api.create_project(&payload).await;
        self.finish_submit(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HitId;
    use serde_json::json;

    fn sample_hits() -> Vec<SearchHit> {
        serde_json::from_value(json!([
            {"id": 1, "score": 0.9, "payload": {"source": "a", "type": "x"}},
            {"id": 2, "score": 0.4, "payload": {"source": "b", "type": "x"}}
        ]))
        .unwrap()
    }

    fn http_error() -> ClientError {
        ClientError::Http {
            status: 500,
            body: "boom".to_string(),
        }
    }

    #[test]
    fn test_search_begin_clears_previous_state() {
        let mut search = SearchController::default();
        search.query = "first".into();
        search.begin().unwrap();
        search.finish(Ok(sample_hits()));
        assert_eq!(search.status(), SearchStatus::Results);

        search.query = "second".into();
        let ticket = search.begin().unwrap();
        assert_eq!(ticket.query, "second");
        assert_eq!(search.status(), SearchStatus::Searching);
        assert!(search.hits().is_empty());
        assert!(search.error().is_none());
    }

    #[test]
    fn test_search_begin_clears_previous_error() {
        let mut search = SearchController::default();
        search.query = "x".into();
        search.begin().unwrap();
        search.finish(Err(http_error()));
        assert_eq!(search.status(), SearchStatus::Errored);
        assert_eq!(search.error().unwrap().message, "HTTP 500 - boom");

        search.begin().unwrap();
        assert!(search.error().is_none());
        assert!(search.is_searching());
    }

    #[test]
    fn test_blank_search_stays_idle() {
        let mut search = SearchController::default();
        search.query = "   ".into();
        assert!(search.begin().is_none());
        assert_eq!(search.status(), SearchStatus::Idle);
    }

    #[test]
    fn test_late_response_still_applied() {
        let mut search = SearchController::default();
        search.query = "old".into();
        search.begin().unwrap();
        search.query = "new".into();
        search.begin().unwrap();

        // newer answer arrives first, then the stale one overwrites it
        search.finish(Ok(sample_hits()));
        search.finish(Ok(Vec::new()));
        assert!(search.hits().is_empty());
        assert_eq!(search.last_query(), Some("new"));
    }

    #[test]
    fn test_filters_and_cycle() {
        let mut search = SearchController::default();
        search.query = "q".into();
        search.begin().unwrap();
        search.finish(Ok(sample_hits()));

        assert_eq!(search.facet_values(Facet::Source), vec!["all", "a", "b"]);
        search.cycle_filter(Facet::Source);
        assert_eq!(search.source_filter(), "a");
        let visible = search.visible_hits();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, HitId::Int(1));

        search.cycle_filter(Facet::Source);
        search.cycle_filter(Facet::Source);
        assert_eq!(search.source_filter(), ALL);
    }

    #[test]
    fn test_new_results_reset_filters() {
        let mut search = SearchController::default();
        search.set_filter(Facet::Type, "x");
        search.query = "q".into();
        search.begin().unwrap();
        search.finish(Ok(sample_hits()));
        assert_eq!(search.type_filter(), ALL);
    }

    #[test]
    fn test_clear_query() {
        let mut search = SearchController::default();
        assert!(!search.clear_query());
        search.query = "abc".into();
        assert!(search.clear_query());
        assert!(search.query.is_empty());
    }

    #[test]
    fn test_chat_success_appends_assistant_with_citations() {
        let mut chat = ChatController::default();
        let sent = chat.begin("Bonjour").unwrap();
        assert_eq!(sent, vec![Message::user("Bonjour")]);
        assert!(chat.is_thinking());

        chat.finish(Ok(ChatReply {
            answer: "Salut".into(),
            citations: sample_hits(),
            rag_error: None,
        }));
        assert!(!chat.is_thinking());
        assert_eq!(chat.turns().len(), 2);
        assert_eq!(chat.turns()[1].citations.len(), 2);
    }

    #[test]
    fn test_chat_failure_appends_one_error_turn() {
        let mut chat = ChatController::default();
        chat.begin("question").unwrap();
        chat.finish(Err(http_error()));

        assert_eq!(chat.turns().len(), 2);
        assert_eq!(chat.turns()[0], ChatTurn::user("question"));
        let last = &chat.turns()[1];
        assert_eq!(last.role, ChatRole::Assistant);
        assert!(last.text.starts_with(DEFAULT_ERROR_PREFIX));
        assert!(last.failed);
        assert!(!chat.is_thinking());
    }

    #[test]
    fn test_failed_turns_not_resent() {
        let mut chat = ChatController::new("Oops: ");
        chat.begin("one").unwrap();
        chat.finish(Err(http_error()));
        let sent = chat.begin("two").unwrap();
        assert_eq!(sent, vec![Message::user("one"), Message::user("two")]);
    }

    #[test]
    fn test_chat_rejects_blank_and_overlapping() {
        let mut chat = ChatController::default();
        assert!(chat.begin("  ").is_none());
        chat.begin("first").unwrap();
        assert!(chat.begin("second").is_none());
        assert_eq!(chat.turns().len(), 1);
    }

    #[test]
    fn test_rag_error_noted_in_answer() {
        let mut chat = ChatController::default();
        chat.begin("q").unwrap();
        chat.finish(Ok(ChatReply {
            answer: "a".into(),
            citations: Vec::new(),
            rag_error: Some("index offline".into()),
        }));
        assert!(chat.turns()[1].text.contains("index offline"));
    }

    #[test]
    fn test_turn_serialization_is_compact() {
        let v = serde_json::to_value(ChatTurn::user("hi")).unwrap();
        assert_eq!(v, json!({"role": "user", "text": "hi"}));
    }

    #[test]
    fn test_upload_with_no_files_is_noop() {
        let mut upload = UploadController::default();
        assert!(upload.begin(Vec::new()).is_none());
        assert!(!upload.is_uploading());
        assert!(upload.status().is_none());
    }

    #[test]
    fn test_upload_cycle() {
        let mut upload = UploadController::default();
        let files = upload.begin(vec![IngestFile::new("a.pdf", b"%PDF".to_vec())]).unwrap();
        assert!(upload.is_uploading());
        upload.finish(files.len(), Err(http_error()));
        assert!(!upload.is_uploading());
        assert!(upload.error().is_some());
    }

    #[test]
    fn test_form_missing_slug_rejected_locally() {
        let mut form = ProjectForm {
            name: "Laya".into(),
            ..ProjectForm::default()
        };
        assert!(form.begin_submit().is_none());
        assert!(!form.is_submitting());
        assert_eq!(form.error().unwrap().message, "The slug field is required.");
    }

    #[test]
    fn test_form_payload_trims_and_nulls_blanks() {
        let mut form = ProjectForm::default();
        form.name = " Laya ".into();
        form.slug = "laya".into();
        form.status = "Draft".into();
        form.repo_url = "   ".into();
        let payload = form.begin_submit().unwrap();
        assert_eq!(payload.name, "Laya");
        assert_eq!(payload.status, Some(ProjectStatus::Draft));
        assert_eq!(payload.repo_url, None);
        assert!(form.is_submitting());
    }

    #[test]
    fn test_form_bad_status() {
        let mut form = ProjectForm::default();
        form.name = "n".into();
        form.slug = "s".into();
        form.status = "live".into();
        assert!(form.begin_submit().is_none());
        assert!(form.error().unwrap().message.contains("live"));
    }

    #[test]
    fn test_project_list_error() {
        let mut list = ProjectList::default();
        list.begin();
        assert_eq!(list.status(), LoadStatus::Loading);
        list.finish(Err(http_error()));
        assert_eq!(list.status(), LoadStatus::Errored);
        assert!(list.projects().is_empty());
    }
}
