use ratatui::widgets::ListState;
use std::path::Path;
use tokio::task::JoinHandle;

use laya_core::{
    ApiClient, ChatController, ChatReply, ChatRole, ClientError, Config, FeedbackAck, IngestFile, LocalStore,
    Project, ProjectField, ProjectForm, ProjectList, Rating, SearchController, SearchHit, Theme, UploadController,
};

type Task<T> = JoinHandle<laya_core::Result<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Search,
    Chat,
    Projects,
}

impl Screen {
    pub fn all() -> [Screen; 3] {
        [Screen::Search, Screen::Chat, Screen::Projects]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Screen::Search => "Search",
            Screen::Chat => "Chat",
            Screen::Projects => "Projects",
        }
    }

    pub fn next(&self) -> Screen {
        match self {
            Screen::Search => Screen::Chat,
            Screen::Chat => Screen::Projects,
            Screen::Projects => Screen::Search,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    Upload,
    NewProject,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,
    pub popup: Option<Popup>,
    pub theme: Theme,
    pub status_message: Option<String>,

    // Search state
    pub search: SearchController,
    pub search_state: ListState,
    search_tasks: Vec<Task<Vec<SearchHit>>>,

    // Chat state
    pub chat: ChatController,
    pub chat_input: String,
    pub chat_scroll: u16,
    pub chat_height: u16, // inner height of the transcript, set during render
    pub chat_width: u16,
    chat_task: Option<Task<ChatReply>>,
    feedback_task: Option<Task<FeedbackAck>>,

    // Upload state
    pub upload: UploadController,
    pub upload_input: String,
    upload_task: Option<JoinHandle<(usize, laya_core::Result<Option<String>>)>>,

    // Projects state
    pub projects: ProjectList,
    pub project_state: ListState,
    pub form: ProjectForm,
    pub form_field: usize,
    projects_task: Option<Task<Vec<Project>>>,
    form_task: Option<Task<Project>>,
    delete_task: Option<Task<Project>>,

    // Animation state
    pub animation_frame: u8,

    api: ApiClient,
    store: Option<LocalStore>,
}

impl App {
    pub fn new(api: ApiClient, store: Option<LocalStore>, config: &Config) -> Self {
        let mut search = SearchController::new(config.search_limit());
        let mut chat = ChatController::new(config.error_prefix());
        chat.top_k = Some(config.top_k());

        let theme = match &store {
            Some(store) => {
                if let Some(query) = store.last_query() {
                    search.query = query;
                }
                chat.restore(store.transcript());
                store.theme()
            }
            None => Theme::default(),
        };

        Self {
            should_quit: false,
            screen: Screen::Search,
            input_mode: InputMode::Normal,
            popup: None,
            theme,
            status_message: None,

            search,
            search_state: ListState::default(),
            search_tasks: Vec::new(),

            chat,
            chat_input: String::new(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_task: None,
            feedback_task: None,

            upload: UploadController::default(),
            upload_input: String::new(),
            upload_task: None,

            projects: ProjectList::default(),
            project_state: ListState::default(),
            form: ProjectForm::default(),
            form_field: 0,
            projects_task: None,
            form_task: None,
            delete_task: None,

            animation_frame: 0,

            api,
            store,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // Screen switching
    pub fn switch_to(&mut self, screen: Screen) {
        self.screen = screen;
        self.input_mode = InputMode::Normal;
        if screen == Screen::Projects && self.projects.projects().is_empty() && self.projects_task.is_none() {
            self.refresh_projects();
        }
    }

    /// Jump to the search box from anywhere.
    pub fn focus_search(&mut self) {
        self.popup = None;
        self.screen = Screen::Search;
        self.input_mode = InputMode::Editing;
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        if let Some(store) = &self.store {
            store.set_theme(self.theme);
        }
    }

    // Search actions
    pub fn start_search(&mut self) {
        let Some(ticket) = self.search.begin() else {
            return;
        };
        if let Some(store) = &self.store {
            store.set_last_query(&ticket.query);
        }
        self.search_state.select(None);

        let api = self.api.clone();
        self.search_tasks.push(tokio::spawn(async move {
            api.search(&ticket.query, ticket.limit).await
        }));
    }

    pub fn pending_searches(&self) -> usize {
        self.search_tasks.len()
    }

    pub fn selected_hit(&self) -> Option<&SearchHit> {
        let visible = self.search.visible_hits();
        self.search_state.selected().and_then(|i| visible.get(i).copied())
    }

    pub fn search_nav_down(&mut self) {
        let len = self.search.visible_hits().len();
        if len > 0 {
            let i = self.search_state.selected().map(|i| (i + 1).min(len - 1)).unwrap_or(0);
            self.search_state.select(Some(i));
        }
    }

    pub fn search_nav_up(&mut self) {
        let i = self.search_state.selected().unwrap_or(0);
        self.search_state.select(Some(i.saturating_sub(1)));
    }

    pub fn cycle_filter(&mut self, facet: laya_core::Facet) {
        self.search.cycle_filter(facet);
        let has_hits = !self.search.visible_hits().is_empty();
        self.search_state.select(if has_hits { Some(0) } else { None });
    }

    // Chat actions
    pub fn send_chat(&mut self) {
        let Some(messages) = self.chat.begin(&self.chat_input) else {
            return;
        };
        self.chat_input.clear();
        self.persist_transcript();
        self.scroll_chat_to_bottom();

        let api = self.api.clone();
        let top_k = self.chat.top_k;
        self.chat_task = Some(tokio::spawn(async move { api.chat(&messages, top_k).await }));
    }

    pub fn clear_chat(&mut self) {
        if self.chat.is_thinking() {
            return;
        }
        self.chat.clear();
        self.chat_scroll = 0;
        if let Some(store) = &self.store {
            store.clear_transcript();
        }
    }

    /// Rate the latest answer. Fire and forget; the outcome only shows in the status line.
    pub fn send_feedback(&mut self, rating: Rating) {
        let has_answer = self
            .chat
            .turns()
            .iter()
            .rev()
            .any(|t| t.role == ChatRole::Assistant && !t.failed);
        if !has_answer || self.feedback_task.is_some() {
            return;
        }

        let api = self.api.clone();
        self.feedback_task = Some(tokio::spawn(async move { api.feedback(None, rating, None).await }));
    }

    fn persist_transcript(&self) {
        if let Some(store) = &self.store {
            store.set_transcript(self.chat.turns());
        }
    }

    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    /// Scroll chat to bottom so the newest turn is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.chat_scroll = transcript_height(&self.chat, self.chat_width).saturating_sub(visible_height);
    }

    // Upload actions
    pub fn open_upload(&mut self) {
        self.popup = Some(Popup::Upload);
        self.input_mode = InputMode::Editing;
    }

    /// Read every path in the upload box and send them in one request.
    /// An empty box does nothing at all.
    pub async fn start_upload(&mut self) {
        let paths: Vec<String> = self.upload_input.split_whitespace().map(str::to_string).collect();
        if paths.is_empty() || self.upload.is_uploading() {
            return;
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in &paths {
            match IngestFile::from_path(Path::new(path)).await {
                Ok(file) => files.push(file),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "cannot read upload");
                    self.upload.fail(e);
                    return;
                }
            }
        }

        let Some(files) = self.upload.begin(files) else {
            return;
        };
        self.upload_input.clear();
        let count = files.len();
        let api = self.api.clone();
        self.upload_task = Some(tokio::spawn(async move { (count, api.ingest(files).await) }));
    }

    // Project actions
    pub fn refresh_projects(&mut self) {
        if self.projects_task.is_some() {
            return;
        }
        self.projects.begin();
        let api = self.api.clone();
        self.projects_task = Some(tokio::spawn(async move { api.list_projects().await }));
    }

    pub fn selected_project(&self) -> Option<&Project> {
        self.project_state
            .selected()
            .and_then(|i| self.projects.projects().get(i))
    }

    pub fn project_nav_down(&mut self) {
        let len = self.projects.projects().len();
        if len > 0 {
            let i = self.project_state.selected().map(|i| (i + 1).min(len - 1)).unwrap_or(0);
            self.project_state.select(Some(i));
        }
    }

    pub fn project_nav_up(&mut self) {
        let i = self.project_state.selected().unwrap_or(0);
        self.project_state.select(Some(i.saturating_sub(1)));
    }

    pub fn open_project_form(&mut self) {
        self.popup = Some(Popup::NewProject);
        self.input_mode = InputMode::Editing;
        self.form_field = 0;
    }

    pub fn current_form_field(&self) -> ProjectField {
        ProjectField::all()[self.form_field % ProjectField::all().len()]
    }

    pub fn form_next_field(&mut self) {
        self.form_field = (self.form_field + 1) % ProjectField::all().len();
    }

    pub fn form_prev_field(&mut self) {
        let len = ProjectField::all().len();
        self.form_field = (self.form_field + len - 1) % len;
    }

    pub fn submit_project_form(&mut self) {
        let Some(payload) = self.form.begin_submit() else {
            return;
        };
        let api = self.api.clone();
        self.form_task = Some(tokio::spawn(async move { api.create_project(&payload).await }));
    }

    pub fn delete_selected_project(&mut self) {
        if self.delete_task.is_some() {
            return;
        }
        let Some(id) = self.selected_project().map(|p| p.id.clone()) else {
            return;
        };
        let api = self.api.clone();
        self.delete_task = Some(tokio::spawn(async move { api.delete_project(&id).await }));
    }

    /// Apply every request that has completed since the last call, in the
    /// order they are found finished. Nothing is cancelled, so an older search
    /// that finishes late still replaces newer results.
    pub async fn poll_tasks(&mut self) {
        let mut i = 0;
        while i < self.search_tasks.len() {
            if self.search_tasks[i].is_finished() {
                let task = self.search_tasks.remove(i);
                let result = join(task).await;
                self.search.finish(result);
                let has_hits = !self.search.visible_hits().is_empty();
                self.search_state.select(if has_hits { Some(0) } else { None });
            } else {
                i += 1;
            }
        }

        if let Some(task) = take_finished(&mut self.chat_task) {
            let result = join(task).await;
            self.chat.finish(result);
            self.persist_transcript();
            self.scroll_chat_to_bottom();
        }

        if let Some(task) = take_finished(&mut self.feedback_task) {
            self.status_message = Some(match join(task).await {
                Ok(_) => "Thanks for the feedback".to_string(),
                Err(e) => format!("Feedback not sent: {}", laya_core::DisplayError::from(e)),
            });
        }

        if let Some(task) = take_finished(&mut self.upload_task) {
            let (count, result) = task
                .await
                .unwrap_or_else(|e| (0, Err(ClientError::Task(e.to_string()))));
            self.upload.finish(count, result);
        }

        if let Some(task) = take_finished(&mut self.projects_task) {
            let result = join(task).await;
            self.projects.finish(result);
            let len = self.projects.projects().len();
            let selected = self.project_state.selected().filter(|i| *i < len);
            self.project_state.select(selected.or(if len > 0 { Some(0) } else { None }));
        }

        if let Some(task) = take_finished(&mut self.form_task) {
            let result = join(task).await;
            if let Some(project) = self.form.finish_submit(result) {
                self.status_message = Some(format!("Project '{}' created", project.name));
                self.popup = None;
                self.input_mode = InputMode::Normal;
                self.refresh_projects();
            }
        }

        if let Some(task) = take_finished(&mut self.delete_task) {
            self.status_message = Some(match join(task).await {
                Ok(project) => format!("Project '{}' deleted", project.name),
                Err(e) => format!("Delete failed: {}", laya_core::DisplayError::from(e)),
            });
            self.refresh_projects();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.chat.is_thinking() || self.search.is_searching() || self.upload.is_uploading()
    }

    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

/// Rendered line count of the transcript at the given wrap width, capped at `u16::MAX`.
fn transcript_height(chat: &ChatController, width: u16) -> u16 {
    let wrap_width = if width > 0 { width as usize } else { 50 };
    let clamp = |n: usize| u16::try_from(n).unwrap_or(u16::MAX);

    let mut total_lines: u16 = 0;
    for turn in chat.turns() {
        total_lines = total_lines.saturating_add(1); // "You:" / "LAYA:"
        for line in turn.text.lines() {
            let char_count = line.chars().count();
            total_lines = total_lines.saturating_add(clamp(char_count / wrap_width + 1));
        }
        if !turn.citations.is_empty() {
            total_lines = total_lines.saturating_add(clamp(turn.citations.len()).saturating_add(1));
        }
        total_lines = total_lines.saturating_add(1);
    }
    if chat.is_thinking() {
        total_lines = total_lines.saturating_add(2);
    }
    total_lines
}

fn take_finished<T>(slot: &mut Option<JoinHandle<T>>) -> Option<JoinHandle<T>> {
    if slot.as_ref().is_some_and(|t| t.is_finished()) {
        slot.take()
    } else {
        None
    }
}

async fn join<T>(task: Task<T>) -> laya_core::Result<T> {
    task.await.unwrap_or_else(|e| Err(ClientError::Task(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use laya_core::SearchStatus;
    use tempfile::TempDir;

    fn offline_app() -> App {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        App::new(ApiClient::new(&format!("http://{}", addr)), None, &Config::new())
    }

    async fn settle(app: &mut App) {
        for _ in 0..200 {
            app.poll_tasks().await;
            if !app.is_busy() && app.pending_searches() == 0 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_search_enters_searching_then_errors_inline() {
        let mut app = offline_app();
        app.search.query = "rust".into();
        app.start_search();
        assert_eq!(app.search.status(), SearchStatus::Searching);
        assert!(app.search.hits().is_empty());

        settle(&mut app).await;
        assert_eq!(app.search.status(), SearchStatus::Errored);
        assert!(app.search.error().is_some());
    }

    #[tokio::test]
    async fn test_failed_chat_lands_in_transcript_and_store() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let mut app = offline_app();
        app.store = Some(store.clone());

        app.chat_input = "Bonjour".into();
        app.send_chat();
        assert!(app.chat_input.is_empty());
        assert!(app.chat.is_thinking());

        settle(&mut app).await;
        assert_eq!(app.chat.turns().len(), 2);
        assert!(app.chat.turns()[1].failed);
        assert_eq!(store.transcript().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_upload_box_is_noop() {
        let mut app = offline_app();
        app.upload_input = "   ".into();
        app.start_upload().await;
        assert!(!app.upload.is_uploading());
        assert!(app.upload.status().is_none());
        assert!(app.upload.error().is_none());
    }

    #[tokio::test]
    async fn test_missing_upload_file_reports_error() {
        let mut app = offline_app();
        app.upload_input = "/definitely/not/here.pdf".into();
        app.start_upload().await;
        assert!(!app.upload.is_uploading());
        assert!(app.upload.error().is_some());
    }

    #[tokio::test]
    async fn test_restores_persisted_state() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        store.set_theme(Theme::Light);
        store.set_last_query("qdrant");
        store.set_transcript(&[laya_core::ChatTurn::user("hello")]);

        let app = App::new(ApiClient::new("http://127.0.0.1:9"), Some(store), &Config::new());
        assert_eq!(app.theme, Theme::Light);
        assert_eq!(app.search.query, "qdrant");
        assert_eq!(app.chat.turns().len(), 1);
    }

    #[test]
    fn test_huge_transcript_height_saturates() {
        let mut chat = ChatController::default();
        let long_line = "x".repeat(200_000);
        chat.restore(vec![
            laya_core::ChatTurn::user(long_line.clone()),
            laya_core::ChatTurn::assistant(long_line, Vec::new()),
        ]);
        assert_eq!(transcript_height(&chat, 1), u16::MAX);
    }

    #[tokio::test]
    async fn test_project_form_without_slug_spawns_nothing() {
        let mut app = offline_app();
        app.open_project_form();
        app.form.name = "Laya".into();
        app.submit_project_form();
        assert!(app.form_task.is_none());
        assert!(app.form.error().is_some());
    }
}
