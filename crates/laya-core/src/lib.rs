//! Client-side core of LAYA: the HTTP wrapper, one call per backend
//! operation, the view state that drives the search/chat/project screens, and
//! a small best-effort local store. Nothing here depends on a UI toolkit.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod facets;
pub mod highlight;
pub mod models;
pub mod state;
pub mod storage;

// Re-export main types for convenience
pub use api::IngestFile;
pub use client::{ApiClient, RequestBody, RequestOptions};
pub use config::Config;
pub use error::{ClientError, DisplayError, Result};
pub use facets::{Facet, ALL};
pub use models::{
    ChatReply, Contributor, Domain, FeedbackAck, HitId, Message, NewProject, Project, ProjectStatus, Rating, Role, SearchHit,
    Technology,
};
pub use state::{
    ChatController, ChatRole, ChatTurn, LoadStatus, ProjectField, ProjectForm, ProjectList, SearchController,
    SearchStatus, UploadController,
};
pub use storage::{LocalStore, Theme};
