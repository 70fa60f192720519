mod catalog;
mod chatlaya;
mod projects;

pub use chatlaya::IngestFile;
pub use projects::validate_new_project;
