pub mod config;
pub mod dto;
pub mod json_draft_repository;
pub mod paths;

pub use config::AppConfig;
pub use json_draft_repository::JsonDraftRepository;
pub use paths::HelplinePaths;
