pub mod app;
pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod models;
pub mod options;
pub mod reports;
pub mod state;
pub mod stats;
pub mod storage;
pub mod ui;

pub use app::router;
pub use config::{resolve_config_dir, ConfigStore};
pub use state::AppState;
pub use storage::{database_file, resolve_database_url, EntryStore};
