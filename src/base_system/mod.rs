pub mod config;
pub mod context;
pub mod cookie;
pub mod logging;
pub mod track_id;
pub mod track_paths;
