//! Markdown blog: posts read from a content directory, a JSON comments API,
//! and a static site builder.

pub mod comment_store;
pub mod config;
pub mod content_loader;
pub mod error;
pub mod hot_reload;
pub mod markdown;
pub mod models;
pub mod post_index;
pub mod post_store;
pub mod render;
pub mod routes;
pub mod state;
pub mod static_site;
