use std::path::{Path, PathBuf};

use gray_matter::{engine::YAML, Matter};
use tokio::fs;
use tracing::{error, info};

use crate::error::{BlogError, BlogResult};
use crate::markdown::render_markdown_to_html;
use crate::state::AppState;

/// Site chrome read from the content directory: everything except the posts.
#[derive(Debug, Clone)]
pub struct Templates {
    pub banner_html: String,
    pub layout_html: String,
    /// `home.md`, already rendered.
    pub home_html: String,
    pub not_found_html: String,
}

pub fn posts_dir(content_dir: &Path) -> PathBuf {
    content_dir.join("posts")
}

pub fn static_dir(content_dir: &Path) -> PathBuf {
    content_dir.join("static")
}

async fn read_template(content_dir: &Path, name: &str) -> BlogResult<String> {
    let path = content_dir.join(name);
    fs::read_to_string(&path)
        .await
        .map_err(|e| BlogError::io(path, e))
}

pub async fn load_content(content_dir: &Path) -> BlogResult<Templates> {
    let banner_html = read_template(content_dir, "banner.html").await?;
    let layout_html = read_template(content_dir, "layout.html").await?;
    let not_found_html = read_template(content_dir, "not_found.html").await?;

    // home.md may carry front-matter; only the body is shown
    let home_md_content = read_template(content_dir, "home.md").await?;
    let matter = Matter::<YAML>::new();
    let markdown_body = matter
        .parse::<serde_json::Value>(&home_md_content)
        .map(|parsed| parsed.content)
        .map_err(|e| BlogError::Parse {
            path: content_dir.join("home.md"),
            message: e.to_string(),
        })?;
    let home_html = render_markdown_to_html(&markdown_body);

    Ok(Templates {
        banner_html,
        layout_html,
        home_html,
        not_found_html,
    })
}

pub async fn reload_content(app_state: &AppState) {
    info!("Reloading application content...");
    match load_content(&app_state.content_dir).await {
        Ok(templates) => {
            app_state.replace_templates(templates).await;
            info!("Content successfully reloaded.");
        }
        Err(e) => {
            error!("Failed to reload content: {}", e);
        }
    }
}
