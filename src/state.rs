use std::{path::PathBuf, sync::Arc};
use tokio::sync::{broadcast, RwLock};

use crate::comment_store::CommentStore;
use crate::content_loader::Templates;
use crate::post_index::PostIndex;

pub type RefreshBroadcaster = broadcast::Sender<()>;

pub struct AppState {
    pub content_dir: PathBuf,
    pub banner_html: RwLock<String>,
    pub layout_html: RwLock<String>,
    pub home_html: RwLock<String>,
    pub not_found_html: RwLock<String>, // supports {{slug}} placeholder
    pub posts: PostIndex,
    pub is_development: bool,
}

impl AppState {
    pub fn new(content_dir: PathBuf, templates: Templates, posts: PostIndex, is_development: bool) -> Self {
        Self {
            content_dir,
            banner_html: RwLock::new(templates.banner_html),
            layout_html: RwLock::new(templates.layout_html),
            home_html: RwLock::new(templates.home_html),
            not_found_html: RwLock::new(templates.not_found_html),
            posts,
            is_development,
        }
    }

    pub async fn replace_templates(&self, templates: Templates) {
        *self.banner_html.write().await = templates.banner_html;
        *self.layout_html.write().await = templates.layout_html;
        *self.home_html.write().await = templates.home_html;
        *self.not_found_html.write().await = templates.not_found_html;
    }
}

#[derive(Clone)]
pub struct RouterState {
    pub app_state: Arc<AppState>,
    pub comments: Arc<CommentStore>,
    pub broadcaster: RefreshBroadcaster,
}

impl axum::extract::FromRef<RouterState> for Arc<AppState> {
    fn from_ref(state: &RouterState) -> Self {
        state.app_state.clone()
    }
}

impl axum::extract::FromRef<RouterState> for Arc<CommentStore> {
    fn from_ref(state: &RouterState) -> Self {
        state.comments.clone()
    }
}

impl axum::extract::FromRef<RouterState> for RefreshBroadcaster {
    fn from_ref(state: &RouterState) -> Self {
        state.broadcaster.clone()
    }
}
