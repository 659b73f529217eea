use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, get_service},
    Json, Router,
};
use serde::Deserialize;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::error;

use crate::comment_store::CommentStore;
use crate::content_loader::static_dir;
use crate::error::{ApiError, BlogError};
use crate::hot_reload::ws_handler;
use crate::models::{Comment, NewComment, Post, PostSummary};
use crate::render::{render_home, render_not_found, render_post, render_with_layout, Page};
use crate::state::{AppState, RouterState};

pub const COMMENTS_PATH: &str = "/api/comments";

pub fn build_router(router_state: RouterState) -> Router {
    let static_root = static_dir(&router_state.app_state.content_dir);
    let static_files = get_service(ServeDir::new(&static_root));
    let favicon_ico = get_service(ServeFile::new(static_root.join("favicon.ico")));
    let favicon_png = get_service(ServeFile::new(static_root.join("favicon.png")));

    Router::new()
        .route("/", get(homepage))
        .route("/blog/{slug}", get(post_page))
        .route(COMMENTS_PATH, get(list_comments).post(create_comment))
        .route("/api/posts", get(list_posts))
        .route("/api/posts/{slug}", get(get_post))
        .nest_service("/static", static_files)
        .route_service("/favicon.ico", favicon_ico)
        .route_service("/favicon.png", favicon_png)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(router_state)
}

/// Failure while building an HTML page.
pub struct PageError(BlogError);

impl From<BlogError> for PageError {
    fn from(err: BlogError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!("Failed to render page: {}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
    }
}

async fn layout_page(state: &AppState, title: &str, body: &str, posts: &[Post]) -> String {
    let layout = state.layout_html.read().await;
    let banner = state.banner_html.read().await;
    let page = Page {
        title,
        content: body,
        posts,
    };
    render_with_layout(&layout, &banner, &page, state.is_development)
}

async fn homepage(State(state): State<Arc<AppState>>) -> Result<Html<String>, PageError> {
    let posts = state.posts.all().await?;
    let body = {
        let home = state.home_html.read().await;
        render_home(&home, &posts)
    };
    Ok(Html(layout_page(&state, "Home", &body, &posts).await))
}

async fn post_page(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, PageError> {
    let loaded = state.posts.store().load_post(&slug).await;

    // The sidebar is secondary; a broken sibling post must not hide this one.
    let posts = match &loaded {
        Ok(_) | Err(BlogError::NotFound(_)) => state.posts.all().await.unwrap_or_else(|e| {
            error!("Failed to list posts for sidebar: {}", e);
            Vec::new()
        }),
        Err(_) => Vec::new(),
    };

    match loaded {
        Ok(post) => {
            let body = render_post(&post, true);
            let page = layout_page(&state, post.frontmatter.title(), &body, &posts).await;
            Ok(Html(page).into_response())
        }
        Err(BlogError::NotFound(_)) => {
            let body = {
                let not_found = state.not_found_html.read().await;
                render_not_found(&not_found, &slug)
            };
            let page = layout_page(&state, "Not found", &body, &posts).await;
            Ok((StatusCode::NOT_FOUND, Html(page)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

async fn list_comments(State(comments): State<Arc<CommentStore>>) -> Result<Json<Vec<Comment>>, ApiError> {
    Ok(Json(comments.list().await?))
}

async fn create_comment(
    State(comments): State<Arc<CommentStore>>,
    payload: Result<Json<NewComment>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let Json(new_comment) = payload?;
    let comment = comments.append(&new_comment.text).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<PostSummary>>, ApiError> {
    let posts = state.posts.search(&params.q).await?;
    Ok(Json(posts.into_iter().map(PostSummary::from).collect()))
}

async fn get_post(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Post>, ApiError> {
    Ok(Json(state.posts.store().load_post(&slug).await?))
}
