use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::{net::TcpListener, sync::broadcast};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use markdown_blog::comment_store::CommentStore;
use markdown_blog::config::{BuildArgs, CliArgs, Command, CommentSettings, RawSettings, ServeArgs, Settings};
use markdown_blog::content_loader::{load_content, posts_dir};
use markdown_blog::hot_reload::start_content_watcher;
use markdown_blog::post_index::PostIndex;
use markdown_blog::post_store::PostStore;
use markdown_blog::routes::build_router;
use markdown_blog::state::{AppState, RouterState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();
    let mut raw = RawSettings::load(args.config_file.as_deref())?;
    raw.apply_env(|key| std::env::var(key).ok())?;

    match args.command.unwrap_or(Command::Serve(ServeArgs::default())) {
        Command::Serve(serve_args) => {
            raw.apply_serve_overrides(&serve_args);
            serve(Settings::from_raw(raw)?).await
        }
        Command::Build(build_args) => {
            raw.apply_build_overrides(&build_args);
            build(Settings::from_raw(raw)?, &build_args).await
        }
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    info!("RUST_ENV is set to development: {}", settings.is_development);

    let templates = load_content(&settings.content_dir)
        .await
        .context("Failed to load initial content files")?;

    let comments = match &settings.comments {
        CommentSettings::Memory => {
            info!("Comments are kept in memory");
            CommentStore::in_memory()
        }
        CommentSettings::File(path) => {
            info!(path = %path.display(), "Comments are stored in a JSON file");
            CommentStore::file_backed(path)
        }
    };

    let index = PostIndex::new(PostStore::new(posts_dir(&settings.content_dir)));
    let state = Arc::new(AppState::new(
        settings.content_dir.clone(),
        templates,
        index,
        settings.is_development,
    ));

    // Hot-reload setup
    let (tx, _rx) = broadcast::channel(1);
    if settings.is_development {
        info!("Hot reload enabled. Check logs for file change events.");
        start_content_watcher(tx.clone(), state.clone());
    }

    let app = build_router(RouterState {
        app_state: state,
        comments: Arc::new(comments),
        broadcaster: tx,
    });

    let addr = settings.addr;
    info!(%addr, "listening");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}

async fn build(settings: Settings, args: &BuildArgs) -> anyhow::Result<()> {
    let report = markdown_blog::static_site::build_site(&settings.content_dir, &args.out_dir)
        .await
        .context("Static build failed")?;
    info!(
        "Built {} posts and copied {} static files into {}",
        report.posts,
        report.static_files,
        args.out_dir.display()
    );
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
