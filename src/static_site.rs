//! Static generation: renders every page into an output directory. Any
//! failure aborts the whole build.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use crate::content_loader::{load_content, posts_dir, static_dir};
use crate::error::{BlogError, BlogResult};
use crate::post_index::PostIndex;
use crate::post_store::PostStore;
use crate::render::{
    render_home, render_post, render_static_not_found, render_with_layout, Page,
};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub posts: usize,
    pub static_files: usize,
}

async fn write_page(path: &Path, html: &str) -> BlogResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| BlogError::io(parent, e))?;
    }
    fs::write(path, html)
        .await
        .map_err(|e| BlogError::io(path, e))?;
    debug!(path = %path.display(), "wrote page");
    Ok(())
}

pub async fn build_site(content_dir: &Path, out_dir: &Path) -> BlogResult<BuildReport> {
    info!(content = %content_dir.display(), out = %out_dir.display(), "building site");

    let templates = load_content(content_dir).await?;
    let posts = PostIndex::new(PostStore::new(posts_dir(content_dir)))
        .all()
        .await?;

    let render = |title: &str, body: &str| {
        let page = Page {
            title,
            content: body,
            posts: &posts,
        };
        render_with_layout(&templates.layout_html, &templates.banner_html, &page, false)
    };

    let home = render_home(&templates.home_html, &posts);
    write_page(&out_dir.join("index.html"), &render("Home", &home)).await?;

    for post in &posts {
        // the comments API only exists on a running server
        let body = render_post(post, false);
        let path = out_dir.join("blog").join(&post.slug).join("index.html");
        write_page(&path, &render(post.frontmatter.title(), &body)).await?;
    }

    let not_found = render_static_not_found(&templates.not_found_html);
    write_page(&out_dir.join("404.html"), &render("Not found", &not_found)).await?;

    let static_files = copy_dir(&static_dir(content_dir), &out_dir.join("static")).await?;

    let report = BuildReport {
        posts: posts.len(),
        static_files,
    };
    info!(posts = report.posts, static_files = report.static_files, "site built");
    Ok(report)
}

/// Recursive copy; a missing source directory copies nothing.
async fn copy_dir(from: &Path, to: &Path) -> BlogResult<usize> {
    if !fs::try_exists(from).await.map_err(|e| BlogError::io(from, e))? {
        return Ok(0);
    }

    let mut copied = 0;
    let mut pending: Vec<(PathBuf, PathBuf)> = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((src, dst)) = pending.pop() {
        fs::create_dir_all(&dst)
            .await
            .map_err(|e| BlogError::io(&dst, e))?;
        let mut entries = fs::read_dir(&src).await.map_err(|e| BlogError::io(&src, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BlogError::io(&src, e))?
        {
            let path = entry.path();
            let target = dst.join(entry.file_name());
            let file_type = entry.file_type().await.map_err(|e| BlogError::io(&path, e))?;
            if file_type.is_dir() {
                pending.push((path, target));
            } else {
                fs::copy(&path, &target)
                    .await
                    .map_err(|e| BlogError::io(&path, e))?;
                copied += 1;
            }
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_loader::fixtures;

    #[tokio::test]
    async fn writes_every_page_and_static_asset() {
        let content = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fixtures::write_site(content.path());

        let report = build_site(content.path(), out.path()).await.unwrap();
        assert_eq!(
            report,
            BuildReport {
                posts: 2,
                static_files: 1
            }
        );

        let index = std::fs::read_to_string(out.path().join("index.html")).unwrap();
        assert!(index.contains("Hello World"));
        assert!(index.contains("Second Post"));

        let post = std::fs::read_to_string(out.path().join("blog/hello-world/index.html")).unwrap();
        assert!(post.contains("<h1>Hi</h1>"));
        assert!(!post.contains("comment-form"));

        assert!(out.path().join("blog/second-post/index.html").exists());

        let not_found = std::fs::read_to_string(out.path().join("404.html")).unwrap();
        assert!(!not_found.contains("No post called </p>"));
        assert!(!not_found.contains("{{slug}}"));
        assert!(not_found.contains("class=\"missing-slug\""));
        assert!(out.path().join("static/css/style.css").exists());
    }

    #[tokio::test]
    async fn a_broken_post_fails_the_build() {
        let content = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fixtures::write_site(content.path());
        std::fs::write(posts_dir(content.path()).join("bad.md"), "---\n- x\n---\n").unwrap();

        let err = build_site(content.path(), out.path()).await.unwrap_err();
        assert!(matches!(err, BlogError::Parse { .. }));
        assert!(!out.path().join("index.html").exists());
    }
}
