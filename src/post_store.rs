use std::{
    collections::BTreeMap,
    io::ErrorKind,
    path::PathBuf,
};

use gray_matter::{engine::YAML, Matter};
use tokio::fs;
use tracing::debug;

use crate::error::{BlogError, BlogResult};
use crate::models::{FrontMatter, Post};

const POST_EXTENSION: &str = "md";

/// Reads markdown posts from a single directory. One file per post; the file
/// stem is the slug.
#[derive(Debug, Clone)]
pub struct PostStore {
    posts_dir: PathBuf,
}

impl PostStore {
    pub fn new(posts_dir: impl Into<PathBuf>) -> Self {
        Self {
            posts_dir: posts_dir.into(),
        }
    }

    pub async fn list_slugs(&self) -> BlogResult<Vec<String>> {
        let dir = &self.posts_dir;
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| BlogError::io(dir, e))?;

        let mut slugs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BlogError::io(dir, e))?
        {
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == POST_EXTENSION) {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| BlogError::io(&path, e))?;
                if file_type.is_dir() {
                    continue;
                }
                // editor lock files like `.#post.md` are not posts
                match path.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) if is_plain_slug(stem) => slugs.push(stem.to_string()),
                    _ => debug!(path = %path.display(), "skipping non-post file"),
                }
            }
        }

        // read_dir order is filesystem-dependent
        slugs.sort();
        Ok(slugs)
    }

    pub async fn load_post(&self, slug: &str) -> BlogResult<Post> {
        if !is_plain_slug(slug) {
            return Err(BlogError::NotFound(format!("post `{slug}`")));
        }

        let path = self.posts_dir.join(format!("{slug}.{POST_EXTENSION}"));
        let file_content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BlogError::NotFound(format!("post `{slug}`")));
            }
            Err(e) => return Err(BlogError::io(path, e)),
        };

        let post = parse_post(slug, &file_content).map_err(|message| BlogError::Parse {
            path: path.clone(),
            message,
        })?;
        debug!(slug, keys = post.frontmatter.len(), "loaded post");
        Ok(post)
    }
}

/// Splits a markdown document into front-matter and body.
pub fn parse_post(slug: &str, source: &str) -> Result<Post, String> {
    let matter = Matter::<YAML>::new();
    let parsed = matter
        .parse::<serde_json::Value>(source)
        .map_err(|e| e.to_string())?;

    let frontmatter = match parsed.data {
        None | Some(serde_json::Value::Null) => FrontMatter::default(),
        Some(serde_json::Value::Object(map)) => {
            FrontMatter::from_yaml_values(map.into_iter().collect::<BTreeMap<_, _>>())
        }
        Some(_) => return Err("front-matter is not a key/value mapping".to_string()),
    };

    Ok(Post {
        slug: slug.to_string(),
        frontmatter,
        content: parsed.content,
    })
}

fn is_plain_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('.')
        && !slug.contains(['/', '\\'])
        && !slug.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;

    fn store_with(files: &[(&str, &str)]) -> (tempfile::TempDir, PostStore) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std_fs::write(dir.path().join(name), body).unwrap();
        }
        let store = PostStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn lists_one_slug_per_markdown_file() {
        let (dir, store) = store_with(&[
            ("second-post.md", "---\ntitle: Second\n---\nbody"),
            ("hello-world.md", "---\ntitle: Hello World\n---\n# Hi"),
            ("notes.txt", "not a post"),
        ]);
        std_fs::create_dir(dir.path().join("drafts.md")).unwrap();

        let slugs = store.list_slugs().await.unwrap();
        assert_eq!(slugs, vec!["hello-world", "second-post"]);
    }

    #[tokio::test]
    async fn dotfiles_are_not_listed() {
        let (_dir, store) = store_with(&[
            ("hello-world.md", "---\ntitle: Hello World\n---\n# Hi"),
            (".#hello-world.md", "lock"),
            (".hidden.md", "---\ntitle: hidden\n---\n"),
        ]);

        let slugs = store.list_slugs().await.unwrap();
        assert_eq!(slugs, vec!["hello-world"]);
        for slug in &slugs {
            store.load_post(slug).await.unwrap();
        }
    }

    #[tokio::test]
    async fn loads_declared_frontmatter_keys_and_body() {
        let (_dir, store) = store_with(&[(
            "hello-world.md",
            "---\ntitle: Hello World\ndate: 2022-01-05\nauthor: Pablo\n---\n# Hi\n",
        )]);

        let post = store.load_post("hello-world").await.unwrap();
        assert_eq!(post.slug, "hello-world");
        assert_eq!(
            post.frontmatter.keys().collect::<Vec<_>>(),
            vec!["author", "date", "title"]
        );
        assert_eq!(post.frontmatter.title(), "Hello World");
        assert_eq!(post.frontmatter.date(), "2022-01-05");
        assert!(post.content.contains("# Hi"));
        assert!(!post.content.contains("title:"));
    }

    #[tokio::test]
    async fn file_without_frontmatter_has_empty_metadata() {
        let (_dir, store) = store_with(&[("plain.md", "just text\n")]);

        let post = store.load_post("plain").await.unwrap();
        assert!(post.frontmatter.is_empty());
        assert!(post.content.contains("just text"));
    }

    #[tokio::test]
    async fn missing_slug_is_not_found() {
        let (_dir, store) = store_with(&[]);
        let err = store.load_post("nope").await.unwrap_err();
        assert!(matches!(err, BlogError::NotFound(_)));
    }

    #[tokio::test]
    async fn path_like_slugs_are_not_found() {
        let (_dir, store) = store_with(&[("inner.md", "---\ntitle: x\n---\n")]);

        for slug in ["../outside", "a/b", "..", ".hidden", "", "a\\b"] {
            let err = store.load_post(slug).await.unwrap_err();
            assert!(matches!(err, BlogError::NotFound(_)), "slug {slug:?}");
        }
    }

    #[tokio::test]
    async fn non_mapping_frontmatter_is_a_parse_error() {
        let (_dir, store) = store_with(&[("broken.md", "---\n- just\n- a list\n---\nbody")]);

        let err = store.load_post("broken").await.unwrap_err();
        assert!(matches!(err, BlogError::Parse { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_yaml_is_a_parse_error() {
        let (_dir, store) = store_with(&[
            ("unclosed.md", "---\ntitle: [unclosed\n---\nbody"),
            ("quote.md", "---\ntitle: \"no end\n---\nbody"),
        ]);

        for slug in ["unclosed", "quote"] {
            let err = store.load_post(slug).await.unwrap_err();
            assert!(matches!(err, BlogError::Parse { .. }), "{slug}: got {err:?}");
        }
    }

    #[tokio::test]
    async fn missing_directory_is_an_io_error() {
        let store = PostStore::new("/definitely/not/a/dir");
        let err = store.list_slugs().await.unwrap_err();
        assert!(matches!(err, BlogError::Io { .. }));
    }
}
