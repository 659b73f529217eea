use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate};
use futures::future::try_join_all;
use tracing::debug;

use crate::error::BlogResult;
use crate::models::Post;
use crate::post_store::PostStore;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%B %d, %Y", "%d %B %Y", "%b %d, %Y"];

/// Every post in the store, newest first.
///
/// Nothing is cached: each call re-reads every file, which is fine for a
/// corpus of tens of posts and nothing larger.
#[derive(Debug, Clone)]
pub struct PostIndex {
    store: PostStore,
}

impl PostIndex {
    pub fn new(store: PostStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &PostStore {
        &self.store
    }

    /// Loads all posts. One bad file fails the whole listing.
    pub async fn all(&self) -> BlogResult<Vec<Post>> {
        let slugs = self.store.list_slugs().await?;
        let mut posts = try_join_all(slugs.iter().map(|slug| self.store.load_post(slug))).await?;
        sort_posts(&mut posts);
        debug!(count = posts.len(), "indexed posts");
        Ok(posts)
    }

    pub async fn find<F>(&self, predicate: F) -> BlogResult<Vec<Post>>
    where
        F: Fn(&Post) -> bool,
    {
        let posts = self.all().await?;
        Ok(posts.into_iter().filter(|post| predicate(post)).collect())
    }

    /// Case-insensitive substring match on the slug.
    pub async fn search(&self, query: &str) -> BlogResult<Vec<Post>> {
        let needle = query.trim().to_lowercase();
        self.find(|post| post.slug.to_lowercase().contains(&needle))
            .await
    }
}

pub fn parse_post_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Newest first; undated posts last; ties by slug.
fn sort_posts(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        let da = parse_post_date(a.frontmatter.date());
        let db = parse_post_date(b.frontmatter.date());
        let by_date = match (da, db) {
            (Some(da), Some(db)) => db.cmp(&da),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_date.then_with(|| a.slug.cmp(&b.slug))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BlogError;
    use std::fs;

    fn index_with(files: &[(&str, &str)]) -> (tempfile::TempDir, PostIndex) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            fs::write(dir.path().join(name), body).unwrap();
        }
        let index = PostIndex::new(PostStore::new(dir.path()));
        (dir, index)
    }

    #[tokio::test]
    async fn one_post_per_file() {
        let (_dir, index) = index_with(&[
            ("hello-world.md", "---\ntitle: Hello World\n---\n# Hi"),
            ("second-post.md", "---\ntitle: Second Post\n---\nMore"),
        ]);

        let posts = index.all().await.unwrap();
        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs.len(), 2);
        assert!(slugs.contains(&"hello-world"));
        assert!(slugs.contains(&"second-post"));
    }

    #[tokio::test]
    async fn newest_first_then_undated() {
        let (_dir, index) = index_with(&[
            ("old.md", "---\ndate: 2021-03-01\n---\n"),
            ("new.md", "---\ndate: January 5, 2022\n---\n"),
            ("undated.md", "---\ntitle: No date\n---\n"),
            ("garbled.md", "---\ndate: someday\n---\n"),
        ]);

        let posts = index.all().await.unwrap();
        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["new", "old", "garbled", "undated"]);
    }

    #[tokio::test]
    async fn search_matches_slug_substrings() {
        let (_dir, index) = index_with(&[
            ("rust-tips.md", "---\ntitle: a\n---\n"),
            ("trusty-tools.md", "---\ntitle: b\n---\n"),
            ("gardening.md", "---\ntitle: c\n---\n"),
        ]);

        let hits = index.search("RUST").await.unwrap();
        let mut slugs: Vec<_> = hits.iter().map(|p| p.slug.as_str()).collect();
        slugs.sort();
        assert_eq!(slugs, vec!["rust-tips", "trusty-tools"]);

        assert_eq!(index.search("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn find_applies_arbitrary_predicates() {
        let (_dir, index) = index_with(&[
            ("a.md", "---\nauthor: Pablo\n---\n"),
            ("b.md", "---\nauthor: Someone\n---\n"),
        ]);

        let hits = index
            .find(|post| post.frontmatter.author() == "Pablo")
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].slug, "a");
    }

    #[tokio::test]
    async fn a_broken_post_fails_the_listing() {
        let (_dir, index) = index_with(&[
            ("fine.md", "---\ntitle: ok\n---\n"),
            ("broken.md", "---\n- not\n- a map\n---\n"),
        ]);

        let err = index.all().await.unwrap_err();
        assert!(matches!(err, BlogError::Parse { .. }));
    }

    #[test]
    fn parses_common_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2022, 1, 5);
        assert_eq!(parse_post_date("2022-01-05"), expected);
        assert_eq!(parse_post_date("January 5, 2022"), expected);
        assert_eq!(parse_post_date("5 January 2022"), expected);
        assert_eq!(parse_post_date("Jan 5, 2022"), expected);
        assert_eq!(parse_post_date("2022-01-05T10:00:00Z"), expected);
        assert_eq!(parse_post_date(""), None);
        assert_eq!(parse_post_date("soon"), None);
    }
}
