use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Front-matter keys the templates know how to display.
pub const KNOWN_KEYS: [&str; 6] = [
    "title",
    "date",
    "author",
    "author_contact",
    "cover_image",
    "excerpts",
];

/// Front-matter metadata of a post, with every value kept as a string.
///
/// No schema is enforced: keys other than [`KNOWN_KEYS`] are kept as-is and
/// missing keys read as the empty string.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FrontMatter(BTreeMap<String, String>);

impl FrontMatter {
    pub fn from_yaml_values(values: BTreeMap<String, serde_json::Value>) -> Self {
        let entries = values
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();
        Self(entries)
    }

    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("")
    }

    #[cfg(test)]
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn title(&self) -> &str {
        self.get("title")
    }

    pub fn date(&self) -> &str {
        self.get("date")
    }

    pub fn author(&self) -> &str {
        self.get("author")
    }

    pub fn author_contact(&self) -> &str {
        self.get("author_contact")
    }

    pub fn cover_image(&self) -> &str {
        self.get("cover_image")
    }

    pub fn excerpts(&self) -> &str {
        self.get("excerpts")
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub slug: String,
    pub frontmatter: FrontMatter,
    pub content: String,
}

/// Listing entry for the posts API; the body is left out.
#[derive(Serialize, Debug, Clone)]
pub struct PostSummary {
    pub slug: String,
    pub frontmatter: FrontMatter,
}

impl From<Post> for PostSummary {
    fn from(post: Post) -> Self {
        Self {
            slug: post.slug,
            frontmatter: post.frontmatter,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub text: String,
}

/// Body of `POST /api/comments`.
#[derive(Deserialize, Debug)]
pub struct NewComment {
    pub text: String,
}
