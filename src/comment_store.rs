use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::{fs, sync::Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{BlogError, BlogResult};
use crate::models::Comment;

#[derive(Debug)]
enum Backing {
    /// Lost on restart.
    Memory(Vec<Comment>),
    /// One JSON array, read and rewritten in full on every append.
    File(PathBuf),
}

/// Append-only sequence of comments.
///
/// All access goes through one async mutex, so a read-modify-write append
/// never interleaves with another append or with a listing.
#[derive(Debug)]
pub struct CommentStore {
    backing: Mutex<Backing>,
}

impl CommentStore {
    pub fn in_memory() -> Self {
        Self {
            backing: Mutex::new(Backing::Memory(Vec::new())),
        }
    }

    pub fn file_backed(path: impl Into<PathBuf>) -> Self {
        Self {
            backing: Mutex::new(Backing::File(path.into())),
        }
    }

    pub async fn list(&self) -> BlogResult<Vec<Comment>> {
        let backing = self.backing.lock().await;
        match &*backing {
            Backing::Memory(comments) => Ok(comments.clone()),
            Backing::File(path) => read_document(path).await,
        }
    }

    pub async fn append(&self, text: &str) -> BlogResult<Comment> {
        if text.trim().is_empty() {
            return Err(BlogError::Validation(
                "comment text must not be empty".to_string(),
            ));
        }

        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
        };

        let mut backing = self.backing.lock().await;
        match &mut *backing {
            Backing::Memory(comments) => comments.push(comment.clone()),
            Backing::File(path) => {
                let mut comments = read_document(path).await?;
                comments.push(comment.clone());
                write_document(path, &comments).await?;
            }
        }
        info!(id = %comment.id, "comment appended");
        Ok(comment)
    }
}

async fn read_document(path: &Path) -> BlogResult<Vec<Comment>> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no comments document yet");
            return Ok(Vec::new());
        }
        Err(e) => return Err(BlogError::io(path, e)),
    };
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(&raw).map_err(|e| BlogError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

async fn write_document(path: &Path, comments: &[Comment]) -> BlogResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| BlogError::io(parent, e))?;
    }

    let json = serde_json::to_vec_pretty(comments).map_err(|e| BlogError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    // Readers never see a half-written document.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .await
        .map_err(|e| BlogError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        if let Err(cleanup) = fs::remove_file(&tmp).await {
            warn!(path = %tmp.display(), "failed to remove temp file: {}", cleanup);
        }
        return Err(BlogError::io(path, e));
    }
    Ok(())
}
