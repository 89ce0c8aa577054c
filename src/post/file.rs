use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

use super::{header, timestamp, Post};

pub const DEFAULT_EXTENSION: &str = "md";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Render a post as a record file with an empty body.
pub fn render(post: &Post) -> String {
    let mut lines = vec!["---".to_string()];
    lines.push(format!("{}: {}", header::TITLE, quote(&post.title)));
    lines.push(format!("{}: {}", header::IMAGE, quote(&post.image)));
    lines.push(format!("{}: {}", header::CAPTION, quote(&post.caption)));
    lines.push(format!("{}: {}", header::PUBLISHED, post.published));
    if let Some(published_at) = &post.published_at {
        lines.push(format!(
            "{}: {}",
            header::PUBLISHED_AT,
            quote(&timestamp(published_at))
        ));
    }
    lines.push(format!(
        "{}: {}",
        header::CREATED_AT,
        quote(&timestamp(&post.created_at))
    ));
    lines.push("---".to_string());
    lines.push(String::new());
    lines.join("\n")
}

fn quote(value: &str) -> String {
    // a JSON string literal is also a valid header string
    serde_json::Value::from(value).to_string()
}

pub fn file_name(post: &Post, extension: &str) -> String {
    format!("{}.{}", post.id, extension)
}

/// Write every post into `dir` as `<id>.<extension>`.
///
/// Existing files are left alone unless `overwrite` is set, since the
/// publish job owns their `published` state once they are exported.
pub async fn export(
    posts: &[Post],
    dir: &Path,
    extension: &str,
    overwrite: bool,
) -> Result<ExportSummary, ExportError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut summary = ExportSummary::default();
    for post in posts {
        let path = dir.join(file_name(post, extension));
        if !overwrite && path.exists() {
            debug!("Export was skip ({})", path.display());
            summary.skipped += 1;
            continue;
        }

        tokio::fs::write(&path, render(post))
            .await
            .map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;
        info!(" + {}", path.display());
        summary.written += 1;
    }

    Ok(summary)
}
