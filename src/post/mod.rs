pub mod file;
pub mod header;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::info;
use serde::{Deserialize, Serialize};

/// A scheduled post as it is kept in the draft store.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub image: String,
    pub caption: String,
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(id: String, title: String, image: String, caption: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title,
            image,
            caption,
            published: false,
            published_at: None,
            created_at: now,
        }
    }

    /// Flip the post to published. Returns `false` when it already was.
    pub fn mark_published(&mut self, now: DateTime<Utc>) -> bool {
        if self.published {
            return false;
        }
        self.published = true;
        self.published_at = Some(now);
        true
    }
}

/// Lowercase the title and collapse everything outside `[a-z0-9]` into single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// `YYYY-MM-DD-<slug>`, the id and file stem of a post.
pub fn post_id(date: NaiveDate, title: &str) -> String {
    format!("{}-{}", date.format("%Y-%m-%d"), slugify(title))
}

/// Timestamps written into record files, e.g. `2024-01-01T08:00:00.000Z`.
pub fn timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn display_posts(posts: &[Post]) {
    if !log::log_enabled!(log::Level::Info) {
        return;
    }
    if posts.is_empty() {
        info!("No drafts");
        return;
    }

    let (mut pos_width, mut id_width) = (3_usize, 4_usize);
    for (index, post) in posts.iter().enumerate() {
        pos_width = (index + 1).to_string().len().max(pos_width);
        id_width = post.id.len().max(id_width);
    }

    info!(
        "+-{:-<pos_width$}-+-{:-<id_width$}-+-{:-<9}-+-{}------- - -",
        " # ", " Id ", " State ", " Title "
    );
    for (index, post) in posts.iter().enumerate() {
        let state = if post.published { "published" } else { "draft" };
        info!(
            "| {:>pos_width$} | {:id_width$} | {:9} | {}",
            index + 1,
            post.id,
            state,
            post.title
        );
    }
    info!(
        "+-{}-+-{}-+-{}-+------------ - -",
        "-".repeat(pos_width),
        "-".repeat(id_width),
        "-".repeat(9)
    );
}
