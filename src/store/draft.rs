use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::{KeyValueStore, StoreError};
use crate::post::{post_id, Post};

pub const POSTS_KEY: &str = "dreamnode_posts";
pub const API_KEY_KEY: &str = "dreamnode_gemini_api_key";

/// The draft queue, kept in a [`KeyValueStore`] under [`POSTS_KEY`].
///
/// Every mutation rewrites the whole collection in a single `set`.
#[derive(Debug)]
pub struct DraftStore<S> {
    store: S,
    clock: fn() -> DateTime<Utc>,
}

impl<S: KeyValueStore> DraftStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    pub fn with_clock(store: S, clock: fn() -> DateTime<Utc>) -> Self {
        Self { store, clock }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn list(&self) -> Result<Vec<Post>, StoreError> {
        match self.store.get(POSTS_KEY)? {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => Ok(vec![]),
        }
    }

    fn save(&mut self, posts: &[Post]) -> Result<(), StoreError> {
        let data = serde_json::to_string(posts)?;
        self.store.set(POSTS_KEY, data)
    }

    /// Append a new draft. A clashing id gets a `-2`, `-3`, ... suffix.
    pub fn create(&mut self, title: &str, image: &str, caption: &str) -> Result<Post, StoreError> {
        let now = (self.clock)();
        let mut posts = self.list()?;

        let base = post_id(now.date_naive(), title);
        let mut id = base.clone();
        let mut n = 1;
        while posts.iter().any(|post| post.id == id) {
            n += 1;
            id = format!("{}-{}", base, n);
        }

        let post = Post::new(id, title.to_string(), image.to_string(), caption.to_string(), now);
        debug!("Created draft {}", post.id);
        posts.push(post.clone());
        self.save(&posts)?;
        Ok(post)
    }

    /// Move the given ids to the front of the queue, in order.
    ///
    /// Posts not named keep their relative order behind them. Unknown or
    /// repeated ids are rejected before anything is written.
    pub fn reorder<T: AsRef<str>>(&mut self, order: &[T]) -> Result<(), StoreError> {
        let mut rest = self.list()?;
        let mut seen = HashSet::new();
        let mut posts = Vec::with_capacity(rest.len());

        for id in order {
            let id = id.as_ref();
            if !seen.insert(id) {
                return Err(StoreError::DuplicateId(id.to_string()));
            }
            let index = rest
                .iter()
                .position(|post| post.id == id)
                .ok_or_else(|| StoreError::UnknownId(id.to_string()))?;
            posts.push(rest.remove(index));
        }
        posts.extend(rest);

        self.save(&posts)
    }

    /// Flag a post as published. Returns `false` when no post has this id.
    ///
    /// Calling it again on a published post keeps the first `publishedAt`.
    pub fn mark_published(&mut self, id: &str) -> Result<bool, StoreError> {
        let now = (self.clock)();
        let mut posts = self.list()?;

        let Some(post) = posts.iter_mut().find(|post| post.id == id) else {
            warn!("No post with id {}", id);
            return Ok(false);
        };
        if !post.mark_published(now) {
            debug!("{} was already published", id);
            return Ok(true);
        }

        self.save(&posts)?;
        Ok(true)
    }

    pub fn api_key(&self) -> Result<Option<String>, StoreError> {
        Ok(self.store.get(API_KEY_KEY)?.filter(|key| !key.is_empty()))
    }

    pub fn set_api_key(&mut self, key: &str) -> Result<(), StoreError> {
        self.store.set(API_KEY_KEY, key.trim().to_string())
    }
}
