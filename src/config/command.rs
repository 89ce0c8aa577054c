use std::path::PathBuf;

use clap::{Args, Subcommand};

use super::ConfigError;
use crate::{
    api::{gemini, graph},
    post::file::DEFAULT_EXTENSION,
};

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create, list and reorder drafts
    Draft {
        #[command(subcommand)]
        action: DraftCommand,
    },
    /// Save the Gemini API key used by `enhance`
    ApiKey { key: String },
    /// Write a caption and a title suggestion for an image
    Enhance(EnhanceArgs),
    /// Publish the oldest unpublished record
    Publish(PublishArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum DraftCommand {
    /// Add a new draft at the end of the queue
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        image: String,
        #[arg(long)]
        caption: String,
    },
    /// Show the queue
    List,
    /// Move drafts to the front of the queue, in the given order
    Reorder {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
    },
    /// Flag a draft as published
    Publish { id: String },
    /// Write every draft as a record file
    Export {
        /// Record directory
        #[arg(long, default_value = "./posts", env = "POSTS_DIR")]
        dir: PathBuf,
        #[arg(long, default_value = DEFAULT_EXTENSION)]
        extension: String,
        /// Overwrite existing files
        #[arg(short, long)]
        overwrite: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct EnhanceArgs {
    /// Image to describe
    pub image: PathBuf,
    /// Draft caption to improve
    #[arg(long)]
    pub caption: Option<String>,
    #[arg(long, default_value = gemini::DEFAULT_API_URL, env = "GEMINI_API_URL")]
    pub api_url: String,
    #[arg(long, default_value = gemini::DEFAULT_MODEL, env = "GEMINI_MODEL")]
    pub model: String,
}

#[derive(Debug, Clone, Args)]
pub struct PublishArgs {
    /// Access token for the publishing API
    #[arg(long, env = "INSTAGRAM_TOKEN", hide_env_values = true)]
    token: Option<String>,
    /// `owner/name` of the repository hosting the images
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,
    /// Public URL images are served from, instead of the repository
    #[arg(long, env = "IMAGE_BASE_URL")]
    image_base_url: Option<String>,
    /// Record directory
    #[arg(long, default_value = "./posts", env = "POSTS_DIR")]
    pub posts: PathBuf,
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    pub extension: String,
    #[arg(long, default_value = graph::DEFAULT_API_URL, env = "INSTAGRAM_API_URL")]
    pub api_url: String,
}

impl PublishArgs {
    pub fn token(&self) -> Result<&str, ConfigError> {
        self.token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::Missing("INSTAGRAM_TOKEN"))
    }

    pub fn image_base_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = self.image_base_url.as_deref().filter(|url| !url.is_empty()) {
            return Ok(url.trim_end_matches('/').to_string());
        }

        self.repository
            .as_deref()
            .filter(|repository| !repository.is_empty())
            .map(|repository| {
                format!(
                    "https://raw.githubusercontent.com/{}/main/public/images",
                    repository
                )
            })
            .ok_or(ConfigError::Missing("GITHUB_REPOSITORY"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> PublishArgs {
        PublishArgs {
            token: None,
            repository: None,
            image_base_url: None,
            posts: PathBuf::from("./posts"),
            extension: DEFAULT_EXTENSION.to_string(),
            api_url: graph::DEFAULT_API_URL.to_string(),
        }
    }

    #[test]
    fn test_missing_token() {
        let mut args = args();
        assert_eq!(args.token(), Err(ConfigError::Missing("INSTAGRAM_TOKEN")));

        args.token = Some(String::new());
        assert_eq!(args.token(), Err(ConfigError::Missing("INSTAGRAM_TOKEN")));

        args.token = Some("abc".to_string());
        assert_eq!(args.token(), Ok("abc"));
    }

    #[test]
    fn test_image_base_url_from_repository() {
        let mut args = args();
        assert_eq!(
            args.image_base_url(),
            Err(ConfigError::Missing("GITHUB_REPOSITORY"))
        );

        args.repository = Some("owner/posts".to_string());
        assert_eq!(
            args.image_base_url().unwrap(),
            "https://raw.githubusercontent.com/owner/posts/main/public/images"
        );

        args.image_base_url = Some("https://cdn.example.com/img/".to_string());
        assert_eq!(args.image_base_url().unwrap(), "https://cdn.example.com/img");
    }
}
