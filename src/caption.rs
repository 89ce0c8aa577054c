use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, info};
use mime_guess::MimeGuess;
use thiserror::Error;

use crate::api::{
    gemini::{GeminiClient, Part},
    ApiError,
};

#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("no Gemini API key saved, set one with `api-key <KEY>`")]
    MissingApiKey,
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not an image ({mime})", .path.display())]
    NotAnImage { path: PathBuf, mime: String },
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enhanced {
    pub caption: String,
    pub suggested_title: String,
}

fn caption_prompt(draft: Option<&str>) -> String {
    match draft.map(str::trim).filter(|draft| !draft.is_empty()) {
        Some(draft) => format!(
            "Enhance this Instagram caption: \"{}\". Make it engaging, add relevant hashtags, and keep it under 2000 characters.",
            draft
        ),
        None => "Create an engaging Instagram caption for this image. Include relevant hashtags and keep it under 2000 characters.".to_string(),
    }
}

fn title_prompt(caption: &str) -> String {
    format!(
        "Based on this Instagram caption: \"{}\", suggest a short, descriptive title (3-5 words) in kebab-case format (lowercase words separated by hyphens) that would work well as part of a filename. Return ONLY the kebab-case title, nothing else.",
        caption
    )
}

/// Lowercase a model-suggested title and keep only `[a-z0-9-]`.
pub fn sanitize_title(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// Load an image as an inline request part.
pub async fn image_part(path: &Path) -> Result<Part, CaptionError> {
    let mime = MimeGuess::from_path(path).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(CaptionError::NotAnImage {
            path: path.to_path_buf(),
            mime: mime.to_string(),
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(|source| CaptionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded {} ({} bytes, {})", path.display(), bytes.len(), mime);

    Ok(Part::InlineData {
        mime_type: mime.to_string(),
        data: STANDARD.encode(bytes),
    })
}

/// Write or improve a caption for an image and suggest a filename title.
pub async fn enhance(
    client: &GeminiClient,
    image: &Path,
    draft: Option<&str>,
) -> Result<Enhanced, CaptionError> {
    let image = image_part(image).await?;

    info!("Generating caption");
    let caption = client
        .generate(&[Part::Text(caption_prompt(draft)), image])
        .await?;

    info!("Generating title");
    let title = client.generate(&[Part::Text(title_prompt(&caption))]).await?;

    Ok(Enhanced {
        caption,
        suggested_title: sanitize_title(&title),
    })
}
