use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    api::{graph::GraphClient, ApiError},
    post::header::{FrontMatter, RecordError, RecordHeader},
};

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create media container: {0}")]
    CreateContainer(#[source] ApiError),
    #[error("failed to publish media container {container}: {source}")]
    Publish {
        container: String,
        #[source]
        source: ApiError,
    },
    #[error("failed to mark {} as published: {source}", .path.display())]
    Commit {
        path: PathBuf,
        #[source]
        source: RecordError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NothingToDo,
    Published { path: PathBuf, media_id: String },
}

/// A record picked for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    pub path: PathBuf,
    pub header: RecordHeader,
}

/// One run of the publish job over a directory of record files.
#[derive(Debug, Clone)]
pub struct PublishJob {
    client: GraphClient,
    posts: PathBuf,
    extension: String,
    image_base_url: String,
    clock: fn() -> DateTime<Utc>,
}

impl PublishJob {
    pub fn new(
        client: GraphClient,
        posts: impl Into<PathBuf>,
        extension: impl Into<String>,
        image_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            posts: posts.into(),
            extension: extension.into(),
            image_base_url: image_base_url.into(),
            clock: Utc::now,
        }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(&self) -> Result<Outcome, PublishError> {
        let files = scan(&self.posts, &self.extension).await?;
        info!("{} record files in {}", files.len(), self.posts.display());

        let Some(selected) = select(&files).await? else {
            info!("No posts to publish");
            return Ok(Outcome::NothingToDo);
        };
        info!("Found post to publish: {}", selected.header.title);

        let image_url = image_url(&self.image_base_url, &selected.header.image);
        debug!("Image url {}", image_url);

        info!("Creating media container");
        let container = self
            .client
            .create_container(&image_url, &selected.header.caption)
            .await
            .map_err(PublishError::CreateContainer)?;

        info!("Publishing container {}", container);
        let media_id = self
            .client
            .publish_container(&container)
            .await
            .map_err(|source| PublishError::Publish {
                container: container.clone(),
                source,
            })?;
        info!("Published with id {}", media_id);

        commit(&selected.path, &(self.clock)()).await?;
        info!("Post marked as published: {}", selected.path.display());

        Ok(Outcome::Published {
            path: selected.path,
            media_id,
        })
    }
}

/// Record files in `dir`, oldest date prefix first.
pub async fn scan(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, PublishError> {
    let read_error = |source| PublishError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    let mut files = vec![];
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(extension) {
            continue;
        }
        let mut file_type = entry.file_type().await.map_err(read_error)?;
        if file_type.is_symlink() {
            file_type = tokio::fs::metadata(&path).await.map_err(read_error)?.file_type();
        }
        if !file_type.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        files.push((name.to_string(), path));
    }

    files.sort_by(|(a, _), (b, _)| date_prefix(a).cmp(date_prefix(b)).then_with(|| a.cmp(b)));
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

fn date_prefix(name: &str) -> &str {
    name.get(..10).unwrap_or(name)
}

/// The first unpublished, complete record. Broken or incomplete records are skipped.
pub async fn select(files: &[PathBuf]) -> Result<Option<Selected>, PublishError> {
    for path in files {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| PublishError::Read {
                path: path.clone(),
                source,
            })?;
        let Ok(source) = String::from_utf8(bytes) else {
            warn!("Skip {} (not valid UTF-8)", path.display());
            continue;
        };

        match RecordHeader::parse(&source) {
            Ok(header) if header.published => debug!("Skip {} (published)", path.display()),
            Ok(header) => {
                return Ok(Some(Selected {
                    path: path.clone(),
                    header,
                }))
            }
            Err(e) => warn!("Skip {} ({})", path.display(), e),
        }
    }

    Ok(None)
}

/// Public URL of an image reference. Absolute URLs are kept as they are.
pub fn image_url(base: &str, image: &str) -> String {
    if image.starts_with("http://") || image.starts_with("https://") {
        return image.to_string();
    }

    let path = image
        .trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Flip the record at `path` to published, leaving every other byte alone.
pub async fn commit(path: &Path, now: &DateTime<Utc>) -> Result<(), PublishError> {
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PublishError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let output = FrontMatter::parse(&source)
        .and_then(|front| front.mark_published(now))
        .map_err(|source| PublishError::Commit {
            path: path.to_path_buf(),
            source,
        })?;

    tokio::fs::write(path, output)
        .await
        .map_err(|source| PublishError::Write {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE: &str = "https://raw.githubusercontent.com/owner/repo/main/public/images";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap()
    }

    fn record(title: Option<&str>, image: Option<&str>, caption: Option<&str>, published: bool) -> String {
        let mut lines = vec!["---".to_string()];
        if let Some(title) = title {
            lines.push(format!("title: \"{}\"", title));
        }
        if let Some(image) = image {
            lines.push(format!("image: \"{}\"", image));
        }
        if let Some(caption) = caption {
            lines.push(format!("caption: \"{}\"", caption));
        }
        lines.push(format!("published: {}", published));
        lines.push("---".to_string());
        lines.push("Body text stays.".to_string());
        lines.push(String::new());
        lines.join("\n")
    }

    fn complete(name: &str) -> String {
        record(Some(name), Some(&format!("{}.jpg", name)), Some("caption"), false)
    }

    fn posts(files: &[(&str, String)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn job(server: &MockServer, dir: &TempDir) -> PublishJob {
        PublishJob::new(
            GraphClient::new(server.uri(), "token"),
            dir.path(),
            "md",
            BASE,
        )
        .with_clock(now)
    }

    async fn mount_container(server: &MockServer, status: u16) {
        Mock::given(method("POST"))
            .and(path("/me/media"))
            .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
                "id": "container-1"
            })))
            .mount(server)
            .await;
    }

    async fn mount_publish(server: &MockServer, status: u16) {
        Mock::given(method("POST"))
            .and(path("/me/media_publish"))
            .and(body_string_contains("creation_id=container-1"))
            .respond_with(ResponseTemplate::new(status).set_body_json(serde_json::json!({
                "id": "media-1"
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_scan_orders_by_date_prefix() {
        let dir = posts(&[
            ("2024-01-03-c.md", complete("c")),
            ("2024-01-01-b.md", complete("b")),
            ("2024-01-01-a.md", complete("a")),
            ("2024-01-02-d.txt", complete("d")),
            ("notes.json", "{}".to_string()),
        ]);
        std::fs::create_dir(dir.path().join("2024-01-00-dir.md")).unwrap();

        let files = scan(dir.path(), "md").await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["2024-01-01-a.md", "2024-01-01-b.md", "2024-01-03-c.md"]);
    }

    #[tokio::test]
    async fn test_scan_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan(&dir.path().join("missing"), "md").await.unwrap_err();
        assert!(matches!(err, PublishError::Read { .. }));
    }

    #[tokio::test]
    async fn test_select_earliest_qualifying_record() {
        let dir = posts(&[
            ("2024-01-02-a.md", record(Some("a"), Some("a.jpg"), Some("c"), true)),
            ("2024-01-01-b.md", complete("b")),
            ("2024-01-03-c.md", record(Some("c"), Some("c.jpg"), None, false)),
        ]);

        let files = scan(dir.path(), "md").await.unwrap();
        let selected = select(&files).await.unwrap().unwrap();
        assert_eq!(selected.path, dir.path().join("2024-01-01-b.md"));
        assert_eq!(selected.header.title, "b");
    }

    #[tokio::test]
    async fn test_incomplete_records_are_never_selected() {
        let dir = posts(&[
            ("2024-01-01-a.md", record(None, Some("a.jpg"), Some("c"), false)),
            ("2024-01-02-b.md", record(Some("b"), None, Some("c"), false)),
            ("2024-01-03-c.md", record(Some("c"), Some("c.jpg"), None, false)),
            ("2024-01-04-d.md", "no header at all".to_string()),
            ("2024-01-05-e.md", record(Some("e"), Some("e.jpg"), Some("c"), true)),
        ]);

        let files = scan(dir.path(), "md").await.unwrap();
        assert_eq!(select(&files).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_utf8_record_is_skipped() {
        let dir = posts(&[("2024-01-02-good.md", complete("good"))]);
        std::fs::write(dir.path().join("2024-01-01-bad.md"), [0xff, 0xfe, b'-', b'-']).unwrap();

        let files = scan(dir.path(), "md").await.unwrap();
        assert_eq!(files.len(), 2);
        let selected = select(&files).await.unwrap().unwrap();
        assert_eq!(selected.path, dir.path().join("2024-01-02-good.md"));
    }

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url(BASE, "2024-01-01-sunset.jpg"),
            format!("{}/2024-01-01-sunset.jpg", BASE)
        );
        assert_eq!(
            image_url("https://cdn.example.com/", "/trips/sunset pier.jpg"),
            "https://cdn.example.com/trips/sunset%20pier.jpg"
        );
        assert_eq!(
            image_url(BASE, "https://elsewhere.example.com/a.jpg"),
            "https://elsewhere.example.com/a.jpg"
        );
    }

    #[tokio::test]
    async fn test_commit_rewrites_only_status() {
        let original = complete("b");
        let dir = posts(&[("2024-01-01-b.md", original.clone())]);
        let path = dir.path().join("2024-01-01-b.md");

        commit(&path, &now()).await.unwrap();

        let updated = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            updated,
            original.replace(
                "published: false\n",
                "published: true\npublishedAt: \"2024-02-01T12:00:00.000Z\"\n"
            )
        );
    }

    #[tokio::test]
    async fn test_run_publishes_and_commits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/me/media"))
            .and(body_string_contains("caption=caption"))
            .and(body_string_contains(
                "image_url=https%3A%2F%2Fraw.githubusercontent.com%2Fowner%2Frepo%2Fmain%2Fpublic%2Fimages%2Fb.jpg",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "container-1"
            })))
            .expect(1)
            .mount(&server)
            .await;
        mount_publish(&server, 200).await;

        let dir = posts(&[
            ("2024-01-01-b.md", complete("b")),
            ("2024-01-02-c.md", complete("c")),
        ]);

        let outcome = job(&server, &dir).run().await.unwrap();
        assert_eq!(
            outcome,
            Outcome::Published {
                path: dir.path().join("2024-01-01-b.md"),
                media_id: "media-1".to_string(),
            }
        );

        let header =
            RecordHeader::parse(&std::fs::read_to_string(dir.path().join("2024-01-01-b.md")).unwrap())
                .unwrap();
        assert!(header.published);
        assert_eq!(header.published_at, Some(now()));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("2024-01-02-c.md")).unwrap(),
            complete("c")
        );
    }

    #[tokio::test]
    async fn test_run_with_nothing_to_publish_makes_no_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let dir = posts(&[(
            "2024-01-01-a.md",
            record(Some("a"), Some("a.jpg"), Some("c"), true),
        )]);

        assert_eq!(job(&server, &dir).run().await.unwrap(), Outcome::NothingToDo);
    }

    #[tokio::test]
    async fn test_container_failure_leaves_record_unchanged() {
        let server = MockServer::start().await;
        mount_container(&server, 500).await;

        let dir = posts(&[("2024-01-01-b.md", complete("b"))]);
        let err = job(&server, &dir).run().await.unwrap_err();

        assert!(matches!(err, PublishError::CreateContainer(ApiError::Status { .. })));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("2024-01-01-b.md")).unwrap(),
            complete("b")
        );
    }

    #[tokio::test]
    async fn test_publish_failure_leaves_record_unchanged() {
        let server = MockServer::start().await;
        mount_container(&server, 200).await;
        mount_publish(&server, 503).await;

        let dir = posts(&[("2024-01-01-b.md", complete("b"))]);
        let err = job(&server, &dir).run().await.unwrap_err();
        assert!(matches!(err, PublishError::Publish { ref container, .. } if container == "container-1"));

        // the record is still a draft, so the next run sends it again
        let path = dir.path().join("2024-01-01-b.md");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), complete("b"));
        let files = scan(dir.path(), "md").await.unwrap();
        assert_eq!(select(&files).await.unwrap().unwrap().path, path);
    }
}
