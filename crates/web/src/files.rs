//! Static file serving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mime::Mime;
use rook_http::protocol::ResponseSpec;
use tracing::debug;

/// Serves files below one root directory.
///
/// The extension to MIME type table is built once on construction and never changes.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    mime_types: HashMap<&'static str, Mime>,
}

static OCTET_STREAM: Mime = mime::APPLICATION_OCTET_STREAM;

fn mime_types() -> HashMap<&'static str, Mime> {
    HashMap::from([
        ("html", mime::TEXT_HTML_UTF_8),
        ("htm", mime::TEXT_HTML_UTF_8),
        ("css", mime::TEXT_CSS_UTF_8),
        ("js", mime::TEXT_JAVASCRIPT),
        ("mjs", mime::TEXT_JAVASCRIPT),
        ("json", mime::APPLICATION_JSON),
        ("txt", mime::TEXT_PLAIN_UTF_8),
        ("csv", mime::TEXT_CSV_UTF_8),
        ("xml", mime::TEXT_XML),
        ("png", mime::IMAGE_PNG),
        ("jpg", mime::IMAGE_JPEG),
        ("jpeg", mime::IMAGE_JPEG),
        ("gif", mime::IMAGE_GIF),
        ("bmp", mime::IMAGE_BMP),
        ("svg", mime::IMAGE_SVG),
        ("woff", mime::FONT_WOFF),
        ("woff2", mime::FONT_WOFF2),
        ("pdf", mime::APPLICATION_PDF),
    ])
}

impl StaticFiles {
    /// Serves files below `root`, which is not required to exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), mime_types: mime_types() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The MIME type for `path`, by extension; `application/octet-stream` when unknown.
    pub fn content_type(&self, path: &str) -> &str {
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.mime_types.get(ext.to_ascii_lowercase().as_str()))
            .unwrap_or(&OCTET_STREAM)
            .as_ref()
    }

    /// Maps a request relative path below the root. `None` if it tries to leave the root.
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();
        for segment in path.split('/').filter(|segment| !segment.is_empty() && *segment != ".") {
            if segment == ".." || segment.contains('\\') {
                return None;
            }
            resolved.push(segment);
        }
        Some(resolved)
    }

    /// Responds with the file at `path` (relative to the root), or a `404` if it can not be read.
    pub async fn send_file(&self, path: &str) -> ResponseSpec {
        let Some(full_path) = self.resolve(path) else {
            debug!(path, "rejected path outside of static root");
            return ResponseSpec::not_found();
        };

        match tokio::fs::read(&full_path).await {
            Ok(content) => ResponseSpec::ok(self.content_type(path), content),
            Err(e) => {
                debug!(path = %full_path.display(), cause = %e, "can not read static file");
                ResponseSpec::not_found()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    fn fixture(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("rook-files-{}-{name}", std::process::id()));
        std::fs::create_dir_all(root.join("assets")).unwrap();
        std::fs::write(root.join("index.html"), "<h1>rook</h1>").unwrap();
        std::fs::write(root.join("assets").join("app.js"), "console.log(1)").unwrap();
        root
    }

    #[test]
    fn content_types() {
        let files = StaticFiles::new("dist");
        assert_eq!(files.content_type("index.html"), "text/html; charset=utf-8");
        assert_eq!(files.content_type("assets/app.JS"), "text/javascript");
        assert_eq!(files.content_type("logo.png"), "image/png");
        assert_eq!(files.content_type("archive.tar.unknown"), "application/octet-stream");
        assert_eq!(files.content_type("README"), "application/octet-stream");
    }

    #[tokio::test]
    async fn serves_file() {
        let files = StaticFiles::new(fixture("serve"));

        let response = files.send_file("assets/app.js").await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header("Content-Type"), Some("text/javascript"));
        assert_eq!(response.header("Content-Length"), Some("14"));
        assert_eq!(&response.body[..], b"console.log(1)");

        let response = files.send_file("/index.html").await;
        assert_eq!(response.header("Content-Length"), Some("13"));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let files = StaticFiles::new(fixture("missing"));
        assert_eq!(files.send_file("nope.css").await, ResponseSpec::not_found());
        assert_eq!(files.send_file("assets").await, ResponseSpec::not_found());
    }

    #[tokio::test]
    async fn parent_segments_are_rejected() {
        let root = fixture("parent");
        let files = StaticFiles::new(root.join("assets"));
        assert_eq!(files.send_file("../index.html").await, ResponseSpec::not_found());
        assert_eq!(files.send_file("./app.js").await.status, StatusCode::OK);
    }
}
