//! Public asset URLs.

use url::Url;

use exthost_core::{AppError, AppResult};

/// Builds root-relative URLs under the host's public URL.
///
/// `https://cms.example.com/base/` and `/base` both produce `/base/...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetUrl {
    /// Path segments of the public URL.
    segments: Vec<String>,
}

impl AssetUrl {
    /// Parses the host's public URL, absolute or root-relative.
    pub fn new(public_url: &str) -> AppResult<Self> {
        let path = if public_url.contains("://") {
            Url::parse(public_url)
                .map_err(|e| AppError::configuration(format!("Invalid public URL '{public_url}': {e}")))?
                .path()
                .to_string()
        } else {
            public_url.to_string()
        };

        Ok(Self {
            segments: split_segments(&path),
        })
    }

    /// Appends `segments` to the public path and renders it root-relative.
    pub fn join(&self, segments: &[&str]) -> String {
        let mut path = String::new();
        for segment in self.segments.iter().map(String::as_str).chain(segments.iter().copied()) {
            for part in split_segments(segment) {
                path.push('/');
                path.push_str(&part);
            }
        }
        if path.is_empty() {
            path.push('/');
        }
        path
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_public_url() {
        let url = AssetUrl::new("/").unwrap();
        assert_eq!(url.join(&["admin", "assets", "vue.ab12cd34.entry.js"]), "/admin/assets/vue.ab12cd34.entry.js");
        assert_eq!(url.join(&[]), "/");
    }

    #[test]
    fn test_absolute_public_url_becomes_root_relative() {
        let url = AssetUrl::new("https://cms.example.com/base/").unwrap();
        assert_eq!(url.join(&["admin", "assets"]), "/base/admin/assets");
    }

    #[test]
    fn test_relative_base_path() {
        let url = AssetUrl::new("/nested/cms").unwrap();
        assert_eq!(url.join(&["admin/assets/", "x.js"]), "/nested/cms/admin/assets/x.js");
    }

    #[test]
    fn test_invalid_absolute_url() {
        assert!(AssetUrl::new("http://[bad").is_err());
    }
}
