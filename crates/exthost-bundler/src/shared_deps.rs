//! Shared dependency discovery in the built app assets.

use std::collections::BTreeMap;
use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use crate::url::AssetUrl;

/// Logical package name → public URL of its pre-built asset.
pub type SharedDependencyMapping = BTreeMap<String, String>;

/// Matches `<dep with '/' replaced by '_'>.<8 hex>.entry.js`.
fn asset_pattern(dependency: &str) -> Option<Regex> {
    let stem = regex::escape(&dependency.replace('/', "_"));
    Regex::new(&format!(r"^{stem}\.[0-9a-f]{{8}}\.entry\.js$")).ok()
}

/// Finds the asset of each dependency in `assets`, by file name.
///
/// Dependencies without a matching asset are left out with a warning.
pub fn map_shared_dependencies(assets: &[String], dependencies: &[String], url: &AssetUrl) -> SharedDependencyMapping {
    let mut mapping = SharedDependencyMapping::new();

    for dependency in dependencies {
        let found = asset_pattern(dependency)
            .and_then(|pattern| assets.iter().find(|file| pattern.is_match(file)));

        match found {
            Some(file) => {
                let public = url.join(&["admin", "assets", file.as_str()]);
                debug!(dependency = %dependency, url = %public, "Shared dependency found");
                mapping.insert(dependency.clone(), public);
            }
            None => {
                warn!(dependency = %dependency, "Couldn't find shared extension dependency \"{dependency}\"");
            }
        }
    }

    mapping
}

/// Scans `assets_dir` and maps every dependency found there.
///
/// An unreadable directory counts as empty.
pub async fn scan_shared_dependencies(
    assets_dir: &Path,
    dependencies: &[String],
    url: &AssetUrl,
) -> SharedDependencyMapping {
    let assets = match list_files(assets_dir).await {
        Ok(files) => files,
        Err(e) => {
            warn!(dir = %assets_dir.display(), error = %e, "Couldn't read app assets directory");
            Vec::new()
        }
    };

    map_shared_dependencies(&assets, dependencies, url)
}

async fn list_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            files.push(name.to_string());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_maps_hashed_entry_assets() {
        let assets = deps(&["vue.ab12cd34.entry.js", "pinia.00ff00ff.entry.js", "index.html"]);
        let mapping = map_shared_dependencies(&assets, &deps(&["vue", "pinia"]), &AssetUrl::default());

        assert_eq!(mapping["vue"], "/admin/assets/vue.ab12cd34.entry.js");
        assert_eq!(mapping["pinia"], "/admin/assets/pinia.00ff00ff.entry.js");
    }

    #[test]
    fn test_scoped_names_use_underscores() {
        let assets = deps(&["@exthost_sdk.deadbeef.entry.js"]);
        let mapping = map_shared_dependencies(&assets, &deps(&["@exthost/sdk"]), &AssetUrl::default());
        assert_eq!(mapping["@exthost/sdk"], "/admin/assets/@exthost_sdk.deadbeef.entry.js");
    }

    #[test]
    fn test_rejects_near_misses() {
        let assets = deps(&[
            "vue.AB12CD34.entry.js",
            "vue.ab12cd3.entry.js",
            "vue-router.ab12cd34.entry.js",
            "xvue.ab12cd34.entry.js",
            "vue.ab12cd34.js",
        ]);
        let mapping = map_shared_dependencies(&assets, &deps(&["vue"]), &AssetUrl::default());
        assert!(mapping.is_empty());
    }

    #[tokio::test]
    async fn test_scan_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vue.ab12cd34.entry.js"), "export default {}").unwrap();

        let url = AssetUrl::new("/cms").unwrap();
        let mapping = scan_shared_dependencies(dir.path(), &deps(&["vue", "pinia"]), &url).await;

        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["vue"], "/cms/admin/assets/vue.ab12cd34.entry.js");
    }

    #[tokio::test]
    async fn test_missing_directory_maps_nothing() {
        let mapping = scan_shared_dependencies(
            Path::new("/definitely/not/here"),
            &deps(&["vue"]),
            &AssetUrl::default(),
        )
        .await;
        assert!(mapping.is_empty());
    }
}
