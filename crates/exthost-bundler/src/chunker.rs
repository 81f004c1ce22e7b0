//! ES-module chunk bundler.
//!
//! Follows static and dynamic imports from the entry module, resolves them
//! on disk (relative paths and `node_modules` packages, preferring the
//! `browser` field), and emits one chunk per module with content-hashed
//! names. Specifiers listed as externals are never followed; they are
//! rewritten to their mapped URL instead.

use std::collections::{HashMap, HashSet, VecDeque};
use std::ops::Range;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use exthost_core::types::normalize_path;
use exthost_core::{AppError, AppResult};

use crate::bundler::{BundleInput, ModuleBundler, OutputChunk};
use crate::lexer::{compact, import_specifiers};

/// File name of the entry chunk.
pub const ENTRY_CHUNK: &str = "entry.js";

/// Package fields tried in order when resolving a bare specifier.
const PACKAGE_FIELDS: [&str; 3] = ["browser", "module", "main"];

/// Extensions tried when a relative specifier has none.
const MODULE_EXTENSIONS: [&str; 2] = ["js", "mjs"];

/// Where an import points.
#[derive(Debug, Clone)]
enum Target {
    External(String),
    Module(PathBuf),
}

#[derive(Debug)]
struct Import {
    range: Range<usize>,
    target: Target,
}

#[derive(Debug)]
struct ParsedModule {
    path: Option<PathBuf>,
    source: String,
    imports: Vec<Import>,
}

/// Bundles the entry and everything it imports from disk.
#[derive(Debug, Clone)]
pub struct ChunkBundler {
    /// Directory relative specifiers in the entry resolve against.
    base_dir: PathBuf,
    /// Strip blank lines, full-line comments and trailing whitespace.
    compact: bool,
}

impl Default for ChunkBundler {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ChunkBundler {
    /// Creates a compacting bundler resolving the entry against `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            compact: true,
        }
    }

    /// Keeps module sources as written.
    pub fn verbatim(mut self) -> Self {
        self.compact = false;
        self
    }

    async fn parse(&self, path: Option<PathBuf>, source: String, input: &BundleInput) -> AppResult<ParsedModule> {
        let dir = match &path {
            Some(p) => p.parent().map(Path::to_path_buf).unwrap_or_default(),
            None => self.base_dir.clone(),
        };

        let specifiers = import_specifiers(&source);

        let mut imports = Vec::with_capacity(specifiers.len());
        for (range, specifier) in specifiers {
            let target = resolve(&dir, &specifier, input).await.map_err(|e| {
                let importer = path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<entry>".to_string());
                AppError::bundle(format!("{} (imported by {importer})", e.message))
            })?;
            imports.push(Import { range, target });
        }

        Ok(ParsedModule { path, source, imports })
    }

    fn finish(&self, code: String) -> String {
        if self.compact { compact(&code) } else { code }
    }
}

#[async_trait]
impl ModuleBundler for ChunkBundler {
    async fn bundle(&self, input: &BundleInput) -> AppResult<Vec<OutputChunk>> {
        let entry = self.parse(None, input.entry.clone(), input).await?;

        let mut modules = vec![entry];
        let mut seen: HashSet<PathBuf> = HashSet::new();
        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        enqueue(&modules[0], &mut seen, &mut queue);

        while let Some(path) = queue.pop_front() {
            let source = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| AppError::bundle(format!("Failed to read module '{}': {e}", path.display())))?;
            let module = self.parse(Some(path), source, input).await?;
            enqueue(&module, &mut seen, &mut queue);
            modules.push(module);
        }

        let names: HashMap<PathBuf, String> = modules
            .iter()
            .filter_map(|m| m.path.as_ref().map(|p| (p.clone(), chunk_name(p, &m.source))))
            .collect();

        let mut chunks = Vec::with_capacity(modules.len());
        for module in modules {
            let mut code = module.source;
            for import in module.imports.iter().rev() {
                let replacement = match &import.target {
                    Target::External(url) => url.clone(),
                    Target::Module(path) => match names.get(path) {
                        Some(name) => format!("./{name}"),
                        None => continue,
                    },
                };
                code.replace_range(import.range.clone(), &replacement);
            }

            let file_name = match &module.path {
                Some(path) => names.get(path).cloned().unwrap_or_default(),
                None => ENTRY_CHUNK.to_string(),
            };
            chunks.push(OutputChunk {
                is_entry: module.path.is_none(),
                file_name,
                code: self.finish(code),
            });
        }

        debug!(chunks = chunks.len(), externals = input.externals.len(), "Bundled app extensions");
        Ok(chunks)
    }
}

fn enqueue(module: &ParsedModule, seen: &mut HashSet<PathBuf>, queue: &mut VecDeque<PathBuf>) {
    for import in &module.imports {
        if let Target::Module(path) = &import.target {
            if seen.insert(path.clone()) {
                queue.push_back(path.clone());
            }
        }
    }
}

async fn resolve(dir: &Path, specifier: &str, input: &BundleInput) -> AppResult<Target> {
    if let Some(url) = input.externals.get(specifier) {
        return Ok(Target::External(url.clone()));
    }

    let resolved = if specifier.starts_with("./") || specifier.starts_with("../") || specifier.starts_with('/') {
        resolve_file(&dir.join(specifier)).await
    } else {
        resolve_package(dir, specifier).await
    };

    resolved
        .map(Target::Module)
        .ok_or_else(|| AppError::bundle(format!("Could not resolve '{specifier}' from '{}'", dir.display())))
}

async fn resolve_file(candidate: &Path) -> Option<PathBuf> {
    let candidate = normalize_path(candidate);
    if is_file(&candidate).await {
        return Some(candidate);
    }
    for extension in MODULE_EXTENSIONS {
        let mut with_extension = candidate.clone().into_os_string();
        with_extension.push(".");
        with_extension.push(extension);
        let with_extension = PathBuf::from(with_extension);
        if is_file(&with_extension).await {
            return Some(with_extension);
        }
    }
    let index = candidate.join("index.js");
    is_file(&index).await.then_some(index)
}

/// Walks up from `dir` looking for `node_modules/<package>`.
async fn resolve_package(dir: &Path, specifier: &str) -> Option<PathBuf> {
    let (package, subpath) = split_package(specifier)?;

    for ancestor in dir.ancestors() {
        let package_dir = ancestor.join("node_modules").join(package);
        if !is_dir(&package_dir).await {
            continue;
        }
        if let Some(subpath) = subpath {
            return resolve_file(&package_dir.join(subpath)).await;
        }
        let main = package_entry(&package_dir).await;
        return resolve_file(&package_dir.join(main)).await;
    }
    None
}

/// `@scope/name/sub` → (`@scope/name`, `sub`); `name/sub` → (`name`, `sub`).
fn split_package(specifier: &str) -> Option<(&str, Option<&str>)> {
    let split_at = if specifier.starts_with('@') {
        let scope_end = specifier.find('/')?;
        specifier[scope_end + 1..].find('/').map(|i| scope_end + 1 + i)
    } else {
        specifier.find('/')
    };

    match split_at {
        Some(i) => Some((&specifier[..i], Some(&specifier[i + 1..]).filter(|s| !s.is_empty()))),
        None => Some((specifier, None)),
    }
}

async fn package_entry(package_dir: &Path) -> String {
    let manifest = tokio::fs::read_to_string(package_dir.join("package.json"))
        .await
        .ok()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok());

    manifest
        .as_ref()
        .and_then(|m| {
            PACKAGE_FIELDS
                .iter()
                .find_map(|field| m.get(*field).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| "index.js".to_string())
}

/// `<stem>.<first 8 hex of sha256(path, source)>.js`
fn chunk_name(path: &Path, source: &str) -> String {
    let stem: String = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    hasher.update([0u8]);
    hasher.update(source.as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("{}.{}.js", if stem.is_empty() { "chunk" } else { &stem }, &digest[..8])
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.map(|m| m.is_dir()).unwrap_or(false)
}
