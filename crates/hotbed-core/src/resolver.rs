//! Import specifier resolution and the url/file mapping.
//!
//! Resolution order:
//!
//! 1. Registered [`ResolverPlugin`]s, first `Some` wins.
//! 2. Relative specifiers against the importer's directory.
//! 3. `/@fs/` urls and root-absolute paths, then true absolute paths.
//! 4. Bare specifiers through `node_modules` of every ancestor directory.
//!
//! A path without a recognized extension is probed with each configured
//! extension and then as a directory index. A bare specifier that cannot be
//! found locally is reported as [`Resolved::Foreign`] and left to the host.

use async_trait::async_trait;
use path_clean::PathClean;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::url::{FS_PREFIX, clean_url, is_bare_specifier};

/// Extensions probed for extensionless specifiers, in priority order.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".mjs", ".js", ".ts", ".jsx", ".tsx", ".json"];

/// `package.json` fields consulted for a package entry, in priority order.
const ENTRY_FIELDS: &[&str] = &["module", "main"];

/// Outcome of resolving one specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A file the server transforms and tracks in the graph.
    Local { file: PathBuf, url: String },
    /// Left to the host runtime. No graph edge is created.
    Foreign { specifier: String },
}

impl Resolved {
    pub fn url(&self) -> Option<&str> {
        match self {
            Resolved::Local { url, .. } => Some(url),
            Resolved::Foreign { .. } => None,
        }
    }

    pub fn file(&self) -> Option<&Path> {
        match self {
            Resolved::Local { file, .. } => Some(file),
            Resolved::Foreign { .. } => None,
        }
    }
}

/// Hook that can claim a specifier before the default algorithm runs.
#[async_trait]
pub trait ResolverPlugin: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve(&self, specifier: &str, importer: &Path) -> Option<PathBuf>;
}

/// Maps specifiers to files and files to urls for one project root.
pub struct Resolver {
    root: PathBuf,
    runtime: Arc<dyn Runtime>,
    plugins: Vec<Arc<dyn ResolverPlugin>>,
    extensions: Vec<String>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("root", &self.root)
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>, runtime: Arc<dyn Runtime>) -> Self {
        Self {
            root: root.into().clean(),
            runtime,
            plugins: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the probe list. Entries may be given with or without the dot.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.as_ref();
                if ext.starts_with('.') {
                    ext.to_string()
                } else {
                    format!(".{ext}")
                }
            })
            .collect();
        self
    }

    pub fn with_plugin(mut self, plugin: Arc<dyn ResolverPlugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    /// Resolve `specifier` as written inside `importer`.
    pub async fn resolve(&self, specifier: &str, importer: &Path) -> Result<Resolved> {
        let request = clean_url(specifier);

        for plugin in &self.plugins {
            if let Some(file) = plugin.resolve(request, importer).await {
                let file = file.clean();
                trace!(plugin = plugin.name(), specifier, file = %file.display(), "resolved by plugin");
                return Ok(self.local(file, specifier));
            }
        }

        if is_bare_specifier(request) {
            return match self.resolve_bare(request, importer).await {
                Some(file) => Ok(self.local(file, specifier)),
                None => {
                    debug!(specifier, importer = %importer.display(), "treating as foreign module");
                    Ok(Resolved::Foreign {
                        specifier: specifier.to_string(),
                    })
                }
            };
        }

        let file = self
            .resolve_path(request, importer)
            .ok_or_else(|| Error::Resolution {
                specifier: specifier.to_string(),
                importer: importer.to_path_buf(),
            })?;
        Ok(self.local(file, specifier))
    }

    /// Resolve to a file only. Foreign specifiers are an error here.
    pub async fn resolve_file(&self, specifier: &str, importer: &Path) -> Result<PathBuf> {
        match self.resolve(specifier, importer).await? {
            Resolved::Local { file, .. } => Ok(file),
            Resolved::Foreign { specifier } => Err(Error::Resolution {
                specifier,
                importer: importer.to_path_buf(),
            }),
        }
    }

    /// Find the file backing a request url, probing extensions when the url
    /// omits one.
    pub fn resolve_url(&self, url: &str) -> Result<PathBuf> {
        let candidate = self.url_to_file(url);
        self.try_file(&candidate)
            .ok_or_else(|| Error::UrlNotFound(url.to_string()))
    }

    /// Public url for a file, without any query.
    pub fn file_to_url(&self, file: &Path) -> String {
        let file = file.clean();
        match file.strip_prefix(&self.root) {
            Ok(rel) => format!("/{}", to_slash(rel)),
            Err(_) => {
                let abs = to_slash(&file);
                format!("{}{}", FS_PREFIX, abs.trim_start_matches('/'))
            }
        }
    }

    /// Inverse of [`Resolver::file_to_url`]. Pure path mapping, no probing.
    pub fn url_to_file(&self, url: &str) -> PathBuf {
        let path = clean_url(url);
        if let Some(abs) = path.strip_prefix(FS_PREFIX) {
            return PathBuf::from(format!("/{abs}")).clean();
        }
        self.root.join(path.trim_start_matches('/')).clean()
    }

    // The specifier's query carries over so `./a.css?import` and `./a.css`
    // stay distinct modules backed by one file.
    fn local(&self, file: PathBuf, specifier: &str) -> Resolved {
        let mut url = self.file_to_url(&file);
        if let Some(q) = specifier.find('?') {
            url.push_str(&specifier[q..]);
        }
        Resolved::Local { file, url }
    }

    fn resolve_path(&self, request: &str, importer: &Path) -> Option<PathBuf> {
        if request.starts_with('.') {
            let base = importer.parent().unwrap_or(&self.root);
            return self.try_file(&base.join(request).clean());
        }

        if let Some(abs) = request.strip_prefix(FS_PREFIX) {
            return self.try_file(&PathBuf::from(format!("/{abs}")).clean());
        }

        // Root-relative first so `/src/a` means the project's src.
        let rooted = self.root.join(request.trim_start_matches('/')).clean();
        self.try_file(&rooted)
            .or_else(|| self.try_file(&PathBuf::from(request).clean()))
    }

    /// Exact file, then `<path><ext>`, then `<path>/index<ext>`.
    fn try_file(&self, candidate: &Path) -> Option<PathBuf> {
        if self.runtime.is_file(candidate) {
            return Some(candidate.to_path_buf());
        }

        let raw = candidate.as_os_str().to_string_lossy();
        for ext in &self.extensions {
            let probe = PathBuf::from(format!("{raw}{ext}"));
            if self.runtime.is_file(&probe) {
                return Some(probe);
            }
        }

        if self.runtime.is_dir(candidate) {
            for ext in &self.extensions {
                let index = candidate.join(format!("index{ext}"));
                if self.runtime.is_file(&index) {
                    return Some(index);
                }
            }
        }

        None
    }

    async fn resolve_bare(&self, request: &str, importer: &Path) -> Option<PathBuf> {
        let (package, subpath) = split_package(request);
        let start = importer.parent().unwrap_or(&self.root);

        for dir in start.ancestors() {
            let package_dir = dir.join("node_modules").join(package);
            if !self.runtime.is_dir(&package_dir) {
                continue;
            }

            let found = match subpath {
                Some(sub) => self.try_file(&package_dir.join(sub).clean()),
                None => self.package_entry(&package_dir).await,
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    async fn package_entry(&self, package_dir: &Path) -> Option<PathBuf> {
        let manifest = package_dir.join("package.json");
        if let Ok(text) = self.runtime.read_to_string(&manifest).await {
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(json) => {
                    for field in ENTRY_FIELDS {
                        if let Some(entry) = json.get(*field).and_then(|v| v.as_str()) {
                            if let Some(file) = self.try_file(&package_dir.join(entry).clean()) {
                                return Some(file);
                            }
                        }
                    }
                }
                Err(e) => debug!(manifest = %manifest.display(), error = %e, "unreadable package.json"),
            }
        }
        self.try_file(&package_dir.join("index"))
    }
}

/// Split `@scope/pkg/sub/path` into (`@scope/pkg`, `Some("sub/path")`).
fn split_package(request: &str) -> (&str, Option<&str>) {
    let name_segments = if request.starts_with('@') { 2 } else { 1 };
    let mut end = 0;
    for (seen, (i, _)) in request.match_indices('/').enumerate() {
        if seen + 1 == name_segments {
            end = i;
            break;
        }
    }
    if end == 0 {
        (request, None)
    } else {
        (&request[..end], Some(&request[end + 1..]))
    }
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::memory::MemoryRuntime;

    fn resolver(runtime: MemoryRuntime) -> Resolver {
        Resolver::new("/project", Arc::new(runtime))
    }

    #[tokio::test]
    async fn relative_specifier_probes_extensions() {
        let r = resolver(MemoryRuntime::new("/project").with_file("/project/src/a.ts", ""));
        let resolved = r
            .resolve("./a", Path::new("/project/src/b.ts"))
            .await
            .unwrap();
        assert_eq!(
            resolved,
            Resolved::Local {
                file: PathBuf::from("/project/src/a.ts"),
                url: "/src/a.ts".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn extension_priority_prefers_js_over_ts() {
        let r = resolver(
            MemoryRuntime::new("/project")
                .with_file("/project/src/a.ts", "")
                .with_file("/project/src/a.js", ""),
        );
        let file = r
            .resolve_file("./a", Path::new("/project/src/main.ts"))
            .await
            .unwrap();
        assert_eq!(file, PathBuf::from("/project/src/a.js"));
    }

    #[tokio::test]
    async fn directory_index() {
        let r = resolver(MemoryRuntime::new("/project").with_file("/project/src/lib/index.tsx", ""));
        let file = r
            .resolve_file("./lib", Path::new("/project/src/main.ts"))
            .await
            .unwrap();
        assert_eq!(file, PathBuf::from("/project/src/lib/index.tsx"));
    }

    #[tokio::test]
    async fn missing_relative_is_error() {
        let r = resolver(MemoryRuntime::new("/project"));
        let err = r
            .resolve("./nope", Path::new("/project/src/main.ts"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }));
    }

    #[tokio::test]
    async fn bare_specifier_uses_package_module_field() {
        let r = resolver(
            MemoryRuntime::new("/project")
                .with_file(
                    "/project/node_modules/lib/package.json",
                    r#"{"main":"cjs.js","module":"esm.js"}"#,
                )
                .with_file("/project/node_modules/lib/esm.js", "")
                .with_file("/project/node_modules/lib/cjs.js", ""),
        );
        let resolved = r
            .resolve("lib", Path::new("/project/src/deep/main.ts"))
            .await
            .unwrap();
        assert_eq!(resolved.url(), Some("/node_modules/lib/esm.js"));
    }

    #[tokio::test]
    async fn scoped_package_subpath() {
        let r = resolver(
            MemoryRuntime::new("/project").with_file("/project/node_modules/@s/ui/button.js", ""),
        );
        let file = r
            .resolve_file("@s/ui/button", Path::new("/project/main.ts"))
            .await
            .unwrap();
        assert_eq!(file, PathBuf::from("/project/node_modules/@s/ui/button.js"));
    }

    #[tokio::test]
    async fn unknown_bare_specifier_is_foreign() {
        let r = resolver(MemoryRuntime::new("/project"));
        let resolved = r
            .resolve("node:fs", Path::new("/project/main.ts"))
            .await
            .unwrap();
        assert_eq!(
            resolved,
            Resolved::Foreign {
                specifier: "node:fs".to_string()
            }
        );
    }

    #[tokio::test]
    async fn query_is_kept_on_url() {
        let r = resolver(MemoryRuntime::new("/project").with_file("/project/src/a.css", ""));
        let resolved = r
            .resolve("./a.css?import", Path::new("/project/src/main.ts"))
            .await
            .unwrap();
        assert_eq!(resolved.url(), Some("/src/a.css?import"));
        assert_eq!(resolved.file(), Some(Path::new("/project/src/a.css")));
    }

    struct Alias;

    #[async_trait]
    impl ResolverPlugin for Alias {
        fn name(&self) -> &str {
            "alias"
        }

        async fn resolve(&self, specifier: &str, _importer: &Path) -> Option<PathBuf> {
            specifier
                .strip_prefix("@/")
                .map(|rest| PathBuf::from("/project/src").join(rest))
        }
    }

    #[tokio::test]
    async fn plugin_runs_first() {
        let r = resolver(MemoryRuntime::new("/project")).with_plugin(Arc::new(Alias));
        let resolved = r
            .resolve("@/util.ts", Path::new("/project/src/main.ts"))
            .await
            .unwrap();
        assert_eq!(resolved.url(), Some("/src/util.ts"));
    }

    #[test]
    fn url_file_mapping_is_bijective() {
        let r = resolver(MemoryRuntime::new("/project"));
        for file in ["/project/src/a.ts", "/elsewhere/lib/b.js"] {
            let url = r.file_to_url(Path::new(file));
            assert_eq!(r.url_to_file(&url), PathBuf::from(file));
        }
        assert_eq!(r.file_to_url(Path::new("/elsewhere/x.js")), "/@fs/elsewhere/x.js");
    }

    #[test]
    fn test_split_package() {
        assert_eq!(split_package("react"), ("react", None));
        assert_eq!(split_package("react/jsx-runtime"), ("react", Some("jsx-runtime")));
        assert_eq!(split_package("@s/ui"), ("@s/ui", None));
        assert_eq!(split_package("@s/ui/a/b"), ("@s/ui", Some("a/b")));
    }
}
