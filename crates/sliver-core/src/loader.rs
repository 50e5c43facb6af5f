//! Template storage and name resolution.
//!
//! A [`TemplateSet`] holds parsed templates by name and resolves an ordered
//! list of candidate names down to one [`ResolvedTemplate`] with its
//! inheritance chain applied.

use crate::template::{flatten_root, inherit};
use crate::{ResolvedTemplate, Result, SliverError, Template};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// File extensions picked up by [`TemplateSet::from_dir`].
pub const TEMPLATE_EXTENSIONS: &[&str] = &["html", "hbs", "txt"];

/// One template name or an ordered list of candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateNames(Vec<String>);

impl TemplateNames {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for TemplateNames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for TemplateNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for TemplateNames {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<&[&str]> for TemplateNames {
    fn from(names: &[&str]) -> Self {
        Self::new(names.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for TemplateNames {
    fn from(names: [&str; N]) -> Self {
        Self::new(names)
    }
}

/// Parsed templates keyed by name.
///
/// Resolved templates are cached. Each cache entry carries the generation it
/// was built in, and only entries of the current generation are served.
#[derive(Debug, Default)]
pub struct TemplateSet {
    templates: DashMap<String, Arc<Template>>,
    resolved: DashMap<String, (u64, Arc<ResolvedTemplate>)>,
    generation: AtomicU64,
}

impl TemplateSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register a template source.
    ///
    /// Replaces any template of the same name and clears resolved entries.
    pub fn add_raw(&self, name: impl Into<String>, source: &str) -> Result<()> {
        let template = Template::parse(name, source)?;
        debug!(
            "Registered template '{}' with blocks {:?}",
            template.name,
            template.block_names()
        );
        self.templates.insert(template.name.clone(), Arc::new(template));
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.resolved.clear();
        Ok(())
    }

    /// Builder variant of [`TemplateSet::add_raw`].
    pub fn with_raw(self, name: impl Into<String>, source: &str) -> Result<Self> {
        self.add_raw(name, source)?;
        Ok(self)
    }

    /// Load every template file under `dir`.
    ///
    /// Names are paths relative to `dir` using `/` separators, e.g.
    /// `partials/nav.html`.
    pub async fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let root = dir.as_ref();
        let set = Self::new();
        let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if is_template_file(&path) {
                    let source = tokio::fs::read_to_string(&path).await?;
                    set.add_raw(template_name(root, &path), &source)?;
                }
            }
        }

        info!("Loaded {} templates from {:?}", set.len(), root);
        Ok(set)
    }

    /// Whether a template with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Registered template names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Resolve the first candidate that exists.
    pub fn resolve(&self, names: &TemplateNames) -> Result<Arc<ResolvedTemplate>> {
        let found = names.as_slice().iter().find(|name| self.contains(name));
        match found {
            Some(name) => self.resolve_one(name),
            None => Err(SliverError::TemplateNotFound(names.as_slice().to_vec())),
        }
    }

    fn resolve_one(&self, name: &str) -> Result<Arc<ResolvedTemplate>> {
        // Read before any template so a concurrent add_raw bumps it past us.
        let generation = self.generation.load(Ordering::SeqCst);
        if let Some(cached) = self.resolved.get(name) {
            let (built_in, resolved) = cached.value();
            if *built_in == generation {
                return Ok(Arc::clone(resolved));
            }
        }

        let resolved = self.build(name)?;
        self.cache(name, generation, &resolved);
        Ok(resolved)
    }

    /// Walk the extends chain of `name` and apply it.
    fn build(&self, name: &str) -> Result<Arc<ResolvedTemplate>> {
        let leaf = self.get(name)?;
        let mut visited = vec![leaf.name.clone()];
        let mut chain = vec![leaf];

        while let Some(parent) = chain.last().and_then(|t| t.parent.clone()) {
            if visited.contains(&parent) {
                visited.push(parent);
                return Err(SliverError::ExtendsCycle(visited));
            }
            visited.push(parent.clone());
            chain.push(self.get(&parent)?);
        }

        let mut nodes = match chain.pop() {
            Some(root) => flatten_root(&root),
            None => Vec::new(),
        };
        while let Some(child) = chain.pop() {
            nodes = inherit(nodes, &child);
        }

        debug!("Resolved template '{}' through {:?}", name, visited);
        Ok(Arc::new(ResolvedTemplate::new(name, nodes)))
    }

    /// Store a resolution unless templates changed while it was built.
    fn cache(&self, name: &str, generation: u64, resolved: &Arc<ResolvedTemplate>) {
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!("Templates changed while resolving '{}'; not caching", name);
            return;
        }
        self.resolved
            .insert(name.to_string(), (generation, Arc::clone(resolved)));
    }

    fn get(&self, name: &str) -> Result<Arc<Template>> {
        self.templates
            .get(name)
            .map(|t| Arc::clone(t.value()))
            .ok_or_else(|| SliverError::TemplateNotFound(vec![name.to_string()]))
    }
}

fn is_template_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext))
}

fn template_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> TemplateSet {
        TemplateSet::new()
            .with_raw(
                "base.html",
                r#"<title>{{#block "title"}}Site{{/block}}</title><main>{{#block "content"}}{{/block}}</main>"#,
            )
            .unwrap()
            .with_raw(
                "page.html",
                r#"{{extends "base.html"}}{{#block "content"}}Hello{{/block}}"#,
            )
            .unwrap()
    }

    #[test]
    fn test_resolve_first_candidate() {
        let set = site();
        let names = TemplateNames::from(["missing.html", "page.html", "base.html"]);
        let resolved = set.resolve(&names).unwrap();
        assert_eq!(resolved.name(), "page.html");
        assert_eq!(resolved.source(), "<title>Site</title><main>Hello</main>");
    }

    #[test]
    fn test_resolve_not_found_lists_candidates() {
        let set = site();
        let err = set.resolve(&TemplateNames::from(["a.html", "b.html"])).unwrap_err();
        match err {
            SliverError::TemplateNotFound(names) => assert_eq!(names, vec!["a.html", "b.html"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_parent() {
        let set = TemplateSet::new()
            .with_raw("child.html", r#"{{extends "nowhere.html"}}"#)
            .unwrap();
        let err = set.resolve(&"child.html".into()).unwrap_err();
        assert!(matches!(err, SliverError::TemplateNotFound(ref n) if n == &vec!["nowhere.html".to_string()]));
    }

    #[test]
    fn test_extends_cycle() {
        let set = TemplateSet::new()
            .with_raw("a.html", r#"{{extends "b.html"}}"#)
            .unwrap()
            .with_raw("b.html", r#"{{extends "a.html"}}"#)
            .unwrap();
        let err = set.resolve(&"a.html".into()).unwrap_err();
        match err {
            SliverError::ExtendsCycle(chain) => assert_eq!(chain, vec!["a.html", "b.html", "a.html"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_add_raw_invalidates_cache() {
        let set = site();
        let first = set.resolve(&"page.html".into()).unwrap();
        assert!(Arc::ptr_eq(&first, &set.resolve(&"page.html".into()).unwrap()));

        set.add_raw("base.html", r#"{{#block "content"}}{{/block}}!"#).unwrap();
        assert_eq!(set.resolve(&"page.html".into()).unwrap().source(), "Hello!");
    }

    #[test]
    fn test_resolution_racing_add_raw_is_not_served() {
        let set = site();
        let generation = set.generation.load(Ordering::SeqCst);
        let stale = set.build("page.html").unwrap();

        set.add_raw("base.html", r#"{{#block "content"}}{{/block}}!"#).unwrap();

        // A resolution begun before the change finishes afterwards.
        set.cache("page.html", generation, &stale);
        assert!(set.resolved.is_empty());

        // Even if it slipped in, an entry from an older generation is rebuilt.
        set.resolved
            .insert("page.html".to_string(), (generation, Arc::clone(&stale)));
        assert_eq!(set.resolve(&"page.html".into()).unwrap().source(), "Hello!");
    }

    #[tokio::test]
    async fn test_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("partials")).unwrap();
        std::fs::write(dir.path().join("index.html"), r#"{{#block "main"}}Index{{/block}}"#).unwrap();
        std::fs::write(dir.path().join("partials/nav.hbs"), "<nav></nav>").unwrap();
        std::fs::write(dir.path().join("notes.md"), "skipped").unwrap();

        let set = TemplateSet::from_dir(dir.path()).await.unwrap();
        assert_eq!(set.names(), vec!["index.html", "partials/nav.hbs"]);
    }
}
