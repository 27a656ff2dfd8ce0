//! Compiled template registry
//!
//! A [`Themes`] registry holds the compiled templates of the active theme. A
//! rebuild compiles every `.hbs` file of the theme into a fresh generation off
//! to the side; only a complete, validated generation replaces the committed
//! one. Readers grab an `Arc` of the committed generation, so a render keeps a
//! consistent view even while a rebuild is running.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use theme_handlebars_compiler::{Compiler, FunctionMap, Helper};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::options::Options;
use crate::source::ThemeSource;
use crate::watcher::{RebuildQueue, ThemeWatcher, is_template};

/// One committed generation of compiled templates
#[derive(Debug, Default)]
pub struct Templates {
    templates: HashMap<String, Arc<Helper>>,
    theme: String,
    generation: u64,
}

impl Templates {
    pub fn get(&self, name: &str) -> Option<&Arc<Helper>> {
        self.templates.get(name)
    }

    /// Template names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// The theme this generation was compiled from, empty before the first build
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Counts successful rebuilds, zero before the first one
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Helper>)> {
        self.templates.iter().map(|(name, helper)| (name.as_str(), helper))
    }
}

/// Template name of a theme file: its base name without extension
fn template_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Default)]
struct RebuildState {
    watcher: Option<ThemeWatcher>,
    generation: u64,
}

pub(crate) struct Shared {
    options: Options,
    source: Box<dyn ThemeSource>,
    compiler: Compiler,
    current: RwLock<Arc<Templates>>,
    rebuild: Mutex<RebuildState>,
    queue: OnceLock<RebuildQueue>,
}

impl Shared {
    fn compile_theme(&self, theme_path: &Path) -> Result<HashMap<String, Arc<Helper>>> {
        let mut templates = HashMap::new();
        for entry in WalkDir::new(theme_path).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type().is_dir() || !is_template(path) {
                continue;
            }
            let name = template_name(path);
            if templates.contains_key(&name) {
                return Err(Error::DuplicateTemplate {
                    name,
                    path: path.to_path_buf(),
                });
            }
            let data = fs::read(path).map_err(|source| Error::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let helper = self
                .compiler
                .compile(&data, &name)
                .map_err(|source| Error::Parse {
                    name: name.clone(),
                    source,
                })?;
            debug!(template = %name, path = %path.display(), "Compiled theme file");
            templates.insert(name, Arc::new(helper));
        }
        Ok(templates)
    }

    fn compile_generation(&self, theme_path: &Path) -> Result<HashMap<String, Arc<Helper>>> {
        let templates = self.compile_theme(theme_path)?;
        for name in &self.options.mandatory_templates {
            if !templates.contains_key(name) {
                return Err(Error::MissingTemplate(name.clone()));
            }
        }
        Ok(templates)
    }

    fn watch(self: &Arc<Self>, state: &mut RebuildState, theme_path: &Path) -> Result<()> {
        let queue = match self.queue.get() {
            Some(queue) => queue,
            None => {
                let queue = RebuildQueue::spawn(Arc::downgrade(self))?;
                self.queue.get_or_init(|| queue)
            }
        };
        let watcher = match state.watcher.take() {
            Some(watcher) => watcher,
            None => ThemeWatcher::new(queue.clone(), Duration::from_millis(self.options.debounce_ms))?,
        };
        state.watcher.insert(watcher).watch_theme(theme_path)
    }

    /// Swaps in a compiled generation, then points the watcher at the theme in development mode
    ///
    /// A watcher failure is logged and never discards the compiled generation.
    fn commit(
        self: &Arc<Self>,
        state: &mut RebuildState,
        theme: String,
        theme_path: &Path,
        compiled: Result<HashMap<String, Arc<Helper>>>,
    ) -> Result<()> {
        let committed = compiled.map(|templates| {
            state.generation += 1;
            let generation = Templates {
                templates,
                theme,
                generation: state.generation,
            };
            info!(
                theme = %generation.theme,
                templates = generation.len(),
                generation = generation.generation,
                "Compiled theme"
            );
            *self.current.write() = Arc::new(generation);
        });

        // Keep watching even when the theme is broken, so the fix gets picked up.
        if self.options.dev_mode {
            if let Err(e) = self.watch(state, theme_path) {
                warn!(path = %theme_path.display(), error = %e, "Failed to watch theme directory");
            }
        }
        committed
    }

    /// Rebuilds the registry from the active theme
    ///
    /// Rebuilds are serialized. The committed generation is replaced only when
    /// every file compiled and the mandatory templates are present.
    pub(crate) fn regenerate(self: &Arc<Self>) -> Result<()> {
        let mut state = self.rebuild.lock();
        let theme = self.source.active_theme().map_err(Error::Config)?;
        let theme_path = self.options.themes_path.join(&theme);
        if !theme_path.is_dir() {
            return Err(Error::ThemeNotFound(theme_path));
        }

        let compiled = self.compile_generation(&theme_path);
        self.commit(&mut state, theme, &theme_path, compiled)
    }
}

/// Registry of the active theme's compiled templates
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct Themes {
    shared: Arc<Shared>,
}

impl Themes {
    /// Creates an empty registry; call [`Themes::regenerate`] to compile the theme
    pub fn new(options: Options, source: impl ThemeSource + 'static, functions: FunctionMap) -> Self {
        Self {
            shared: Arc::new(Shared {
                options,
                source: Box::new(source),
                compiler: Compiler::new(functions),
                current: RwLock::new(Arc::new(Templates::default())),
                rebuild: Mutex::new(RebuildState::default()),
                queue: OnceLock::new(),
            }),
        }
    }

    /// Creates a registry and compiles the active theme
    pub fn load(options: Options, source: impl ThemeSource + 'static, functions: FunctionMap) -> Result<Self> {
        let themes = Self::new(options, source, functions);
        themes.regenerate()?;
        Ok(themes)
    }

    /// Recompiles the active theme now
    ///
    /// On failure the previously committed templates stay in place.
    pub fn regenerate(&self) -> Result<()> {
        self.shared.regenerate()
    }

    /// Hands a rebuild to the background worker, or rebuilds now if there is none
    pub fn request_regenerate(&self) -> Result<()> {
        match self.shared.queue.get() {
            Some(queue) if queue.request() => Ok(()),
            _ => self.regenerate(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Helper>> {
        self.shared.current.read().get(name).cloned()
    }

    /// The committed generation
    pub fn snapshot(&self) -> Arc<Templates> {
        self.shared.current.read().clone()
    }

    pub fn template_names(&self) -> Vec<String> {
        self.snapshot().names().into_iter().map(str::to_string).collect()
    }

    pub fn generation(&self) -> u64 {
        self.shared.current.read().generation()
    }

    pub fn active_theme(&self) -> String {
        self.shared.current.read().theme().to_string()
    }

    /// Compiles a single template with this registry's helpers, without registering it
    pub fn compile_str(&self, name: &str, src: &str) -> Result<Helper> {
        self.shared
            .compiler
            .compile(src.as_bytes(), name)
            .map_err(|source| Error::Parse {
                name: name.to_string(),
                source,
            })
    }

    /// Directories currently watched for changes, empty outside development mode
    pub fn watched_directories(&self) -> Vec<PathBuf> {
        let state = self.shared.rebuild.lock();
        state
            .watcher
            .as_ref()
            .map(|watcher| watcher.watched().to_vec())
            .unwrap_or_default()
    }

    pub fn options(&self) -> &Options {
        &self.shared.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticTheme;
    use theme_handlebars_compiler::add_builtins;

    fn make_map() -> FunctionMap {
        let mut map = FunctionMap::new();
        add_builtins(&mut map);
        map
    }

    #[test]
    fn test_template_name() {
        assert_eq!(template_name(Path::new("/themes/casper/index.hbs")), "index");
        assert_eq!(template_name(Path::new("partials/post.en.hbs")), "post.en");
    }

    #[test]
    fn test_new_registry_is_empty() {
        let themes = Themes::new(Options::default(), StaticTheme("casper".to_string()), make_map());
        assert_eq!(themes.generation(), 0);
        assert!(themes.snapshot().is_empty());
        assert!(themes.get("index").is_none());
        assert_eq!(themes.active_theme(), "");
        assert!(themes.watched_directories().is_empty());
    }

    #[test]
    fn test_watch_failure_keeps_compiled_generation() {
        let options = Options {
            dev_mode: true,
            debounce_ms: 50,
            ..Options::default()
        };
        let themes = Themes::new(options, StaticTheme("casper".to_string()), make_map());
        let temp = tempfile::TempDir::new().unwrap();
        let vanished = temp.path().join("casper");

        let mut templates = HashMap::new();
        let index = themes.compile_str("index", "{{title}}").unwrap();
        templates.insert("index".to_string(), Arc::new(index));

        let shared = &themes.shared;
        let mut state = shared.rebuild.lock();
        shared
            .commit(&mut state, "casper".to_string(), &vanished, Ok(templates))
            .unwrap();
        drop(state);

        assert_eq!(themes.generation(), 1);
        assert_eq!(themes.active_theme(), "casper");
        assert_eq!(themes.get("index").unwrap().children[0].name, "title");
        assert!(themes.watched_directories().is_empty());
    }

    #[test]
    fn test_compile_str() {
        let themes = Themes::new(Options::default(), StaticTheme("casper".to_string()), make_map());
        let root = themes.compile_str("inline", "<p>{{title}}</p>").unwrap();
        assert_eq!(root.name, "inline");
        assert_eq!(root.children[0].name, "title");

        let err = themes.compile_str("broken", "{{#if a}}").unwrap_err();
        assert!(matches!(err, Error::Parse { ref name, .. } if name == "broken"));
    }
}
