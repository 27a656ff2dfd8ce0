use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use theme_handlebars::{Error, FunctionMap, Helper, Options, SourceError, StaticTheme, Themes, add_builtins};

fn make_map() -> FunctionMap {
    let mut map = FunctionMap::new();
    add_builtins(&mut map);
    map
}

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A themes directory with a complete `casper` theme
fn casper() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "casper/default.hbs", "<html>{{! layout }}{{{body}}}</html>");
    write(
        root,
        "casper/index.hbs",
        "{{!< default}}{{#foreach posts}}<a>{{title}}</a>{{else}}none{{/foreach}}",
    );
    write(root, "casper/post.hbs", r#"{{#post}}<h1>{{title}}</h1>{{date format="YYYY"}}{{/post}}"#);
    write(root, "casper/partials/navigation.hbs", "<nav>{{#each navigation}}{{label}}{{/each}}</nav>");
    write(root, "casper/assets/screen.css", "body { color: red }");
    temp
}

fn options(temp: &TempDir) -> Options {
    Options {
        themes_path: temp.path().to_path_buf(),
        ..Options::default()
    }
}

fn load(temp: &TempDir) -> Themes {
    Themes::load(options(temp), StaticTheme("casper".to_string()), make_map()).unwrap()
}

#[test]
fn test_compiles_every_template() {
    let temp = casper();
    let themes = load(&temp);

    assert_eq!(themes.template_names(), vec!["default", "index", "navigation", "post"]);
    assert_eq!(themes.generation(), 1);
    assert_eq!(themes.active_theme(), "casper");

    let default = themes.get("default").unwrap();
    assert_eq!(default.block, b"<html></html>");
    assert_eq!(default.body_helper().map(|h| h.unescaped), Some(true));

    let index = themes.get("index").unwrap();
    let foreach = &index.children[1];
    assert_eq!(foreach.name, "foreach");
    assert_eq!(foreach.block, b"<a></a>");
    assert_eq!(foreach.else_branch().map(|h| h.block.clone()), Some(b"none".to_vec()));

    let post = themes.get("post").unwrap();
    let date = &post.children[0].children[1];
    assert_eq!(date.arguments[0].name, "format=YYYY");
}

#[test]
fn test_duplicate_names_fail() {
    let temp = casper();
    write(temp.path(), "casper/partials/index.hbs", "{{title}}");

    let themes = Themes::new(options(&temp), StaticTheme("casper".to_string()), make_map());
    let err = themes.regenerate().unwrap_err();
    assert!(matches!(err, Error::DuplicateTemplate { ref name, .. } if name == "index"));
    assert!(themes.get("index").is_none());
    assert_eq!(themes.generation(), 0);
}

#[test]
fn test_missing_mandatory_template_fails() {
    let temp = casper();
    fs::remove_file(temp.path().join("casper/post.hbs")).unwrap();

    let err = Themes::load(options(&temp), StaticTheme("casper".to_string()), make_map())
        .err()
        .unwrap();
    assert!(matches!(err, Error::MissingTemplate(ref name) if name == "post"));
    assert_eq!(err.to_string(), "Couldn't compile template 'post'. Is post.hbs missing?");
}

#[test]
fn test_failed_rebuild_keeps_previous_generation() {
    let temp = casper();
    let themes = load(&temp);
    let before = themes.snapshot();

    write(temp.path(), "casper/index.hbs", "{{#if broken}}never closed");
    let err = themes.regenerate().unwrap_err();
    assert!(matches!(err, Error::Parse { ref name, .. } if name == "index"));
    assert!(err.to_string().contains("unbalanced block tag named if"));

    assert_eq!(themes.generation(), 1);
    assert!(Arc::ptr_eq(&before, &themes.snapshot()));
    assert_eq!(themes.get("index").unwrap().children[1].name, "foreach");
}

#[test]
fn test_missing_theme_directory_is_recoverable() {
    let temp = casper();
    let active = Arc::new(Mutex::new("casper".to_string()));
    let source = {
        let active = active.clone();
        move || -> Result<String, SourceError> { Ok(active.lock().clone()) }
    };
    let themes = Themes::load(options(&temp), source, make_map()).unwrap();

    *active.lock() = "vanished".to_string();
    let err = themes.regenerate().unwrap_err();
    assert!(matches!(err, Error::ThemeNotFound(ref path) if path.ends_with("vanished")));
    assert_eq!(themes.active_theme(), "casper");
    assert!(themes.get("post").is_some());
}

#[test]
fn test_unresolvable_theme_is_config_error() {
    let temp = casper();
    let source = || -> Result<String, SourceError> { Err("no active theme in settings".into()) };
    let err = Themes::load(options(&temp), source, make_map()).err().unwrap();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("no active theme in settings"));
}

#[test]
fn test_switching_themes_replaces_templates() {
    let temp = casper();
    write(temp.path(), "london/index.hbs", "{{title}}");
    write(temp.path(), "london/post.hbs", "{{content}}");
    let active = Arc::new(Mutex::new("casper".to_string()));
    let source = {
        let active = active.clone();
        move || -> Result<String, SourceError> { Ok(active.lock().clone()) }
    };
    let themes = Themes::load(options(&temp), source, make_map()).unwrap();

    *active.lock() = "london".to_string();
    themes.regenerate().unwrap();
    assert_eq!(themes.active_theme(), "london");
    assert_eq!(themes.template_names(), vec!["index", "post"]);
    assert_eq!(themes.generation(), 2);
}

#[test]
fn test_recompiling_is_idempotent() {
    let temp = casper();
    let themes = load(&temp);
    let first = themes.snapshot();
    themes.regenerate().unwrap();
    let second = themes.snapshot();

    assert_eq!(first.names(), second.names());
    for (name, helper) in first.iter() {
        let other: &Helper = second.get(name).unwrap();
        assert_eq!(helper.as_ref(), other);
    }
    assert_eq!(second.generation(), first.generation() + 1);
}

#[test]
fn test_readers_keep_their_snapshot() {
    let temp = casper();
    let themes = load(&temp);
    let held = themes.get("post").unwrap();

    write(temp.path(), "casper/post.hbs", "{{content}}");
    themes.regenerate().unwrap();

    assert_eq!(held.children[0].name, "post");
    assert_eq!(themes.get("post").unwrap().children[0].name, "content");
}

#[test]
fn test_request_regenerate_without_worker_rebuilds_now() {
    let temp = casper();
    let themes = load(&temp);
    themes.request_regenerate().unwrap();
    assert_eq!(themes.generation(), 2);
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

fn first_child(themes: &Themes, name: &str) -> Option<String> {
    themes.get(name)?.children.first().map(|child| child.name.clone())
}

#[test]
fn test_dev_mode_watches_and_rebuilds() {
    let temp = casper();
    // Canonicalize to handle macOS /var -> /private/var symlinks
    let themes_path = temp.path().canonicalize().unwrap();
    let options = Options {
        themes_path: themes_path.clone(),
        dev_mode: true,
        debounce_ms: 50,
        ..Options::default()
    };
    let themes = Themes::load(options, StaticTheme("casper".to_string()), make_map()).unwrap();

    let theme = themes_path.join("casper");
    assert_eq!(
        themes.watched_directories(),
        vec![theme.clone(), theme.join("assets"), theme.join("partials")]
    );

    fs::write(theme.join("post.hbs"), "{{content}}").unwrap();
    assert!(
        wait_until(|| first_child(&themes, "post").as_deref() == Some("content")),
        "rebuild was not triggered"
    );

    let generation = themes.generation();
    themes.request_regenerate().unwrap();
    assert!(wait_until(|| themes.generation() > generation), "queued rebuild did not run");
}
