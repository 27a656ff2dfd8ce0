//! Hot-reloadable registry of compiled Handlebars theme templates
//!
//! Compiles every `.hbs` file of the active theme into a helper tree and keeps
//! the result in a [`Themes`] registry that render threads read from. In
//! development mode the theme directory is watched and the registry rebuilt
//! whenever a template changes.
//!
//! ```rust,no_run
//! use theme_handlebars::{FunctionMap, Options, StaticTheme, Themes, add_builtins};
//!
//! let mut functions = FunctionMap::new();
//! add_builtins(&mut functions);
//!
//! let themes = Themes::load(Options::default(), StaticTheme("casper".to_string()), functions)?;
//! let index = themes.get("index").expect("index is mandatory");
//! println!("{} top-level helpers", index.children.len());
//! # Ok::<(), theme_handlebars::Error>(())
//! ```

mod error;
mod options;
mod registry;
mod source;
mod watcher;

pub use error::{Error, Result};
pub use options::Options;
pub use registry::{Templates, Themes};
pub use source::{SourceError, StaticTheme, ThemeSource};

pub use theme_handlebars_compiler::{
    Compiler, Function, FunctionMap, Helper, HelperFunction, NULL_HELPER, ParseError, add_builtins,
};
