//! Error types for theme-handlebars

use std::path::PathBuf;

use theme_handlebars_compiler::ParseError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Couldn't resolve the active theme: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Couldn't find theme files in {}", .0.display())]
    ThemeNotFound(PathBuf),

    #[error("Failed to read template {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk theme directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(
        "Conflicting .hbs name '{name}' at {}. A theme file of the same name already exists.",
        .path.display()
    )]
    DuplicateTemplate { name: String, path: PathBuf },

    #[error("Couldn't compile template '{0}'. Is {0}.hbs missing?")]
    MissingTemplate(String),

    #[error("Failed to compile template '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: ParseError,
    },

    #[error("Filesystem watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Failed to start theme rebuild worker: {0}")]
    Spawn(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
