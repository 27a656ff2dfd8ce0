//! Active theme lookup

/// Error returned by a [`ThemeSource`]
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Resolves the directory name of the active theme
///
/// Consulted once at the start of every rebuild. Closures returning
/// `Result<String, SourceError>` implement this directly:
///
/// ```rust
/// use theme_handlebars::{SourceError, ThemeSource};
///
/// let source = || -> Result<String, SourceError> { Ok("casper".to_string()) };
/// assert_eq!(source.active_theme().unwrap(), "casper");
/// ```
pub trait ThemeSource: Send + Sync {
    fn active_theme(&self) -> Result<String, SourceError>;
}

/// A theme name fixed at startup
#[derive(Debug, Clone)]
pub struct StaticTheme(pub String);

impl ThemeSource for StaticTheme {
    fn active_theme(&self) -> Result<String, SourceError> {
        Ok(self.0.clone())
    }
}

impl<F> ThemeSource for F
where
    F: Fn() -> Result<String, SourceError> + Send + Sync,
{
    fn active_theme(&self) -> Result<String, SourceError> {
        self()
    }
}
