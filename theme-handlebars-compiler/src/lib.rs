//! Compiler for Handlebars-style theme templates
//!
//! Template sources are compiled into a tree of [`Helper`] nodes that a renderer
//! walks later. The compiler handles:
//!
//! - Values and helpers: `{{title}}`, `{{asset "css/screen.css"}}`
//! - Unescaped values: `{{{body}}}`
//! - Named arguments: `{{date format="MMMM DD, YYYY"}}`
//! - Block helpers with else branches: `{{#if @blog.cover}}...{{else}}...{{/if}}`
//! - Comments: `{{! note }}` and `{{!-- note --}}`
//!
//! Helper names are bound to callables from a [`FunctionMap`] at compile time.
//! Names with no entry resolve to the `null` helper instead of failing.

mod parser;

pub use parser::{block, compiler, error, expression, expression_tokenizer, helper};

pub use parser::compiler::Compiler;
pub use parser::error::{ParseError, Result};
pub use parser::helper::{Function, FunctionMap, Helper, HelperFunction, NULL_HELPER, add_builtins};
