// MIT License
//
// Copyright (c) 2024 Jerome Johnson
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Handlebars tag scanning
//!
//! This module finds the next `{{ }}` or `{{{ }}}` tag in a byte buffer and
//! classifies it. The scanner is deliberately forgiving: it looks for the first
//! open delimiter and the first close delimiter after it, and whatever sits in
//! between is the tag.
//!
//! # Expression Types
//!
//! - Helpers and values: `{{name}}`, `{{asset "css/screen.css"}}`
//! - Unescaped values: `{{{name}}}`
//! - Block openers: `{{#if @blog.cover}}`
//! - Block closers: `{{/if}}`
//! - Comments: `{{! comment }}` or `{{!-- comment --}}`
//!
//! A well-formed closer never reaches the scanner: the block resolver consumes
//! it together with its opener. A closer found here has no opener.
//!
//! # Examples
//!
//! ```rust
//! use theme_handlebars_compiler::expression::{Expression, ExpressionType};
//!
//! let expr = Expression::from(b"Hello {{{name}}}!").unwrap();
//! assert_eq!(expr.expression_type, ExpressionType::Helper);
//! assert_eq!(expr.content, b"name");
//! assert!(expr.unescaped);
//! assert_eq!(expr.excise(), b"Hello !");
//! ```

static OPEN: &[u8] = b"{{";
static CLOSE: &[u8] = b"}}";
static LONG_COMMENT_OPEN: &[u8] = b"!--";
static LONG_COMMENT_CLOSE: &[u8] = b"--}}";

/// Types of Handlebars tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionType {
    /// `{{! comment }}` or `{{!-- comment --}}`, dropped by the compiler
    Comment,
    /// `{{#name ...}}`, handed to the block resolver
    Open,
    /// `{{/name}}` with no matching opener
    Close,
    /// Anything else, handed to the argument parser
    Helper,
}

/// A tag found in a template buffer
#[derive(Debug, Clone, Copy)]
pub struct Expression<'a> {
    pub expression_type: ExpressionType,
    /// Text before the tag
    pub prefix: &'a [u8],
    /// Trimmed tag interior, without the `#` of a block opener
    pub content: &'a [u8],
    /// Text after the tag
    pub postfix: &'a [u8],
    /// Whether the tag used triple braces
    pub unescaped: bool,
}

/// Finds the first occurrence of `needle` in `haystack`
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

impl<'a> Expression<'a> {
    /// Scans `src` for its first tag
    ///
    /// Returns `None` when there is no open delimiter, or no close delimiter after it.
    pub fn from(src: &'a [u8]) -> Option<Self> {
        let start = find(src, OPEN)?;
        let inner = start + OPEN.len();
        let after_open = &src[inner..];

        if after_open.starts_with(LONG_COMMENT_OPEN) {
            let body = inner + LONG_COMMENT_OPEN.len();
            if let Some(end) = find(&src[body..], LONG_COMMENT_CLOSE) {
                let end = body + end;
                return Some(Self {
                    expression_type: ExpressionType::Comment,
                    prefix: &src[..start],
                    content: src[inner..end].trim_ascii(),
                    postfix: &src[end + LONG_COMMENT_CLOSE.len()..],
                    unescaped: false,
                });
            }
        }

        let end = inner + find(after_open, CLOSE)?;
        let mut content = &src[inner..end];
        let mut close_len = CLOSE.len();
        let unescaped = content.first() == Some(&b'{');
        if unescaped {
            content = &content[1..];
            close_len += 1;
        }
        let content = content.trim_ascii();
        let postfix = &src[(end + close_len).min(src.len())..];

        let (expression_type, content) = if content.starts_with(b"! ") || content.starts_with(LONG_COMMENT_OPEN) {
            (ExpressionType::Comment, content)
        } else if let Some(block) = content.strip_prefix(b"#") {
            (ExpressionType::Open, block)
        } else if let Some(name) = content.strip_prefix(b"/") {
            (ExpressionType::Close, name.trim_ascii())
        } else {
            (ExpressionType::Helper, content)
        };

        Some(Self {
            expression_type,
            prefix: &src[..start],
            content,
            postfix,
            unescaped,
        })
    }

    /// Offset of the tag in the scanned buffer
    pub fn position(&self) -> usize {
        self.prefix.len()
    }

    /// The scanned buffer with this tag cut out
    pub fn excise(&self) -> Vec<u8> {
        let mut remains = Vec::with_capacity(self.prefix.len() + self.postfix.len());
        remains.extend_from_slice(self.prefix);
        remains.extend_from_slice(self.postfix);
        remains
    }
}

/// Byte ranges of the terminated `{{!-- --}}` comments in `src`
pub(crate) fn comment_spans(src: &[u8]) -> Vec<std::ops::Range<usize>> {
    let mut spans = Vec::new();
    let mut offset = 0;
    while let Some(found) = find(&src[offset..], OPEN) {
        let start = offset + found;
        let body = start + OPEN.len();
        if !src[body..].starts_with(LONG_COMMENT_OPEN) {
            offset = body;
            continue;
        }
        let body = body + LONG_COMMENT_OPEN.len();
        let Some(end) = find(&src[body..], LONG_COMMENT_CLOSE) else {
            break;
        };
        let end = body + end + LONG_COMMENT_CLOSE.len();
        spans.push(start..end);
        offset = end;
    }
    spans
}
