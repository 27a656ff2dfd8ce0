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

//! Handlebars tag argument parsing
//!
//! This module splits the interior of a tag into a helper name, positional
//! arguments and `key="value"` arguments.
//!
//! ## Positional arguments
//! Whitespace separated fields after the name. A field wrapped in a matching
//! pair of quotes loses one layer of them:
//! ```text
//! asset "css/screen.css"    ->  asset, css/screen.css
//! ```
//!
//! ## Named arguments
//! `key = "value"` or `key='value'` pairs, found anywhere in the tag. Each one
//! becomes a single `key=value` token appended after the positional arguments:
//! ```text
//! date format="MMMM DD, YYYY" published_at  ->  date, published_at, format=MMMM DD, YYYY
//! ```
//!
//! Malformed quoting is never an error; stray quote characters simply stay
//! part of the token.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::parser::helper::{FunctionMap, Helper};

static NAMED_ARGUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(\S+?)\s*?=\s*?['"](.*?)['"]"#).unwrap());
static QUOTED_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(.*?)["'](.+?)["']$"#).unwrap());

/// The fields of a tag interior
#[derive(Debug, Default, PartialEq)]
pub struct Arguments {
    pub name: Vec<u8>,
    pub positional: Vec<Vec<u8>>,
    /// `key=value` tokens, in the order they appear
    pub named: Vec<Vec<u8>>,
}

/// Strips a single layer of matching quotes
fn unquote(field: &[u8]) -> &[u8] {
    match field {
        [open @ (b'"' | b'\''), inner @ .., close] if open == close => inner,
        _ => field,
    }
}

/// Joins a `key=value` pair whose value still carries quotes into one token
fn join_named(pair: Vec<u8>) -> Vec<u8> {
    match QUOTED_TAIL.captures(&pair) {
        Some(caps) => [&caps[1], &caps[2]].concat(),
        None => pair,
    }
}

impl Arguments {
    pub fn parse(src: &[u8]) -> Self {
        let named = NAMED_ARGUMENT
            .captures_iter(src)
            .map(|caps| join_named([&caps[1], &b"="[..], &caps[2]].concat()))
            .collect();
        let rest = NAMED_ARGUMENT.replace_all(src, &b""[..]);

        let mut fields = rest
            .split(|c| c.is_ascii_whitespace())
            .filter(|field| !field.is_empty())
            .map(|field| unquote(field).to_vec());
        let name = fields.next().unwrap_or_default();
        Self {
            name,
            positional: fields.collect(),
            named,
        }
    }
}

fn to_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Builds a helper node from a tag interior
///
/// Arguments are leaf nodes that inherit the tag's escaping mode. A supplied
/// else branch is appended as the final argument.
pub fn parse_helper(
    content: &[u8],
    unescaped: bool,
    position: usize,
    block: Vec<u8>,
    children: Vec<Helper>,
    else_helper: Option<Helper>,
    functions: &FunctionMap,
) -> Helper {
    let Arguments { name, positional, named } = Arguments::parse(content);
    let mut helper = Helper::new(to_name(&name), unescaped, position, block, children, functions);
    helper.arguments = positional
        .iter()
        .chain(named.iter())
        .map(|argument| Helper::new(to_name(argument), unescaped, 0, Vec::new(), Vec::new(), functions))
        .collect();
    helper.arguments.extend(else_helper);
    helper
}
