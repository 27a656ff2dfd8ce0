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

//! Handlebars block resolution
//!
//! Given a `{{#name ...}}` opener, this module finds the matching `{{/name}}`,
//! cuts the whole block out of the surrounding buffer and compiles its body.
//!
//! # Nesting
//!
//! Same-named blocks may nest. Every same-named opener that starts before the
//! closing tag currently under consideration pushes the search on to the next
//! closing tag. Tags inside `{{!-- --}}` comments are not counted:
//!
//! ```text
//! {{#if a}} {{#if b}} X {{/if}} {{else}} Y {{/if}}
//!           ^ opener  ^ skipped            ^ terminator
//! ```
//!
//! # Else branches
//!
//! An `{{else}}` found among the body's children splits the block in two. The
//! else node takes the text and children after it, with child positions made
//! relative to the else node, and rides along as the block's last argument.

use std::ops::Range;

use regex::bytes::Regex;
use tracing::trace;

use crate::parser::{
    compiler::Compiler,
    error::{ParseError, Result},
    expression::comment_spans,
    expression_tokenizer::parse_helper,
    helper::Helper,
};

/// Builds the closing and opening tag patterns for a block name
fn block_patterns(tag: &[u8]) -> Result<(Regex, Regex)> {
    let tag = regex::escape(&String::from_utf8_lossy(tag));
    let close = Regex::new(&[r"\{{2,3}\s*/", &tag, r"\s*\}{2,3}"].concat());
    let open = Regex::new(&[r"\{{2,3}\s*#", &tag, r"(?:\s[^}]*)?\}{2,3}"].concat());
    match (close, open) {
        (Ok(close), Ok(open)) => Ok((close, open)),
        (Err(err), _) | (_, Err(err)) => Err(ParseError::new(&err.to_string())),
    }
}

/// Locates the closing tag that terminates a block opened at the start of `tail`
fn find_close(tag: &[u8], tail: &[u8]) -> Result<Range<usize>> {
    let (close_pattern, open_pattern) = block_patterns(tag)?;
    let comments = comment_spans(tail);
    let live = |start: usize| !comments.iter().any(|span| span.contains(&start));
    let closes: Vec<Range<usize>> = close_pattern
        .find_iter(tail)
        .filter(|m| live(m.start()))
        .map(|m| m.range())
        .collect();
    let mut index = 0;
    for open in open_pattern.find_iter(tail).filter(|m| live(m.start())) {
        match closes.get(index) {
            Some(close) if open.start() < close.start => index += 1,
            Some(_) => break,
            None => return Err(ParseError::unbalanced(tag, tail)),
        }
    }
    trace!(tag = %String::from_utf8_lossy(tag), nested = index, "resolved block terminator");
    closes
        .get(index)
        .cloned()
        .ok_or_else(|| ParseError::unbalanced(tag, tail))
}

/// Moves everything from the first `{{else}}` child onwards into an else node
///
/// Only the first `{{else}}` splits. A later one stays behind as an ordinary
/// child of the else node, at a position relative to the else node's block.
fn split_else(block: &mut Vec<u8>, children: &mut Vec<Helper>) -> Option<Helper> {
    let index = children.iter().position(|child| child.name == "else")?;
    let mut rest = children.split_off(index);
    let mut else_helper = rest.remove(0);
    else_helper.block = block.split_off(else_helper.position.min(block.len()));
    for child in &mut rest {
        child.position = child.position.saturating_sub(else_helper.position);
    }
    else_helper.children = rest;
    Some(else_helper)
}

/// Resolves the block whose opener was removed from `data` at `start`
///
/// `content` is the opener's interior without the `#`. Returns `data` with the
/// whole block excised, and the compiled block helper.
pub(crate) fn resolve_block(
    compiler: &Compiler,
    data: &[u8],
    content: &[u8],
    unescaped: bool,
    start: usize,
) -> Result<(Vec<u8>, Helper)> {
    let tag = content
        .split(|c| c.is_ascii_whitespace())
        .find(|field| !field.is_empty())
        .ok_or_else(|| ParseError::new("empty block name"))?;
    let tail = &data[start..];
    let close = find_close(tag, tail)?;

    let mut remains = Vec::with_capacity(start + tail.len() - close.end);
    remains.extend_from_slice(&data[..start]);
    remains.extend_from_slice(&tail[close.end..]);

    let (mut block, mut children) = compiler.find_helpers(tail[..close.start].to_vec())?;
    let else_helper = split_else(&mut block, &mut children);
    let helper = parse_helper(
        content,
        unescaped,
        start,
        block,
        children,
        else_helper,
        compiler.functions(),
    );
    Ok((remains, helper))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_close() {
        assert_eq!(find_close(b"if", b"yes{{/if}} after").unwrap(), 3..10);
    }

    #[test]
    fn close_with_spaces_and_triple_braces() {
        assert_eq!(find_close(b"if", b"yes{{{ /if }}}").unwrap(), 3..14);
    }

    #[test]
    fn nested_same_name_is_skipped() {
        let tail = b"{{#if b}}X{{/if}}{{else}}Y{{/if}}";
        assert_eq!(find_close(b"if", tail).unwrap(), 26..33);
    }

    #[test]
    fn siblings_after_the_block_are_ignored() {
        let tail = b"A{{/if}} B {{#if y}}C{{/if}}";
        assert_eq!(find_close(b"if", tail).unwrap(), 1..8);
    }

    #[test]
    fn similar_names_do_not_nest() {
        let tail = b"{{#iffy}}{{/iffy}}X{{/if}}";
        assert_eq!(find_close(b"if", tail).unwrap(), 19..26);
    }

    #[test]
    fn missing_close_is_unbalanced() {
        let err = find_close(b"each", b"{{title}}").unwrap_err();
        assert!(err.to_string().starts_with("unbalanced block tag named each"));
    }

    #[test]
    fn more_openers_than_closers_is_unbalanced() {
        let err = find_close(b"if", b"{{#if b}}X{{/if}}").unwrap_err();
        assert!(err.to_string().starts_with("unbalanced block tag named if"));
    }

    #[test]
    fn commented_tags_are_ignored() {
        let tail = b"{{!-- {{/each}} --}}y{{/each}}";
        assert_eq!(find_close(b"each", tail).unwrap(), 21..30);

        let tail = b"{{!-- {{#if a}} --}}X{{/if}}";
        assert_eq!(find_close(b"if", tail).unwrap(), 21..28);
    }

    #[test]
    fn regex_characters_in_name() {
        assert_eq!(find_close(b"a.b", b"x{{/a.b}}").unwrap(), 1..9);
        assert!(find_close(b"a.b", b"x{{/axb}}").is_err());
    }
}
