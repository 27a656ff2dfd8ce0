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

//! Error handling for the template compiler
//!
//! Malformed tag syntax degrades to a best-effort parse, so the only errors
//! the compiler raises come from block tags that cannot be paired up.

/// Error type for template compile failures
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub(crate) message: String,
}

/// Returns the first 32 characters of a buffer for error context
pub(crate) fn lcap(src: &[u8]) -> String {
    static CAP_AT: usize = 32;

    let src = if src.len() > CAP_AT { &src[..CAP_AT] } else { src };
    String::from_utf8_lossy(src).into_owned()
}

impl ParseError {
    pub(crate) fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// Creates an error for a block whose closing tag cannot be found
    pub(crate) fn unbalanced(tag: &[u8], rest: &[u8]) -> Self {
        Self {
            message: format!(
                "unbalanced block tag named {} near \"{}\"",
                String::from_utf8_lossy(tag),
                lcap(rest)
            ),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for template compile operations
pub type Result<T> = std::result::Result<T, ParseError>;
