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

//! Handlebars template compiler
//!
//! This module turns a template file into a tree of [`Helper`] nodes. The
//! compiler repeatedly scans the buffer for its first tag, cuts the tag out,
//! and turns it into a node:
//!
//! - comments are dropped
//! - block openers are resolved together with their body and closing tag
//! - a closing tag with no opener is an error
//! - everything else goes through the argument parser
//!
//! Every pass removes at least one tag, so the buffer shrinks until no tag is
//! left. What remains is the literal text of the template and becomes the
//! root's `block`.
//!
//! # Examples
//!
//! ```rust
//! use theme_handlebars_compiler::{add_builtins, Compiler, FunctionMap};
//!
//! let mut functions = FunctionMap::new();
//! add_builtins(&mut functions);
//!
//! let compiler = Compiler::new(functions);
//! let root = compiler.compile(b"<h1>{{title}}</h1>", "index").unwrap();
//! assert_eq!(root.name, "index");
//! assert_eq!(root.block, b"<h1></h1>");
//! assert_eq!(root.children[0].name, "title");
//! assert_eq!(root.children[0].position, 4);
//! ```

use tracing::debug;

use crate::parser::{
    block::resolve_block,
    error::{ParseError, Result},
    expression::{Expression, ExpressionType},
    expression_tokenizer::parse_helper,
    helper::{FunctionMap, Helper, NULL_HELPER, add_builtins},
};

/// Compiles template sources against a fixed function map
pub struct Compiler {
    functions: FunctionMap,
}

impl Compiler {
    /// Creates a compiler; the `null` fallback is added if `functions` lacks it
    pub fn new(mut functions: FunctionMap) -> Self {
        if !functions.contains_key(NULL_HELPER) {
            add_builtins(&mut functions);
        }
        Self { functions }
    }

    pub fn functions(&self) -> &FunctionMap {
        &self.functions
    }

    /// Scans `data` until no tag is left
    ///
    /// Returns the literal text that remains and the nodes found, in document order.
    pub(crate) fn find_helpers(&self, mut data: Vec<u8>) -> Result<(Vec<u8>, Vec<Helper>)> {
        let mut helpers = Vec::new();
        loop {
            let (remains, helper) = match Expression::from(&data) {
                None => return Ok((data, helpers)),
                Some(expr) => match expr.expression_type {
                    ExpressionType::Comment => (expr.excise(), None),
                    ExpressionType::Close => return Err(ParseError::unbalanced(expr.content, expr.postfix)),
                    ExpressionType::Open => {
                        let (remains, helper) =
                            resolve_block(self, &expr.excise(), expr.content, expr.unescaped, expr.position())?;
                        (remains, Some(helper))
                    }
                    ExpressionType::Helper => {
                        let helper = parse_helper(
                            expr.content,
                            expr.unescaped,
                            expr.position(),
                            Vec::new(),
                            Vec::new(),
                            None,
                            &self.functions,
                        );
                        (expr.excise(), Some(helper))
                    }
                },
            };
            data = remains;
            helpers.extend(helper);
        }
    }

    /// Compiles one template into its root node
    pub fn compile(&self, data: &[u8], name: &str) -> Result<Helper> {
        let (block, children) = self.find_helpers(data.to_vec())?;
        let mut root = Helper::new(name.to_string(), false, 0, block, children, &self.functions);
        root.body_helper = root.children.iter().rposition(|child| child.name == "body");
        debug!(template = name, children = root.children.len(), "compiled template");
        Ok(root)
    }
}
