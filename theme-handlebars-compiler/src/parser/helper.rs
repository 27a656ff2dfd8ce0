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

//! Compiled helper tree
//!
//! A template compiles to a single root [`Helper`] whose `children` are the tags
//! found at the top level of the file, in document order. Block helpers carry
//! their own body and children; an `{{else}}` branch travels as the trailing
//! argument of the block that owns it.
//!
//! Nodes are never mutated after the compile that produced them returns, so a
//! tree can be shared freely between render threads.

use std::{any::Any, collections::HashMap, fmt};

/// Name of the helper every unknown name resolves to
pub const NULL_HELPER: &str = "null";

/// A callable bound to a helper node at compile time
///
/// The renderer passes its own request state through `context`; helpers
/// downcast it to whatever concrete type they were written against.
pub trait HelperFunction: Send + Sync {
    fn call(&self, helper: &Helper, context: &dyn Any) -> Vec<u8>;
}

/// Lookup table from helper name to callable
pub type FunctionMap = HashMap<&'static str, &'static dyn HelperFunction>;

/// Fallback for names with no registered helper, renders nothing
struct Null {}

impl HelperFunction for Null {
    fn call(&self, _helper: &Helper, _context: &dyn Any) -> Vec<u8> {
        Vec::new()
    }
}

const NULL: Null = Null {};

/// Adds the built-in helpers to the function map
pub fn add_builtins(map: &mut FunctionMap) {
    map.insert(NULL_HELPER, &NULL);
}

/// A callable resolved from a [`FunctionMap`], remembering the key it was found under
#[derive(Clone, Copy)]
pub struct Function {
    name: &'static str,
    function: &'static dyn HelperFunction,
}

impl Function {
    /// Resolves `name`, falling back to the `null` helper
    pub fn resolve(map: &FunctionMap, name: &str) -> Self {
        match map.get_key_value(name) {
            Some((key, function)) => Self { name: *key, function: *function },
            None => match map.get(NULL_HELPER) {
                Some(function) => Self { name: NULL_HELPER, function: *function },
                None => Self { name: NULL_HELPER, function: &NULL },
            },
        }
    }

    /// The registered name this callable was found under
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn call(&self, helper: &Helper, context: &dyn Any) -> Vec<u8> {
        self.function.call(helper, context)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A node of the compiled template tree
#[derive(Debug, Clone, PartialEq)]
pub struct Helper {
    /// Helper name or literal/path expression
    pub name: String,
    /// Positional arguments, then `key=value` arguments, then the else branch
    pub arguments: Vec<Helper>,
    /// Set when the tag used `{{{ }}}`
    pub unescaped: bool,
    /// Byte offset into the parent's `block`
    pub position: usize,
    /// Literal text of the body with every tag excised
    pub block: Vec<u8>,
    pub children: Vec<Helper>,
    pub function: Function,
    pub(crate) body_helper: Option<usize>,
}

impl Helper {
    pub(crate) fn new(
        name: String,
        unescaped: bool,
        position: usize,
        block: Vec<u8>,
        children: Vec<Helper>,
        functions: &FunctionMap,
    ) -> Self {
        let function = Function::resolve(functions, &name);
        Self {
            name,
            arguments: Vec::new(),
            unescaped,
            position,
            block,
            children,
            function,
            body_helper: None,
        }
    }

    /// The `{{body}}` placeholder of a layout template, located at compile time
    pub fn body_helper(&self) -> Option<&Helper> {
        self.body_helper.and_then(|index| self.children.get(index))
    }

    /// The `{{else}}` branch of a block helper
    pub fn else_branch(&self) -> Option<&Helper> {
        self.arguments.last().filter(|argument| argument.name == "else")
    }

    /// Counts this node and every node below it
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Helper::node_count).sum::<usize>()
            + self.arguments.iter().map(Helper::node_count).sum::<usize>()
    }

    pub fn call(&self, context: &dyn Any) -> Vec<u8> {
        self.function.call(self, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shout {}

    impl HelperFunction for Shout {
        fn call(&self, helper: &Helper, _context: &dyn Any) -> Vec<u8> {
            helper.name.to_uppercase().into_bytes()
        }
    }

    const SHOUT: Shout = Shout {};

    fn make_map() -> FunctionMap {
        let mut map = FunctionMap::new();
        add_builtins(&mut map);
        map.insert("shout", &SHOUT);
        map
    }

    #[test]
    fn resolves_registered_name() {
        let map = make_map();
        let helper = Helper::new("shout".to_string(), false, 0, Vec::new(), Vec::new(), &map);
        assert_eq!(helper.function.name(), "shout");
        assert_eq!(helper.call(&()), b"SHOUT");
    }

    #[test]
    fn unknown_name_falls_back_to_null() {
        let map = make_map();
        let helper = Helper::new("@blog.title".to_string(), false, 0, Vec::new(), Vec::new(), &map);
        assert_eq!(helper.function.name(), NULL_HELPER);
        assert!(helper.call(&()).is_empty());
    }

    #[test]
    fn empty_map_still_has_fallback() {
        let helper = Helper::new("x".to_string(), false, 0, Vec::new(), Vec::new(), &FunctionMap::new());
        assert_eq!(helper.function.name(), NULL_HELPER);
    }

    #[test]
    fn else_branch_is_last_argument() {
        let map = make_map();
        let mut helper = Helper::new("if".to_string(), false, 0, b"yes".to_vec(), Vec::new(), &map);
        assert!(helper.else_branch().is_none());
        helper.arguments.push(Helper::new("else".to_string(), false, 3, b"no".to_vec(), Vec::new(), &map));
        assert_eq!(helper.else_branch().map(|h| h.block.as_slice()), Some(&b"no"[..]));
        assert_eq!(helper.node_count(), 2);
    }
}
