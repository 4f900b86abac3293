//! Named parameter collection.
//!
//! Parameters are collected into an insertion-ordered map during rendering.
//! Names are generated from an alphabetic counter (`:a`, `:b`, … `:z`,
//! `:aa`, …) whose starting point is dialect-specific. Nested renders share
//! the parent's counter, so every name in the final statement is unique.

use indexmap::IndexMap;

use crate::value::Value;

/// Parameters keyed by placeholder name (`":a"` style), in render order.
pub type Params = IndexMap<String, Value>;

/// Mutable state threaded through one render pass.
#[derive(Debug)]
pub struct RenderCtx {
    next_name: String,
    params: Params,
}

impl RenderCtx {
    /// Creates a context whose first parameter name is `param_base`.
    #[must_use]
    pub fn new(param_base: &str) -> Self {
        Self {
            next_name: String::from(param_base),
            params: Params::new(),
        }
    }

    /// Registers a value and returns its placeholder, colon included.
    pub fn push_param(&mut self, value: Value) -> String {
        let name = format!(":{}", self.next_name);
        increment_name(&mut self.next_name);
        self.params.insert(name.clone(), value);
        name
    }

    /// Parameters collected so far.
    #[must_use]
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Consumes the context, yielding the collected parameters.
    #[must_use]
    pub fn into_params(self) -> Params {
        self.params
    }
}

/// Advances an alphabetic counter in place: `a` → `b`, `z` → `aa`,
/// `xxaaaz` → `xxaaba`.
fn increment_name(name: &mut String) {
    let mut bytes = name.clone().into_bytes();
    let mut i = bytes.len();
    loop {
        if i == 0 {
            bytes.insert(0, b'a');
            break;
        }
        i -= 1;
        if bytes[i] == b'z' {
            bytes[i] = b'a';
        } else {
            bytes[i] += 1;
            break;
        }
    }
    // counter bytes stay ASCII
    *name = String::from_utf8(bytes).unwrap_or_default();
}
