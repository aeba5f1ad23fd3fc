//! Route template compilation.
//!
//! A template such as `/user/{profileID}` is turned into an anchored regex
//! `^/user/(?P<profileID>[^/#?]+)/?$`. Everything outside a `{name}`
//! placeholder is copied verbatim, so templates may carry regex syntax of
//! their own (`/profile(.htm[l]?)?`). Braces that do not wrap an identifier,
//! like the quantifier in `a{2}`, are left for the regex engine.

use super::{ParamVec, RouteError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

#[allow(clippy::expect_used)]
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
});

/// Characters a single path parameter may not contain.
const PARAM_CLASS: &str = "[^/#?]+";

/// Anchored matcher compiled from a route template.
///
/// Immutable once compiled. Two patterns are considered the same route when
/// their [`as_str`](Self::as_str) sources are identical.
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl PathPattern {
    /// Compile `template` into an anchored pattern.
    ///
    /// Trailing slashes on the template are dropped and replaced by an
    /// optional `/`, so `/users` and `/users/` both match either form. The
    /// root template `/` therefore compiles to `^/?$`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] when the resulting expression
    /// does not compile (unbalanced groups, duplicate placeholder names, ...).
    pub fn compile(template: &str) -> Result<Self, RouteError> {
        let body = template.trim_end_matches('/');
        let mut source = String::with_capacity(body.len() + 8);
        let mut param_names = Vec::new();
        let mut last = 0;

        source.push('^');
        for caps in PLACEHOLDER.captures_iter(body) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            source.push_str(&body[last..whole.start()]);
            source.push_str("(?P<");
            source.push_str(name.as_str());
            source.push('>');
            source.push_str(PARAM_CLASS);
            source.push(')');
            param_names.push(Arc::from(name.as_str()));
            last = whole.end();
        }
        source.push_str(&body[last..]);
        source.push_str("/?$");

        let regex = Regex::new(&source).map_err(|e| RouteError::InvalidPattern {
            template: template.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { regex, param_names })
    }

    /// Source of the compiled expression, e.g. `^/user/profile/?$`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Placeholder names in declaration order.
    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    /// Whole-path match without capture extraction.
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Match `path` and collect named captures.
    ///
    /// `None` means the path does not match. `Some(None)` is a match on a
    /// pattern without placeholders; `Some(Some(params))` carries one entry
    /// per placeholder in declaration order.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<Option<ParamVec>> {
        let caps = self.regex.captures(path)?;
        if self.param_names.is_empty() {
            return Some(None);
        }

        let params = self
            .param_names
            .iter()
            .filter_map(|name| {
                caps.name(name)
                    .map(|m| (Arc::clone(name), m.as_str().to_string()))
            })
            .collect();
        Some(Some(params))
    }
}
