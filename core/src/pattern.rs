//! Route template compilation.
//!
//! A template is an absolute path in which segments may be named placeholders, written
//! either `:name` or `{name}`. One template uses one notation. Compiling yields the ordered
//! parameter names and a matcher that tests a concrete request path and captures the
//! segment text bound to each parameter. Templates without placeholders match by string
//! equality.
//!
//! ```
//! use route_bind_core::PathPattern;
//!
//! let pattern = PathPattern::compile("/users/:id/posts/:post").unwrap();
//! let captures = pattern.captures("/users/42/posts/7").unwrap();
//! assert_eq!(captures.get("id"), Some("42"));
//! assert_eq!(pattern.to_brace_notation(), "/users/{id}/posts/{post}");
//! ```

use crate::error::PatternError;
use regex::Regex;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;

/// Placeholder notation used by a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    /// No placeholders.
    Plain,
    /// `:name`
    Colon,
    /// `{name}`
    Brace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact,
    Expression(Regex),
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    segments: Vec<Segment>,
    params: Vec<String>,
    notation: Notation,
    matcher: Matcher,
}

/// Parameter values captured from one request path, in template order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCaptures<'a> {
    values: SmallVec<[(&'a str, &'a str); 4]>,
}

impl<'a> PathCaptures<'a> {
    /// Raw (still percent-encoded) text captured for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.values
            .iter()
            .find(|(param, _)| *param == name)
            .map(|(_, value)| *value)
    }

    /// Iterate `(name, value)` pairs in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.values.iter().copied()
    }

    /// Number of captured parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn malformed(template: &str, reason: impl Into<String>) -> PatternError {
    PatternError::Malformed {
        template: template.to_string(),
        reason: reason.into(),
    }
}

const fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

const fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(template: &str) -> Result<(Vec<Segment>, Notation), PatternError> {
    if !template.starts_with('/') {
        return Err(malformed(template, "template must start with '/'"));
    }
    if template.contains(['?', '#']) {
        return Err(malformed(template, "template must not carry a query or fragment"));
    }
    if template.chars().any(char::is_control) {
        return Err(malformed(template, "template contains control characters"));
    }

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut notation = Notation::Plain;
    let mut chars = template.chars().peekable();

    let mut switch = |next: Notation| -> Result<(), PatternError> {
        let current = notation;
        match current {
            Notation::Plain => {
                notation = next;
                Ok(())
            }
            _ if current == next => Ok(()),
            _ => Err(PatternError::MixedNotation {
                template: template.to_string(),
            }),
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                switch(Notation::Brace)?;
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') => return Err(malformed(template, "nested '{'")),
                        Some('/') | None => return Err(malformed(template, "unclosed '{'")),
                        Some(other) => name.push(other),
                    }
                }
                if name.is_empty() {
                    return Err(malformed(template, "empty placeholder '{}'"));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Param(name));
            }
            '}' => return Err(malformed(template, "unbalanced '}'")),
            ':' if chars.peek().copied().is_some_and(is_ident_start) => {
                switch(Notation::Colon)?;
                let mut name = String::new();
                while let Some(next) = chars.next_if(|n| is_ident_char(*n)) {
                    name.push(next);
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Param(name));
            }
            other => literal.push(other),
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok((segments, notation))
}

impl PathPattern {
    /// Compile a route template.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] when the template is malformed, mixes notations, repeats a
    /// parameter name or yields an expression the regex engine rejects.
    pub fn compile(template: &str) -> Result<Self, PatternError> {
        let (segments, notation) = tokenize(template)?;

        let mut seen = HashSet::new();
        let mut params = Vec::new();
        for segment in &segments {
            if let Segment::Param(name) = segment {
                if !seen.insert(name.as_str()) {
                    return Err(PatternError::DuplicateParameter {
                        template: template.to_string(),
                        name: name.clone(),
                    });
                }
                params.push(name.clone());
            }
        }

        let matcher = if params.is_empty() {
            Matcher::Exact
        } else {
            let mut expression = String::from("^");
            for segment in &segments {
                match segment {
                    Segment::Literal(text) => expression.push_str(&regex::escape(text)),
                    Segment::Param(_) => expression.push_str("([^/]+)"),
                }
            }
            expression.push('$');
            let regex = Regex::new(&expression).map_err(|e| PatternError::Compile {
                template: template.to_string(),
                reason: e.to_string(),
            })?;
            Matcher::Expression(regex)
        };

        Ok(Self {
            template: template.to_string(),
            segments,
            params,
            notation,
            matcher,
        })
    }

    /// The template this pattern was compiled from.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Parameter names in template order.
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Whether the template declares any parameter.
    #[must_use]
    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    /// Notation the template was written in.
    #[must_use]
    pub const fn notation(&self) -> Notation {
        self.notation
    }

    /// Anchored match expression, or `None` for plain templates.
    #[must_use]
    pub fn expression(&self) -> Option<&str> {
        match &self.matcher {
            Matcher::Exact => None,
            Matcher::Expression(regex) => Some(regex.as_str()),
        }
    }

    /// Whether `path` matches the template.
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        match &self.matcher {
            Matcher::Exact => path == self.template,
            Matcher::Expression(regex) => regex.is_match(path),
        }
    }

    /// Capture the parameter values of `path`, or `None` if it does not match.
    #[must_use]
    pub fn captures<'a>(&'a self, path: &'a str) -> Option<PathCaptures<'a>> {
        match &self.matcher {
            Matcher::Exact => (path == self.template).then(|| PathCaptures {
                values: SmallVec::new(),
            }),
            Matcher::Expression(regex) => {
                let caps = regex.captures(path)?;
                let values = self
                    .params
                    .iter()
                    .enumerate()
                    .filter_map(|(i, name)| caps.get(i + 1).map(|m| (name.as_str(), m.as_str())))
                    .collect();
                Some(PathCaptures { values })
            }
        }
    }

    fn render(&self, open: &str, close: &str) -> String {
        self.segments
            .iter()
            .fold(String::with_capacity(self.template.len()), |mut out, segment| {
                match segment {
                    Segment::Literal(text) => out.push_str(text),
                    Segment::Param(name) => {
                        out.push_str(open);
                        out.push_str(name);
                        out.push_str(close);
                    }
                }
                out
            })
    }

    /// The template rewritten with `:name` placeholders.
    #[must_use]
    pub fn to_colon_notation(&self) -> String {
        self.render(":", "")
    }

    /// The template rewritten with `{name}` placeholders.
    #[must_use]
    pub fn to_brace_notation(&self) -> String {
        self.render("{", "}")
    }

    /// The template as a router with whole-segment `:name` parameters sees it.
    ///
    /// Every `/`-separated segment that holds a placeholder, a literal `:` or a `*` becomes a
    /// positional placeholder (`:p0`, `:p1`, ...). Templates that differ only in parameter
    /// names share a shape, and a template's shape matches every path the template matches.
    #[must_use]
    pub fn route_shape(&self) -> String {
        let mut pieces: Vec<(String, bool)> = vec![(String::new(), false)];
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    let mut parts = text.split('/');
                    if let (Some(first), Some(last)) = (parts.next(), pieces.last_mut()) {
                        last.0.push_str(first);
                    }
                    pieces.extend(parts.map(|part| (part.to_string(), false)));
                }
                Segment::Param(_) => {
                    if let Some(last) = pieces.last_mut() {
                        last.1 = true;
                    }
                }
            }
        }

        let mut position = 0;
        let shaped: Vec<String> = pieces
            .into_iter()
            .map(|(text, dynamic)| {
                if dynamic || text.contains([':', '*']) {
                    position += 1;
                    format!(":p{}", position - 1)
                } else {
                    text
                }
            })
            .collect();
        shaped.join("/")
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.template == other.template
            && self.params == other.params
            && self.notation == other.notation
            && self.expression() == other.expression()
    }
}

impl Eq for PathPattern {}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code
mod tests {
    use super::*;

    #[test]
    fn test_plain_template_matches_exactly() {
        let pattern = PathPattern::compile("/ping").expect("valid");
        assert!(!pattern.has_params());
        assert_eq!(pattern.notation(), Notation::Plain);
        assert_eq!(pattern.expression(), None);
        assert!(pattern.is_match("/ping"));
        assert!(!pattern.is_match("/ping/"));
        assert!(pattern.captures("/ping").is_some_and(|c| c.is_empty()));
    }

    #[test]
    fn test_colon_notation() {
        let pattern = PathPattern::compile("/users/:id/posts/:post_id").expect("valid");
        assert_eq!(pattern.params(), ["id".to_string(), "post_id".to_string()]);
        assert_eq!(pattern.notation(), Notation::Colon);

        let captures = pattern.captures("/users/42/posts/abc").expect("matches");
        assert_eq!(captures.get("id"), Some("42"));
        assert_eq!(captures.get("post_id"), Some("abc"));
        assert_eq!(captures.len(), 2);
    }

    #[test]
    fn test_brace_notation() {
        let pattern = PathPattern::compile("/files/{name}").expect("valid");
        assert_eq!(pattern.notation(), Notation::Brace);
        assert_eq!(
            pattern.captures("/files/a%20b").and_then(|c| c.get("name")),
            Some("a%20b")
        );
        assert!(!pattern.is_match("/files/a/b"));
        assert!(!pattern.is_match("/files/"));
    }

    #[test]
    fn test_literals_are_escaped() {
        let pattern = PathPattern::compile("/v1.0/:id").expect("valid");
        assert!(pattern.is_match("/v1.0/3"));
        assert!(!pattern.is_match("/v1x0/3"));
    }

    #[test]
    fn test_route_shape() {
        let shape = |t: &str| PathPattern::compile(t).expect("valid").route_shape();
        assert_eq!(shape("/"), "/");
        assert_eq!(shape("/health"), "/health");
        assert_eq!(shape("/users/{id}"), "/users/:p0");
        assert_eq!(shape("/users/:user_id"), "/users/:p0");
        assert_eq!(shape("/users/{id}/posts/{post}/"), "/users/:p0/posts/:p1/");
        assert_eq!(shape("/files/{name}.txt"), "/files/:p0");
        assert_eq!(shape("/at/12:30"), "/at/:p0");
        assert_eq!(shape("/v1.0/:id"), "/v1.0/:p0");
    }

    #[test]
    fn test_colon_without_identifier_is_literal() {
        let pattern = PathPattern::compile("/at/12:30").expect("valid");
        assert!(!pattern.has_params());
        assert!(pattern.is_match("/at/12:30"));
    }

    #[test]
    fn test_mixed_notation_rejected() {
        assert_eq!(
            PathPattern::compile("/a/:x/{y}"),
            Err(PatternError::MixedNotation {
                template: "/a/:x/{y}".to_string()
            })
        );
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        assert!(matches!(
            PathPattern::compile("/a/:id/b/:id"),
            Err(PatternError::DuplicateParameter { name, .. }) if name == "id"
        ));
    }

    #[test]
    fn test_malformed_templates() {
        for template in ["", "users", "/a/{id", "/a/{}", "/a/id}", "/a/{{id}}", "/a?x=1", "/a#f"] {
            assert!(
                matches!(PathPattern::compile(template), Err(PatternError::Malformed { .. })),
                "{template:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_notation_conversion() {
        let pattern = PathPattern::compile("/users/{id}/posts/{post}").expect("valid");
        assert_eq!(pattern.to_colon_notation(), "/users/:id/posts/:post");
        assert_eq!(pattern.to_brace_notation(), "/users/{id}/posts/{post}");
    }

    #[test]
    fn test_compilation_is_deterministic() {
        let first = PathPattern::compile("/a/:x/b/:y").expect("valid");
        let second = PathPattern::compile("/a/:x/b/:y").expect("valid");
        assert_eq!(first, second);
        assert_eq!(first.expression(), Some("^/a/([^/]+)/b/([^/]+)$"));
    }
}
