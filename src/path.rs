//! # Path Patterns and Join Keys
//!
//! Glob patterns select files from a commit; join inputs additionally derive a
//! key from each matched path. Both are implemented here on top of `regex`:
//! a glob is translated into an anchored regular expression once, and a key
//! template is parsed once into literal and group-reference parts.
//!
//! ## Glob grammar
//!
//! | Syntax      | Matches                                         |
//! |-------------|-------------------------------------------------|
//! | `?`         | one character other than `/`                    |
//! | `*`         | any run of characters other than `/`            |
//! | `**`        | any run of characters, `/` included             |
//! | `[ab]`      | one character from the class (`[!ab]` negates)  |
//! | `{a,b}`     | one of the alternatives                         |
//! | `(...)`     | the same as its content, captured by position   |
//! | `!(...)`    | wrapping the whole pattern: everything else     |
//! | `\x`        | the literal character `x`                       |
//!
//! A negated class never matches `/`, so like `?` and `*` it stays within one
//! path segment.
//!
//! Patterns are rooted: `*.txt` is read as `/*.txt`, and `{/a,b}` as
//! `/{a,b}`.
//!
//! ## Key templates
//!
//! A template such as `$2-$1` references capture groups by position. `$0` is
//! the whole path, `${N}` delimits a group number and `$$` is a literal `$`.

use std::iter::Peekable;

use crate::defaults::ROOT_PATH;
use crate::error::{Error, Result};
use regex::Regex;

/// Normalize a repository path to its rooted form.
///
/// Empty segments are dropped, a leading `/` is added and a trailing `/` is
/// removed, so `foo//bar/` becomes `/foo/bar`.
pub fn clean_path(path: &str) -> String {
    let mut cleaned = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        cleaned.push('/');
        cleaned.push_str(segment);
    }
    if cleaned.is_empty() {
        cleaned.push_str(ROOT_PATH);
    }
    cleaned
}

/// Match a path against a glob pattern
pub fn glob_match(pattern: &str, path: &str) -> Result<bool> {
    Ok(GlobPattern::new(pattern)?.matches(path))
}

/// Derive the join key of `path`.
///
/// Fails with `Error::PatternMismatch` if `pattern` does not match `path`, and
/// with `Error::KeyTemplate` if `template` references a group the pattern
/// does not capture.
pub fn capture_key(pattern: &GlobPattern, path: &str, template: &KeyTemplate) -> Result<String> {
    let groups = pattern.captures(path)?;
    template.expand(path, &groups)
}

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
    negated: bool,
}

impl GlobPattern {
    /// Compile a glob pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(Error::Pattern {
                pattern: pattern.to_string(),
                message: "pattern is empty".to_string(),
            });
        }

        let (body, negated) = match negated_body(trimmed) {
            Some(inner) => (inner, true),
            None => (trimmed, false),
        };
        let translated = translate(pattern, body)?;
        let regex = Regex::new(&format!("^{}$", translated)).map_err(|e| Error::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
            negated,
        })
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the pattern is of the form `!(...)`.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Number of positional capture groups. Negated patterns capture nothing.
    pub fn capture_count(&self) -> usize {
        if self.negated {
            0
        } else {
            self.regex.captures_len() - 1
        }
    }

    /// Whether `path` is selected by the pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path) != self.negated
    }

    /// The values of the capture groups for `path`, in group order.
    ///
    /// A group that did not participate in the match yields an empty string.
    pub fn captures(&self, path: &str) -> Result<Vec<String>> {
        let mismatch = || Error::PatternMismatch {
            pattern: self.source.clone(),
            path: path.to_string(),
        };

        if self.negated {
            return if self.matches(path) {
                Ok(Vec::new())
            } else {
                Err(mismatch())
            };
        }

        let captures = self.regex.captures(path).ok_or_else(mismatch)?;
        Ok(captures
            .iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect())
    }
}

impl std::fmt::Display for GlobPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Returns the inner pattern if the whole of `pattern` is `!(...)`.
fn negated_body(pattern: &str) -> Option<&str> {
    let inner = pattern.strip_prefix("!(")?.strip_suffix(')')?;
    let mut depth = 0usize;
    let mut escaped = false;
    for ch in inner.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    (depth == 0 && !escaped).then_some(inner)
}

fn translate(pattern: &str, body: &str) -> Result<String> {
    let err = |message: &str| Error::Pattern {
        pattern: pattern.to_string(),
        message: message.to_string(),
    };

    // The root is emitted once up front. A `/` written at the root, including
    // at the start of an alternative or group opened there, is that same root.
    let mut out = String::with_capacity(body.len() * 2);
    out.push('/');
    let mut at_root = true;

    let mut chars = body.chars().peekable();
    let mut groups = 0usize;
    let mut braces: Vec<bool> = Vec::new();
    while let Some(ch) = chars.next() {
        let was_root = at_root;
        at_root = false;
        match ch {
            '/' if was_root => at_root = true,
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push_str("[^/]"),
            '[' => translate_class(&mut chars, &mut out)
                .ok_or_else(|| err("unterminated character class"))?,
            '{' => {
                braces.push(was_root);
                at_root = was_root;
                out.push_str("(?:");
            }
            ',' if !braces.is_empty() => {
                at_root = braces.last().copied().unwrap_or(false);
                out.push('|');
            }
            '}' if !braces.is_empty() => {
                braces.pop();
                out.push(')');
            }
            '(' => {
                groups += 1;
                at_root = was_root;
                out.push('(');
            }
            ')' => {
                if groups == 0 {
                    return Err(err("unbalanced ')'"));
                }
                groups -= 1;
                out.push(')');
            }
            '!' if chars.peek() == Some(&'(') => {
                return Err(err("negation '!(...)' must wrap the whole pattern"));
            }
            '\\' => {
                let escaped = chars.next().ok_or_else(|| err("trailing escape"))?;
                push_literal(&mut out, escaped);
            }
            _ => push_literal(&mut out, ch),
        }
    }

    if groups > 0 {
        return Err(err("unbalanced '('"));
    }
    if !braces.is_empty() {
        return Err(err("unterminated '{'"));
    }
    Ok(out)
}

/// Copies a `[...]` class into `out`; the opening `[` is already consumed.
fn translate_class<I: Iterator<Item = char>>(
    chars: &mut Peekable<I>,
    out: &mut String,
) -> Option<()> {
    out.push('[');
    if matches!(chars.peek(), Some('!') | Some('^')) {
        chars.next();
        out.push_str("^/");
    }

    let mut first = true;
    loop {
        let ch = chars.next()?;
        match ch {
            ']' if !first => {
                out.push(']');
                return Some(());
            }
            '\\' => push_class_literal(out, chars.next()?),
            _ => push_class_literal(out, ch),
        }
        first = false;
    }
}

fn push_literal(out: &mut String, ch: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
}

fn push_class_literal(out: &mut String, ch: char) {
    if matches!(ch, '[' | ']' | '\\' | '^' | '&' | '~') {
        out.push('\\');
    }
    out.push(ch);
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplatePart {
    Literal(String),
    Group(usize),
}

/// A parsed join key template such as `$2$1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    source: String,
    parts: Vec<TemplatePart>,
}

impl KeyTemplate {
    /// Parse a template.
    pub fn parse(template: &str) -> Result<Self> {
        let err = |message: &str| Error::KeyTemplate {
            template: template.to_string(),
            message: message.to_string(),
        };

        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != '$' {
                literal.push(ch);
                continue;
            }

            let digits = match chars.peek().copied() {
                Some('$') => {
                    chars.next();
                    literal.push('$');
                    continue;
                }
                Some('{') => {
                    chars.next();
                    let mut digits = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(c) if c.is_ascii_digit() => digits.push(c),
                            Some(_) => {
                                return Err(err("only numeric groups are supported in '${...}'"))
                            }
                            None => return Err(err("unterminated '${'")),
                        }
                    }
                    digits
                }
                Some(c) if c.is_ascii_digit() => {
                    let mut digits = String::new();
                    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
                        digits.push(c);
                        chars.next();
                    }
                    digits
                }
                _ => {
                    literal.push('$');
                    continue;
                }
            };

            let index = digits
                .parse::<usize>()
                .map_err(|_| err("invalid group reference"))?;
            if !literal.is_empty() {
                parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
            }
            parts.push(TemplatePart::Group(index));
        }

        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            parts,
        })
    }

    /// The template as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Highest group number referenced, 0 if none.
    pub fn max_group(&self) -> usize {
        self.parts
            .iter()
            .filter_map(|part| match part {
                TemplatePart::Group(index) => Some(*index),
                TemplatePart::Literal(_) => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Fail if the template references a group `pattern` does not capture.
    pub fn check_groups(&self, pattern: &GlobPattern) -> Result<()> {
        let max = self.max_group();
        if max > pattern.capture_count() {
            return Err(Error::KeyTemplate {
                template: self.source.clone(),
                message: format!(
                    "references group ${} but pattern '{}' has {} capture group(s)",
                    max,
                    pattern.as_str(),
                    pattern.capture_count()
                ),
            });
        }
        Ok(())
    }

    /// Substitute `groups` (group 1 first) and `path` (group 0).
    pub fn expand(&self, path: &str, groups: &[String]) -> Result<String> {
        let mut key = String::new();
        for part in &self.parts {
            match part {
                TemplatePart::Literal(text) => key.push_str(text),
                TemplatePart::Group(0) => key.push_str(path),
                TemplatePart::Group(index) => {
                    let value = groups.get(index - 1).ok_or_else(|| Error::KeyTemplate {
                        template: self.source.clone(),
                        message: format!(
                            "group ${} not captured from '{}' ({} group(s))",
                            index,
                            path,
                            groups.len()
                        ),
                    })?;
                    key.push_str(value);
                }
            }
        }
        Ok(key)
    }
}
