//! The regex capability: a thin wrapper over the workspace's `regex`
//! crate. Translates sed's BRE/ERE surface syntax into the crate's
//! native (ERE/PCRE-flavored) syntax and implements sed's own
//! replacement-template rules rather than the crate's `$N` expansion.
//!
//! Grounded in `go-sed`'s `sStmt.Run` (`ast.go`): non-global
//! substitution selects the Nth match via `FindAllStringIndex` and
//! splices the replacement into the surrounding text; global
//! substitution calls `ReplaceAllString`. This module reimplements
//! both on top of `regex::Regex::captures_iter`, which already gives
//! non-overlapping, empty-match-aware matches together with capture
//! groups in a single pass.

use regex::Regex;

use crate::error::{Result, SedError};

#[derive(Debug, Clone)]
pub struct CompiledRegex {
    pub(crate) source: String,
    pub(crate) inner: Regex,
}

impl CompiledRegex {
    /// Compiles `pattern`, translating BRE metacharacter escaping to
    /// the crate's native convention unless `extended` is set (ERE
    /// mode, already in the crate's native dialect).
    pub fn compile(pattern: &str, extended: bool) -> Result<Self> {
        let resolved = translate_escapes(pattern);
        let native = if extended {
            resolved
        } else {
            translate_bre_to_native(&resolved)
        };
        let inner = Regex::new(&native).map_err(|source| SedError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            source: pattern.to_string(),
            inner,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.inner.is_match(text)
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

// `CompiledRegex` is used as an `Address`/`Command` field inside a
// `Program` that we want to treat as value-like; `regex::Regex`
// itself has no `PartialEq`, so neither does this wrapper. Programs
// are compared by running them, not by structural equality.

/// Applies the delimiter-independent escape pass described in the
/// lexer's delimiter escape rule, a second time, on behalf of the
/// regex compiler: `\\` collapses to `\`, `\n` collapses to a literal
/// newline, any other `\x` is passed through unchanged so the regex
/// engine can interpret it (backreferences, bracket classes, `\d`,
/// etc.).
fn translate_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek().copied() {
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                }
                Some(other) => {
                    chars.next();
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Inverts BRE's escaping convention for grouping/counting/
/// alternation metacharacters into the `regex` crate's native
/// (ERE-like) convention: unescaped `( ) { } | + ?` are literal in
/// BRE and become escaped; escaped `\( \) \{ \} \| \+ \?` are
/// metacharacters in BRE and become unescaped. `[...]` bracket
/// expressions are passed through untouched (the `regex` crate
/// already supports POSIX character classes like `[[:alpha:]]`
/// natively), and their contents are never reinterpreted.
fn translate_bre_to_native(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len());
    let mut i = 0;
    let mut in_bracket = false;
    while i < chars.len() {
        let c = chars[i];
        if in_bracket {
            out.push(c);
            if c == ']' {
                in_bracket = false;
            }
            i += 1;
            continue;
        }
        match c {
            '[' => {
                in_bracket = true;
                out.push(c);
                i += 1;
                // `[]...]` and `[^]...]`: a `]` right after `[` or
                // `[^` is a literal member, not the closer.
                if chars.get(i) == Some(&'^') {
                    out.push('^');
                    i += 1;
                }
                if chars.get(i) == Some(&']') {
                    out.push(']');
                    i += 1;
                }
            }
            '\\' => {
                if let Some(&next) = chars.get(i + 1) {
                    match next {
                        '(' | ')' | '{' | '}' | '|' | '+' | '?' => {
                            out.push(next); // escaped metachar -> bare metachar
                        }
                        _ => {
                            out.push('\\');
                            out.push(next);
                        }
                    }
                    i += 2;
                    continue;
                } else {
                    out.push('\\');
                    i += 1;
                }
            }
            '(' | ')' | '{' | '}' | '|' | '+' | '?' => {
                out.push('\\');
                out.push(c);
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Expands a sed replacement template against one match's captures:
/// `&` is the whole match, `\&` and `\\` are literal, `\N` is capture
/// group N, any other character is literal.
pub fn expand_template(template: &str, caps: &regex::Captures) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '&' => out.push_str(caps.get(0).map(|m| m.as_str()).unwrap_or("")),
            '\\' => match chars.next() {
                Some(d) if d.is_ascii_digit() => {
                    let idx = d.to_digit(10).unwrap() as usize;
                    if let Some(m) = caps.get(idx) {
                        out.push_str(m.as_str());
                    }
                }
                Some('&') => out.push('&'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            other => out.push(other),
        }
    }
    out
}

/// Runs the `s` command's substitution over `text`, returning the new
/// text and whether any replacement occurred.
pub fn substitute(re: &CompiledRegex, text: &str, template: &str, nth: Option<usize>, global: bool) -> (String, bool) {
    if global {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        let mut replaced = false;
        for caps in re.inner.captures_iter(text) {
            let m = caps.get(0).unwrap();
            out.push_str(&text[last..m.start()]);
            out.push_str(&expand_template(template, &caps));
            last = m.end();
            replaced = true;
        }
        out.push_str(&text[last..]);
        (out, replaced)
    } else {
        let target = nth.unwrap_or(1).max(1);
        let mut count = 0;
        for caps in re.inner.captures_iter(text) {
            count += 1;
            if count == target {
                let m = caps.get(0).unwrap();
                let mut out = String::with_capacity(text.len());
                out.push_str(&text[..m.start()]);
                out.push_str(&expand_template(template, &caps));
                out.push_str(&text[m.end()..]);
                return (out, true);
            }
        }
        (text.to_string(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bre_groups_require_escaping() {
        // in BRE, unescaped ( ) are literal, \( \) are grouping.
        let re = CompiledRegex::compile(r"\(a\)\(b\)", false).unwrap();
        assert!(re.is_match("ab"));
        let re2 = CompiledRegex::compile(r"(a)", false).unwrap();
        assert!(re2.is_match("(a)"));
        assert!(!re2.is_match("a"));
    }

    #[test]
    fn ere_groups_native() {
        let re = CompiledRegex::compile(r"(a)(b)", true).unwrap();
        assert!(re.is_match("ab"));
    }

    #[test]
    fn bracket_expressions_untouched() {
        let re = CompiledRegex::compile(r"[(){}]", false).unwrap();
        assert!(re.is_match("("));
        assert!(re.is_match(")"));
    }

    #[test]
    fn substitute_global() {
        let re = CompiledRegex::compile("a", false).unwrap();
        let (out, replaced) = substitute(&re, "aaaaa", "b", None, true);
        assert_eq!(out, "bbbbb");
        assert!(replaced);
    }

    #[test]
    fn substitute_nth() {
        let re = CompiledRegex::compile("a", false).unwrap();
        let (out, replaced) = substitute(&re, "aaaaa", "b", Some(2), false);
        assert_eq!(out, "abaaa");
        assert!(replaced);
    }

    #[test]
    fn template_ampersand_and_escapes() {
        let re = CompiledRegex::compile(r"\(a\)b", false).unwrap();
        let caps = re.inner.captures("ab").unwrap();
        assert_eq!(expand_template(r"[\1] \& &", &caps), "[a] & ab");
    }
}
