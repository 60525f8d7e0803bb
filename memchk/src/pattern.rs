//! Line templates with `{name}` slots, compiled to anchored regular expressions.
//!
//! A template is literal text with slots in braces, e.g.
//! `##### [{_}] (frame_free) f={addr} is freed.`
//! Exactly one slot must be named `addr`; its text is captured. Every other slot is a
//! wildcard that matches at least one character and is discarded. `{{` and `}}` stand
//! for literal braces.

use regex::Regex;

use crate::Error;

/// The name of the slot whose text is captured.
pub const ADDR_SLOT: &str = "addr";

/// A compiled line template.
///
/// A line either matches the whole template or it does not match at all.
#[derive(Debug, Clone)]
pub struct LinePattern {
    template: String,
    regex: Regex,
}

impl LinePattern {
    /// Compile a template.
    ///
    /// Fails if a brace is unbalanced, a slot is empty, or the template does not have
    /// exactly one `{addr}` slot.
    pub fn new(template: &str) -> Result<Self, Error> {
        let regex = Regex::new(&template_to_regex(template)?)?;
        Ok(Self {
            template: template.to_string(),
            regex,
        })
    }

    /// The template this pattern was compiled from
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Match `line` against the whole template and return the `addr` token.
    ///
    /// A trailing line terminator is not part of the matched text.
    #[must_use]
    pub fn capture<'a>(&self, line: &'a str) -> Option<&'a str> {
        let line = line.trim_end_matches(['\n', '\r']);
        self.regex
            .captures(line)
            .and_then(|caps| caps.name(ADDR_SLOT))
            .map(|m| m.as_str())
    }

    /// Returns `true` if `line` matches the whole template
    #[must_use]
    pub fn is_match(&self, line: &str) -> bool {
        self.capture(line).is_some()
    }
}

fn template_to_regex(template: &str) -> Result<String, Error> {
    let mut expr = String::from("^");
    let mut literal = String::new();
    let mut addr_slots = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(Error::illegal_argument(format!(
                                "Unclosed slot in template `{template}`"
                            )))
                        }
                    }
                }
                if name.is_empty() {
                    return Err(Error::illegal_argument(format!(
                        "Empty slot in template `{template}`"
                    )));
                }
                expr.push_str(&regex::escape(&literal));
                literal.clear();
                if name == ADDR_SLOT {
                    addr_slots += 1;
                    expr.push_str("(?P<addr>.+?)");
                } else {
                    expr.push_str(".+?");
                }
            }
            '}' => {
                return Err(Error::illegal_argument(format!(
                    "Unmatched `}}` in template `{template}`"
                )))
            }
            c => literal.push(c),
        }
    }
    expr.push_str(&regex::escape(&literal));
    expr.push('$');

    if addr_slots != 1 {
        return Err(Error::illegal_argument(format!(
            "Template `{template}` must have exactly one {{{ADDR_SLOT}}} slot, found {addr_slots}"
        )));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::LinePattern;

    const FRAME_ALLOC: &str = "##### [{_}] (frame_alloc) f={addr} is malloced. f->kpage={_}";

    #[test]
    fn captures_addr_and_discards_wildcards() {
        let pattern = LinePattern::new(FRAME_ALLOC).unwrap();
        assert_eq!(
            pattern.capture("##### [1] (frame_alloc) f=0xAA is malloced. f->kpage=0xBB"),
            Some("0xAA")
        );
    }

    #[test]
    fn whole_line_must_match() {
        let pattern = LinePattern::new("##### [{_}] (frame_free) f={addr} is freed.").unwrap();
        assert!(pattern.is_match("##### [3] (frame_free) f=0xc0ffee is freed."));
        assert!(!pattern.is_match("##### [3] (frame_free) f=0xc0ffee is freed. later"));
        assert!(!pattern.is_match("xx ##### [3] (frame_free) f=0xc0ffee is freed."));
        assert!(!pattern.is_match("##### [3] (frame_free) f=0xc0ffee is"));
    }

    #[test]
    fn wildcards_need_at_least_one_char() {
        let pattern = LinePattern::new("##### [{_}] (frame_free) f={addr} is freed.").unwrap();
        assert!(!pattern.is_match("##### [] (frame_free) f=0x1 is freed."));
        assert!(!pattern.is_match("##### [1] (frame_free) f= is freed."));
    }

    #[test]
    fn repeated_wildcards_are_independent() {
        let pattern = LinePattern::new(
            "##### [{_}] (page_make_entry) p={addr} is malloced to load upage={_}. spt size is {_}",
        )
        .unwrap();
        assert_eq!(
            pattern.capture(
                "##### [7] (page_make_entry) p=0x10 is malloced to load upage=0x8048000. spt size is 3"
            ),
            Some("0x10")
        );
    }

    #[test]
    fn trailing_line_terminator_is_ignored() {
        let pattern = LinePattern::new("##### [{_}] (frame_free) f={addr} is freed.").unwrap();
        assert_eq!(
            pattern.capture("##### [3] (frame_free) f=0x1 is freed.\r\n"),
            Some("0x1")
        );
    }

    #[test]
    fn literal_text_is_not_a_regex() {
        let pattern = LinePattern::new("a.b {addr} (x)").unwrap();
        assert!(pattern.is_match("a.b tok (x)"));
        assert!(!pattern.is_match("aXb tok (x)"));
    }

    #[test]
    fn doubled_braces_are_literal() {
        let pattern = LinePattern::new("{{{addr}}}").unwrap();
        assert_eq!(pattern.capture("{0x1}"), Some("0x1"));
    }

    #[test]
    fn rejects_bad_templates() {
        assert!(LinePattern::new("no slots here").is_err());
        assert!(LinePattern::new("{addr} and {addr}").is_err());
        assert!(LinePattern::new("f={addr").is_err());
        assert!(LinePattern::new("f={addr} {}").is_err());
        assert!(LinePattern::new("f={addr} }").is_err());
    }
}
