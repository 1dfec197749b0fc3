//! Output filename templates.
//!
//! A template is literal text with `{key}` placeholders. Doubled braces are
//! literal braces:
//!
//! ```text
//! {name}_{profile}      dawn.jpg, profile "web"  →  dawn_web
//! {profile}/{name}                               →  web/dawn
//! {{{name}}}                                     →  {dawn}
//! ```
//!
//! The extension is appended by the caller.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown key {key:?} at offset {offset}")]
    UnknownKey { key: String, offset: usize },
    #[error("unclosed '{{' at offset {0}")]
    Unclosed(usize),
    #[error("unmatched '}}' at offset {0}")]
    Unmatched(usize),
    #[error("empty placeholder at offset {0}")]
    EmptyKey(usize),
}

#[derive(Debug, PartialEq)]
enum Piece<'a> {
    Literal(&'a str),
    Brace(char),
    Key(&'a str, usize),
}

fn parse(template: &str) -> Result<Vec<Piece<'_>>, TemplateError> {
    let mut pieces = Vec::new();
    let mut literal_start = 0;
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' | '}' => {
                if literal_start < i {
                    pieces.push(Piece::Literal(&template[literal_start..i]));
                }
                if chars.peek().map(|&(_, next)| next) == Some(c) {
                    chars.next();
                    pieces.push(Piece::Brace(c));
                    literal_start = i + 2;
                    continue;
                }
                if c == '}' {
                    return Err(TemplateError::Unmatched(i));
                }
                let rest = &template[i + 1..];
                let end = rest.find('}').ok_or(TemplateError::Unclosed(i))?;
                let key = &rest[..end];
                if key.contains('{') {
                    return Err(TemplateError::Unclosed(i));
                }
                if key.trim().is_empty() {
                    return Err(TemplateError::EmptyKey(i));
                }
                pieces.push(Piece::Key(key.trim(), i));
                // skip the key and the closing brace
                for _ in 0..key.chars().count() + 1 {
                    chars.next();
                }
                literal_start = i + 1 + end + 1;
            }
            _ => {}
        }
    }
    if literal_start < template.len() {
        pieces.push(Piece::Literal(&template[literal_start..]));
    }
    Ok(pieces)
}

/// Check that `template` is well formed and only uses `keys`.
pub fn validate(template: &str, keys: &[&str]) -> Result<(), TemplateError> {
    for piece in parse(template)? {
        if let Piece::Key(key, offset) = piece
            && !keys.contains(&key)
        {
            return Err(TemplateError::UnknownKey {
                key: key.to_string(),
                offset,
            });
        }
    }
    Ok(())
}

/// Substitute every placeholder from `values`.
pub fn render(template: &str, values: &HashMap<&str, &str>) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len() + 16);
    for piece in parse(template)? {
        match piece {
            Piece::Literal(text) => out.push_str(text),
            Piece::Brace(c) => out.push(c),
            Piece::Key(key, offset) => match values.get(key) {
                Some(value) => out.push_str(value),
                None => {
                    return Err(TemplateError::UnknownKey {
                        key: key.to_string(),
                        offset,
                    });
                }
            },
        }
    }
    Ok(out)
}

/// Render the output file stem for an image and profile.
pub fn output_stem(template: &str, name: &str, profile: &str) -> Result<String, TemplateError> {
    let values = HashMap::from([("name", name), ("profile", profile)]);
    render(template, &values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format() {
        assert_eq!(output_stem("{name}_{profile}", "dawn", "web").unwrap(), "dawn_web");
    }

    #[test]
    fn placeholders_can_repeat_and_be_adjacent() {
        assert_eq!(
            output_stem("{profile}{name}-{profile}", "a", "b").unwrap(),
            "ba-b"
        );
    }

    #[test]
    fn literal_only_and_empty_templates() {
        assert_eq!(output_stem("cover", "x", "y").unwrap(), "cover");
        assert_eq!(output_stem("", "x", "y").unwrap(), "");
    }

    #[test]
    fn doubled_braces_are_literal() {
        assert_eq!(output_stem("{{{name}}}", "dawn", "web").unwrap(), "{dawn}");
        assert_eq!(output_stem("a{{b}}c", "x", "y").unwrap(), "a{b}c");
    }

    #[test]
    fn whitespace_inside_placeholder_is_ignored() {
        assert_eq!(output_stem("{ name }", "dawn", "web").unwrap(), "dawn");
    }

    #[test]
    fn non_ascii_literals_survive() {
        assert_eq!(
            output_stem("фото_{name}→{profile}", "zoë", "web").unwrap(),
            "фото_zoë→web"
        );
    }

    #[test]
    fn unknown_key_is_an_error() {
        assert_eq!(
            output_stem("{name}_{size}", "a", "b"),
            Err(TemplateError::UnknownKey {
                key: "size".into(),
                offset: 7
            })
        );
    }

    #[test]
    fn unbalanced_braces_are_errors() {
        assert_eq!(output_stem("{name", "a", "b"), Err(TemplateError::Unclosed(0)));
        assert_eq!(output_stem("name}", "a", "b"), Err(TemplateError::Unmatched(4)));
        assert_eq!(output_stem("{na{me}", "a", "b"), Err(TemplateError::Unclosed(0)));
        assert_eq!(output_stem("x{}", "a", "b"), Err(TemplateError::EmptyKey(1)));
    }

    #[test]
    fn validate_checks_keys_without_values() {
        assert!(validate("{name}_{profile}", &["name", "profile"]).is_ok());
        assert!(validate("{name}", &["profile"]).is_err());
        assert!(validate("{{name}}", &[]).is_ok());
    }
}
