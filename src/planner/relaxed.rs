//! Tolerant pre-pass for hand-written JSON.
//!
//! Runs before strict `serde_json` parsing:
//! - strips `//` line comments and `/* */` block comments outside strings
//! - drops trailing commas before `}` or `]`
//!
//! Source documents read from disk or over HTTP additionally go through
//! [`normalize_with_env`], which expands `*env:NAME` tokens from the process
//! environment. Payloads submitted over RPC never do: a stored value that
//! happens to start with `*env:` has to survive an export/import round trip.
//!
//! The output is plain JSON; strict parsing stays independent of this module.

use crate::error::{ConfigError, ConfigResult};

const ENV_PREFIX: &str = "*env:";

/// Normalize relaxed JSON text into strict JSON text.
pub fn normalize(input: &str) -> ConfigResult<String> {
    let stripped = strip_comments(input)?;
    Ok(strip_trailing_commas(&stripped))
}

/// [`normalize`], then expand `*env:NAME` tokens.
pub fn normalize_with_env(input: &str) -> ConfigResult<String> {
    expand_env(&normalize(input)?, |name| std::env::var(name).ok())
}

fn strip_comments(input: &str) -> ConfigResult<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut closed = false;
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        closed = true;
                        break;
                    }
                    prev = next;
                }
                if !closed {
                    return Err(ConfigError::MalformedPayload("unterminated block comment".into()));
                }
                // keep tokens on either side apart
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|n| !n.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn expand_env<F>(input: &str, lookup: F) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(ENV_PREFIX) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + ENV_PREFIX.len()..];
        let end = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        let name = &after[..end];
        if name.is_empty() {
            return Err(ConfigError::MalformedPayload(format!("empty variable name after {}", ENV_PREFIX)));
        }
        let value = lookup(name)
            .ok_or_else(|| ConfigError::MalformedPayload(format!("environment variable <{}> is not set", name)))?;
        out.push_str(&value);
        rest = &after[end..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_commas() {
        let out = normalize(r#"{"general": {"node_id": "n1", "reconnects": 3,}, "listen": [1, 2, ],}"#).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["general"]["reconnects"], 3);
        assert_eq!(v["listen"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_comments_outside_strings_only() {
        let input = r#"{
            // line comment
            "url": "http://example.org/a", /* block */
            "sep": "/*not a comment*/"
        }"#;
        let v: serde_json::Value = serde_json::from_str(&normalize(input).unwrap()).unwrap();
        assert_eq!(v["url"], "http://example.org/a");
        assert_eq!(v["sep"], "/*not a comment*/");
    }

    #[test]
    fn test_commas_inside_strings_kept() {
        let out = normalize(r#"{"sep": ",}"}"#).unwrap();
        assert_eq!(out, r#"{"sep": ",}"}"#);
    }

    #[test]
    fn test_unterminated_comment() {
        assert!(matches!(
            normalize("{ /* open").unwrap_err(),
            ConfigError::MalformedPayload(_)
        ));
    }

    #[test]
    fn test_env_expansion() {
        let lookup = |name: &str| match name {
            "DB_HOST" => Some("10.0.0.1".to_string()),
            "DB_PORT" => Some("6379".to_string()),
            _ => None,
        };
        let out = expand_env(r#"{"host": "*env:DB_HOST", "port": *env:DB_PORT}"#, lookup).unwrap();
        assert_eq!(out, r#"{"host": "10.0.0.1", "port": 6379}"#);

        let err = expand_env(r#"{"x": "*env:MISSING"}"#, lookup).unwrap_err();
        assert!(err.to_string().contains("MISSING"));
    }

    #[test]
    fn test_plain_normalize_keeps_env_tokens() {
        let input = r#"{"node_id": "*env:LIVE_CONFIG_TEST_NEVER_SET",}"#;
        assert_eq!(normalize(input).unwrap(), r#"{"node_id": "*env:LIVE_CONFIG_TEST_NEVER_SET"}"#);
        assert!(normalize_with_env(input).is_err());
    }
}
