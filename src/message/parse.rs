//! Parsing of wire lines into [`Message`] values.
//!
//! The tokenizer is a quote-toggle state machine: double quotes open and
//! close a span in which spaces do not split tokens, and a quote directly
//! preceded by a backslash counts as a literal character. This mirrors the
//! server's own lax handling and is deliberately not a full escaping
//! grammar.

use std::str::FromStr;

use super::{is_all_digits, Fields, Message, Scalar, Value};
use crate::error::MessageParseError;

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        if line.is_empty() {
            return Err(MessageParseError::Empty);
        }

        let tokens = split_quoted(line);
        let mut fields = Fields::new();
        for token in &tokens[1..] {
            if token.is_empty() {
                continue;
            }
            let (key, raw) = token
                .split_once('=')
                .ok_or_else(|| MessageParseError::MissingSeparator {
                    token: token.clone(),
                })?;
            fields.insert(key, parse_value(raw));
        }

        Ok(Message {
            event: tokens[0].clone(),
            fields,
        })
    }
}

/// Split a line into space-separated tokens, keeping quoted spans intact.
///
/// Quotes stay in the token text; value coercion strips them later.
fn split_quoted(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut in_quote = false;
    let mut prev = '\0';

    for ch in line.chars() {
        if ch == ' ' && !in_quote {
            tokens.push(std::mem::take(&mut buf));
            prev = ch;
            continue;
        }
        if ch == '"' && prev != '\\' {
            in_quote = !in_quote;
        }
        buf.push(ch);
        prev = ch;
    }
    tokens.push(buf);
    tokens
}

fn parse_value(raw: &str) -> Value {
    if let Some(body) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        if body.is_empty() {
            return Value::List(Vec::new());
        }
        let items = body
            .split(',')
            .map(|item| {
                // list elements are never quote-stripped
                if is_all_digits(item) {
                    item.parse()
                        .map(Scalar::Int)
                        .unwrap_or_else(|_| Scalar::Text(item.to_string()))
                } else {
                    Scalar::Text(item.to_string())
                }
            })
            .collect();
        return Value::List(items);
    }

    if is_all_digits(raw) {
        if let Ok(n) = raw.parse() {
            return Value::Int(n);
        }
        // absurdly long digit run; keep the literal
    }

    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Value::Text(raw[1..raw.len() - 1].to_string());
    }

    Value::Text(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Message {
        line.parse().expect(line)
    }

    #[test]
    fn test_parse_login() {
        let msg = parse("login nickname=\"bob\" id=1");
        assert_eq!(msg.event, "login");
        assert_eq!(msg.fields.text("nickname"), Some("bob"));
        assert_eq!(msg.fields.int("id"), Some(1));
    }

    #[test]
    fn test_parse_list_field() {
        let msg = parse("addchannel chanid=5 channel=\"Lobby\" topics=[1,2,3]");
        assert_eq!(msg.fields.int("chanid"), Some(5));
        assert_eq!(msg.fields.text("channel"), Some("Lobby"));
        assert_eq!(
            msg.fields.get("topics"),
            Some(&Value::List(vec![
                Scalar::Int(1),
                Scalar::Int(2),
                Scalar::Int(3)
            ]))
        );
    }

    #[test]
    fn test_parse_empty_list() {
        let msg = parse("updatechannel chanid=2 topics=[]");
        assert_eq!(msg.fields.get("topics"), Some(&Value::List(Vec::new())));
    }

    #[test]
    fn test_parse_mixed_list_elements() {
        let msg = parse("updateuser userid=3 caps=[1,\"x\"]");
        assert_eq!(
            msg.fields.get("caps"),
            Some(&Value::List(vec![
                Scalar::Int(1),
                // kept verbatim, quotes and all
                Scalar::Text("\"x\"".to_string()),
            ]))
        );
    }

    #[test]
    fn test_quoted_value_keeps_spaces() {
        let msg = parse("message type=2 content=\"hello there world\" chanid=1");
        assert_eq!(msg.fields.text("content"), Some("hello there world"));
        assert_eq!(msg.fields.int("chanid"), Some(1));
    }

    #[test]
    fn test_escaped_quote_does_not_toggle() {
        let msg = parse(r#"message content="he said \"hi\" twice""#);
        assert_eq!(msg.fields.text("content"), Some(r#"he said \"hi\" twice"#));
    }

    #[test]
    fn test_event_case_preserved() {
        let msg = parse("LoggedIn userid=4");
        assert_eq!(msg.event, "LoggedIn");
    }

    #[test]
    fn test_missing_separator_fails() {
        let err = "join chanid".parse::<Message>().unwrap_err();
        assert_eq!(
            err,
            MessageParseError::MissingSeparator {
                token: "chanid".to_string()
            }
        );
    }

    #[test]
    fn test_empty_line_fails() {
        assert_eq!("   ".parse::<Message>().unwrap_err(), MessageParseError::Empty);
    }

    #[test]
    fn test_bare_event() {
        let msg = parse("pong");
        assert_eq!(msg.event, "pong");
        assert!(msg.fields.is_empty());
    }

    #[test]
    fn test_empty_value_passthrough() {
        let msg = parse("join chanid=1 password=");
        assert_eq!(msg.fields.text("password"), Some(""));
    }

    #[test]
    fn test_split_at_first_equals() {
        let msg = parse("updateuser statusmsg=a=b");
        assert_eq!(msg.fields.text("statusmsg"), Some("a=b"));
    }

    #[test]
    fn test_doubled_spaces_skipped() {
        let msg = parse("joined  chanid=7");
        assert_eq!(msg.fields.int("chanid"), Some(7));
    }
}
