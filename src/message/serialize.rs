//! Serialization of [`Message`] values to wire lines.
//!
//! Integers and all-digit strings are emitted bare, everything else is
//! double-quoted. No quote escaping is performed: the decoder recognizes
//! backslash-escaped quotes but the encoder never emits them, and embedded
//! quotes in a value will confuse the receiving tokenizer. This asymmetry
//! matches the deployed servers and is covered by the round-trip tests.

use std::fmt;

use super::{is_all_digits, Message, Scalar, Value};

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.event)?;
        for (key, value) in self.fields.iter() {
            write!(f, " {}=", key)?;
            write_value(f, value)?;
        }
        Ok(())
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Int(n) => write!(f, "{}", n),
        Value::Text(s) if is_all_digits(s) => f.write_str(s),
        Value::Text(s) => write!(f, "\"{}\"", s),
        Value::List(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                match item {
                    Scalar::Int(n) => write!(f, "{}", n)?,
                    Scalar::Text(s) if is_all_digits(s) => f.write_str(s)?,
                    Scalar::Text(s) => write!(f, "\"{}\"", s)?,
                }
            }
            f.write_str("]")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_login() {
        let msg = Message::new("login")
            .field("nickname", "bob")
            .field("username", "bob22")
            .field("id", 1);
        assert_eq!(
            msg.to_string(),
            "login nickname=\"bob\" username=\"bob22\" id=1"
        );
    }

    #[test]
    fn test_digit_string_emitted_bare() {
        let msg = Message::new("join").field("chanid", "5");
        assert_eq!(msg.to_string(), "join chanid=5");
    }

    #[test]
    fn test_list_elements() {
        let msg = Message::new("updatechannel").field(
            "topics",
            vec![
                Scalar::Int(1),
                Scalar::Text("42".to_string()),
                Scalar::Text("news".to_string()),
            ],
        );
        assert_eq!(msg.to_string(), "updatechannel topics=[1,42,\"news\"]");
    }

    #[test]
    fn test_empty_list() {
        let msg = Message::new("updatechannel").field("topics", Vec::new());
        assert_eq!(msg.to_string(), "updatechannel topics=[]");
    }

    #[test]
    fn test_bare_event() {
        assert_eq!(Message::new("ping").to_string(), "ping");
    }

    #[test]
    fn test_field_order_preserved() {
        let msg = Message::new("kick").field("userid", 3).field("chanid", 9);
        assert_eq!(msg.to_string(), "kick userid=3 chanid=9");
    }
}
