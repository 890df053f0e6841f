//! Node and run configuration values.
//!
//! Configuration arrives as a flat `key=value` list, e.g. from a command-line
//! flag or an environment variable:
//!
//! ```rust
//! use sepal::config::parse_config_args;
//! use sepal::Scalar;
//!
//! let cfg = parse_config_args(r#"partition-id=0 num-partitions=10 lr=0.05 tag="two words""#).unwrap();
//! assert_eq!(cfg["num-partitions"], Scalar::Int(10));
//! assert_eq!(cfg["tag"], Scalar::Str("two words".into()));
//! ```

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::record::Scalar;

/// Ordered configuration map attached to a node or a run.
pub type UserConfig = IndexMap<String, Scalar>;

/// Parses whitespace-separated `key=value` pairs.
///
/// Values become `Bool` for `true`/`false`, `Int` or `Float` when they parse
/// as numbers, and `Str` otherwise. Single or double quotes keep a value as a
/// string, spaces included. A later duplicate key overwrites an earlier one.
pub fn parse_config_args(input: &str) -> Result<UserConfig> {
    let mut config = UserConfig::new();
    for token in tokenize(input)? {
        let (key, value) = token
            .raw
            .split_once('=')
            .ok_or_else(|| Error::Config(format!("expected `key=value`, got `{}`", token.raw)))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::Config(format!("empty key in `{}`", token.raw)));
        }
        let value = if token.quoted { Scalar::Str(value.to_owned()) } else { parse_value(value) };
        config.insert(key.to_owned(), value);
    }
    Ok(config)
}

struct Token {
    raw: String,
    quoted: bool,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        if chars.peek().is_none() {
            return Ok(tokens);
        }

        let mut raw = String::new();
        let mut quoted = false;
        while let Some(c) = chars.next() {
            match c {
                c if c.is_whitespace() => break,
                '"' | '\'' if raw.ends_with('=') && !quoted => {
                    quoted = true;
                    let mut closed = false;
                    for q in chars.by_ref() {
                        if q == c {
                            closed = true;
                            break;
                        }
                        raw.push(q);
                    }
                    if !closed {
                        return Err(Error::Config(format!("unterminated quote in `{raw}`")));
                    }
                }
                c => raw.push(c),
            }
        }
        tokens.push(Token { raw, quoted });
    }
}

fn parse_value(raw: &str) -> Scalar {
    match raw {
        "true" => Scalar::Bool(true),
        "false" => Scalar::Bool(false),
        _ => raw
            .parse::<i64>()
            .map(Scalar::Int)
            .or_else(|_| raw.parse::<f64>().map(Scalar::Float))
            .unwrap_or_else(|_| Scalar::Str(raw.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_value_kinds_in_order() {
        let cfg = parse_config_args("a=1 b=2.5 c=true d=false e=hello").unwrap();
        assert_eq!(cfg.keys().collect::<Vec<_>>(), ["a", "b", "c", "d", "e"]);
        assert_eq!(cfg["a"], Scalar::Int(1));
        assert_eq!(cfg["b"], Scalar::Float(2.5));
        assert_eq!(cfg["c"], Scalar::Bool(true));
        assert_eq!(cfg["d"], Scalar::Bool(false));
        assert_eq!(cfg["e"], Scalar::Str("hello".into()));
    }

    #[test]
    fn quotes_keep_strings() {
        let cfg = parse_config_args(r#"n="42" msg='hi there' empty="""#).unwrap();
        assert_eq!(cfg["n"], Scalar::Str("42".into()));
        assert_eq!(cfg["msg"], Scalar::Str("hi there".into()));
        assert_eq!(cfg["empty"], Scalar::Str(String::new()));
    }

    #[test]
    fn later_keys_overwrite() {
        let cfg = parse_config_args("x=1 y=2 x=3").unwrap();
        assert_eq!(cfg.len(), 2);
        assert_eq!(cfg["x"], Scalar::Int(3));
    }

    #[test]
    fn blank_input_is_empty() {
        assert!(parse_config_args("   ").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(matches!(parse_config_args("novalue"), Err(Error::Config(_))));
        assert!(matches!(parse_config_args("=1"), Err(Error::Config(_))));
        assert!(matches!(parse_config_args(r#"a="open"#), Err(Error::Config(_))));
    }
}
