//! Template values that may only be known at apply time

use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;

/// A value placed into a template
///
/// Literals render as plain strings; everything else renders as the matching
/// CloudFormation intrinsic function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Plain string value
    Literal(String),
    /// `{"Ref": id}` - a resource or a template parameter
    Ref(String),
    /// `{"Fn::GetAtt": [id, attribute]}`
    GetAtt { logical_id: String, attribute: String },
    /// `{"Fn::ImportValue": name}` - an export of another stack
    ImportValue(String),
    /// `{"Fn::Join": ["", parts]}`
    Join(Vec<Token>),
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        Token::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Token::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Token::GetAtt {
            logical_id: logical_id.into(),
            attribute: attribute.into(),
        }
    }

    pub fn import(export_name: impl Into<String>) -> Self {
        Token::ImportValue(export_name.into())
    }

    /// Concatenate tokens
    ///
    /// Nested joins are flattened and adjacent literals merged, so joining
    /// only literals yields a single `Literal`.
    pub fn join<I>(parts: I) -> Self
    where
        I: IntoIterator<Item = Token>,
    {
        let mut merged: Vec<Token> = Vec::new();

        for part in parts {
            let pieces = match part {
                Token::Join(inner) => inner,
                other => vec![other],
            };
            for piece in pieces {
                if let Token::Literal(s) = &piece {
                    if s.is_empty() {
                        continue;
                    }
                    if let Some(Token::Literal(prev)) = merged.last_mut() {
                        prev.push_str(s);
                        continue;
                    }
                }
                merged.push(piece);
            }
        }

        match merged.len() {
            0 => Token::Literal(String::new()),
            1 if matches!(merged[0], Token::Literal(_)) => merged.remove(0),
            _ => Token::Join(merged),
        }
    }

    /// The plain string, if this token is fully resolved
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Token::Literal(s) => Some(s),
            _ => None,
        }
    }

    /// Render as template JSON
    pub fn to_value(&self) -> Value {
        match self {
            Token::Literal(s) => Value::String(s.clone()),
            Token::Ref(id) => json!({ "Ref": id }),
            Token::GetAtt {
                logical_id,
                attribute,
            } => json!({ "Fn::GetAtt": [logical_id, attribute] }),
            Token::ImportValue(name) => json!({ "Fn::ImportValue": name }),
            Token::Join(parts) => {
                let parts: Vec<Value> = parts.iter().map(Token::to_value).collect();
                json!({ "Fn::Join": ["", parts] })
            }
        }
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Literal(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Literal(value)
    }
}

impl From<Token> for Value {
    fn from(token: Token) -> Self {
        token.to_value()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_value()),
        }
    }
}
