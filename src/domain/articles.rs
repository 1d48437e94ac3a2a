use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of an article as stored by the origin.
///
/// Origins key rows either by integer sequence or by an opaque string (uuid,
/// slug). Both serialize back to the exact JSON shape they were read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArticleId {
    Int(i64),
    Text(String),
}

impl ArticleId {
    /// Interpret a path segment. Only the canonical decimal rendering of an
    /// integer becomes `Int`; `"05"` or `"+5"` stay text so they never alias `5`.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(value) if value.to_string() == raw => Self::Int(value),
            _ => Self::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleId::Int(value) => write!(f, "{value}"),
            ArticleId::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for ArticleId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for ArticleId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// An article row. Only `id` is interpreted; every other column is carried
/// verbatim and in its original order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: ArticleId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Article {
    pub fn new(id: impl Into<ArticleId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn title(&self) -> Option<&str> {
        self.field("title").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_prefers_integer_ids() {
        assert_eq!(ArticleId::parse("42"), ArticleId::Int(42));
        assert_eq!(
            ArticleId::parse("9f1c-intro"),
            ArticleId::Text("9f1c-intro".to_string())
        );
        assert_eq!(ArticleId::parse("-3"), ArticleId::Int(-3));
    }

    #[test]
    fn non_canonical_integers_stay_text() {
        for raw in ["05", "+5", "-0", "007"] {
            assert_eq!(ArticleId::parse(raw), ArticleId::Text(raw.to_string()));
        }
    }

    #[test]
    fn parse_round_trips_through_display() {
        for raw in ["5", "05", "+5", "-12", "intro"] {
            assert_eq!(ArticleId::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn article_keeps_unknown_columns() {
        let raw = json!({ "id": 7, "title": "Hello", "content": "Body", "views": 12 });
        let article: Article = serde_json::from_value(raw.clone()).expect("article");

        assert_eq!(article.id, ArticleId::Int(7));
        assert_eq!(article.title(), Some("Hello"));
        assert_eq!(article.field("views"), Some(&json!(12)));
        assert_eq!(serde_json::to_value(&article).expect("serialize"), raw);
    }

    #[test]
    fn string_ids_survive_serialization() {
        let article = Article::new("abc").with_field("title", "Text id");
        let value = serde_json::to_value(&article).expect("serialize");
        assert_eq!(value, json!({ "id": "abc", "title": "Text id" }));
    }

    #[test]
    fn article_without_id_is_rejected() {
        let result = serde_json::from_value::<Article>(json!({ "title": "orphan" }));
        assert!(result.is_err());
    }
}
