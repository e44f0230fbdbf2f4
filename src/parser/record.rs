use serde_json::{Map, Number, Value};
use std::fs;
use std::path::Path;

use crate::error::LoadError;

/// One fixture object, keyed by field name
pub type Record = Map<String, Value>;

/// Read a fixture file holding a JSON array of objects
pub fn read_fixture(path: &Path) -> Result<Vec<Record>, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let json: Value = serde_json::from_str(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let Value::Array(items) = json else {
        return Err(LoadError::NotAnArray {
            path: path.to_path_buf(),
        });
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            _ => Err(LoadError::NotAnArray {
                path: path.to_path_buf(),
            }),
        })
        .collect()
}

/// A fixture value shaped for binding.
///
/// The shape is chosen per value, never per column: the same column can
/// receive an object in one fixture version and a list in another.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
    /// Stored in the database's structured document type
    Document(Value),
    /// Stored as a native array
    Array(Vec<SqlValue>),
}

#[derive(PartialEq)]
enum ElementKind {
    Bool,
    Number,
    Text,
    Array,
}

impl SqlValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(b),
            Value::Number(n) => SqlValue::Number(n),
            Value::String(s) => SqlValue::Text(s),
            obj @ Value::Object(_) => SqlValue::Document(obj),
            Value::Array(items) => {
                if is_homogeneous(&items) {
                    SqlValue::Array(items.into_iter().map(SqlValue::from_json).collect())
                } else {
                    SqlValue::Document(Value::Array(items))
                }
            }
        }
    }

    /// JSON form, used where the backend has no native array type
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(b) => Value::Bool(*b),
            SqlValue::Number(n) => Value::Number(n.clone()),
            SqlValue::Text(s) => Value::String(s.clone()),
            SqlValue::Document(v) => v.clone(),
            SqlValue::Array(items) => Value::Array(items.iter().map(SqlValue::to_json).collect()),
        }
    }

    /// Text form as the PostgreSQL input functions expect it.
    ///
    /// Returns `None` for SQL NULL.
    pub fn to_pg_text(&self) -> Option<String> {
        match self {
            SqlValue::Null => None,
            SqlValue::Bool(b) => Some(b.to_string()),
            SqlValue::Number(n) => Some(number_text(n)),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Document(v) => Some(v.to_string()),
            SqlValue::Array(items) => {
                let mut out = String::new();
                write_pg_array(items, &mut out);
                Some(out)
            }
        }
    }
}

/// Number text as a literal would read.
///
/// Whole floats such as `33771.0` lose the fraction so integer columns
/// accept them; numeric and float columns read the same value either way.
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f)
            if n.is_f64()
                && f.fract() == 0.0
                && f >= i64::MIN as f64
                && f < i64::MAX as f64 =>
        {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

/// Arrays of one scalar kind (nulls allowed), or of homogeneous arrays
fn is_homogeneous(items: &[Value]) -> bool {
    let mut kind: Option<ElementKind> = None;

    for item in items {
        let item_kind = match item {
            Value::Null => continue,
            Value::Bool(_) => ElementKind::Bool,
            Value::Number(_) => ElementKind::Number,
            Value::String(_) => ElementKind::Text,
            Value::Array(inner) if is_homogeneous(inner) => ElementKind::Array,
            Value::Array(_) | Value::Object(_) => return false,
        };

        match &kind {
            Some(k) if *k != item_kind => return false,
            Some(_) => {}
            None => kind = Some(item_kind),
        }
    }

    true
}

fn write_pg_array(items: &[SqlValue], out: &mut String) {
    out.push('{');
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        match item {
            SqlValue::Null => out.push_str("NULL"),
            SqlValue::Bool(b) => out.push_str(if *b { "t" } else { "f" }),
            SqlValue::Number(n) => out.push_str(&number_text(n)),
            SqlValue::Text(s) => push_quoted(s, out),
            SqlValue::Document(v) => push_quoted(&v.to_string(), out),
            SqlValue::Array(inner) => write_pg_array(inner, out),
        }
    }
    out.push('}');
}

fn push_quoted(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_objects_become_documents() {
        let value = SqlValue::from_json(json!({"mbps": 20}));
        assert!(matches!(value, SqlValue::Document(_)));
        assert_eq!(value.to_pg_text().unwrap(), r#"{"mbps":20}"#);
    }

    #[test]
    fn test_homogeneous_lists_become_arrays() {
        let value = SqlValue::from_json(json!(["dhaka", "khulna", null]));
        assert_eq!(value.to_pg_text().unwrap(), r#"{"dhaka","khulna",NULL}"#);

        let nested = SqlValue::from_json(json!([[1, 2], [3, 4]]));
        assert_eq!(nested.to_pg_text().unwrap(), "{{1,2},{3,4}}");
    }

    #[test]
    fn test_mixed_lists_become_documents() {
        let value = SqlValue::from_json(json!([1, "two"]));
        assert_eq!(value, SqlValue::Document(json!([1, "two"])));

        let objects = SqlValue::from_json(json!([{"a": 1}]));
        assert!(matches!(objects, SqlValue::Document(_)));
    }

    #[test]
    fn test_array_text_escapes_quotes() {
        let value = SqlValue::from_json(json!([r#"say "hi""#, r"back\slash"]));
        assert_eq!(
            value.to_pg_text().unwrap(),
            r#"{"say \"hi\"","back\\slash"}"#
        );
    }

    #[test]
    fn test_scalars() {
        assert_eq!(SqlValue::from_json(Value::Null).to_pg_text(), None);
        assert_eq!(SqlValue::from_json(json!(false)).to_pg_text().unwrap(), "false");
        assert_eq!(SqlValue::from_json(json!(12.5)).to_pg_text().unwrap(), "12.5");
        assert_eq!(SqlValue::from_json(json!("BD-A")).to_pg_text().unwrap(), "BD-A");
    }

    #[test]
    fn test_whole_floats_render_as_integers() {
        assert_eq!(SqlValue::from_json(json!(33771.0)).to_pg_text().unwrap(), "33771");
        assert_eq!(SqlValue::from_json(json!(-2.0)).to_pg_text().unwrap(), "-2");
        assert_eq!(SqlValue::from_json(json!(0.25)).to_pg_text().unwrap(), "0.25");

        let parsed: Value = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(SqlValue::from_json(parsed).to_pg_text().unwrap(), "{1,2}");
    }

    #[test]
    fn test_read_fixture_requires_array_of_objects() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"id": 1}}"#).unwrap();
        assert!(matches!(
            read_fixture(file.path()),
            Err(LoadError::NotAnArray { .. })
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": 1}}, {{"id": 2}}]"#).unwrap();
        assert_eq!(read_fixture(file.path()).unwrap().len(), 2);
    }
}
