use serde_json::Value;

/// Kinds of dynamically typed JSON values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JsonKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}
impl JsonKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => JsonKind::Null,
            Value::Bool(_) => JsonKind::Bool,
            Value::Number(_) => JsonKind::Number,
            Value::String(_) => JsonKind::String,
            Value::Array(_) => JsonKind::Array,
            Value::Object(_) => JsonKind::Object,
        }
    }
}

/// JSON values that can be iterated element-wise. Strings are sequences of one-character
/// strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqKind {
    Array,
    String,
}

/// Checks whether `value` is a sequence whose elements all are of kind `expected`. Without
/// `seq_kind`, arrays and strings both count as sequences. Mismatches yield `false`.
pub fn is_seq_of(value: &Value, expected: JsonKind, seq_kind: Option<SeqKind>) -> bool {
    match (value, seq_kind) {
        (Value::Array(elts), None | Some(SeqKind::Array)) => {
            elts.iter().all(|elt| JsonKind::of(elt) == expected)
        }
        (Value::String(s), None | Some(SeqKind::String)) => {
            s.is_empty() || expected == JsonKind::String
        }
        _ => false,
    }
}

#[test]
fn test_is_seq_of() {
    use serde_json::json;
    let v = json!([1, 2, 3]);
    assert!(is_seq_of(&v, JsonKind::Number, None));
    assert!(is_seq_of(&v, JsonKind::Number, Some(SeqKind::Array)));
    assert!(!is_seq_of(&v, JsonKind::Number, Some(SeqKind::String)));
    assert!(!is_seq_of(&v, JsonKind::String, None));
    let v = json!([{"a": 1}, 2]);
    assert!(!is_seq_of(&v, JsonKind::Object, None));
    let v = json!([]);
    assert!(is_seq_of(&v, JsonKind::Object, None));
    let v = json!("abc");
    assert!(is_seq_of(&v, JsonKind::String, None));
    assert!(!is_seq_of(&v, JsonKind::Number, None));
    assert!(!is_seq_of(&v, JsonKind::String, Some(SeqKind::Array)));
    assert!(!is_seq_of(&json!(1), JsonKind::Number, None));
    assert!(!is_seq_of(&json!({"a": [1]}), JsonKind::Array, None));
}
