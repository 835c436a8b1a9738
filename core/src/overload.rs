//! Argument normalisation for create and update calls.
//!
//! # Design
//! Every mutating operation accepts the same call shapes: discrete positional
//! values, named values, a whole record, or nothing at all (meaning "push my
//! own fields"). `Args` captures the shape and `resolve` turns it into the
//! one `FieldMap` that goes on the wire.
//!
//! Resolution, first match wins:
//!
//! 1. The first positional argument is a record, or a keyword named after the
//!    resource holds an object: its fields are the whole result.
//! 2. Positional values are zipped against the option names and merged into
//!    the keywords. A positional value overwrites a keyword of the same name.
//! 3. With no arguments at all, the fallback (usually the record itself) is
//!    the result.
//!
//! Required names are checked last, whichever branch produced the map.

use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::record::{FieldMap, Record};

/// One positional argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    Record(FieldMap),
}

/// The call shape of a create or update operation.
///
/// Built with [`Args::new`] and the chaining helpers, or with [`args!`]:
///
/// ```
/// use planka_core::args;
///
/// let a = args!("Sprint 1", 0);
/// let b = args!(name = "Sprint 1", position = 0);
/// let c = args!("Sprint 1", position = 0);
/// assert!(!a.is_empty() && !b.is_empty() && !c.is_empty());
/// ```
///
/// [`args!`]: crate::args
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Arg>,
    keywords: FieldMap,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional value.
    pub fn pos(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(Arg::Value(value.into()));
        self
    }

    /// Set a named value.
    pub fn kw(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    /// Pass a whole record; its set fields become the request.
    pub fn record<R: Record>(record: &R) -> Self {
        Self {
            positional: vec![Arg::Record(record.snapshot())],
            keywords: FieldMap::new(),
        }
    }

    /// Pass a record under its resource keyword, e.g. `board = <Board>`.
    pub fn kw_record<R: Record>(self, record: &R) -> Self {
        self.kw(R::NAME, Value::Object(record.snapshot()))
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keywords.is_empty()
    }

    pub fn positional(&self) -> &[Arg] {
        &self.positional
    }

    pub fn keywords(&self) -> &FieldMap {
        &self.keywords
    }
}

/// Build [`Args`] from positional values followed by `name = value` pairs.
#[macro_export]
macro_rules! args {
    () => { $crate::Args::new() };
    (@kw $acc:expr;) => { $acc };
    (@kw $acc:expr; $k:ident = $v:expr $(, $($rest:tt)*)?) => {
        $crate::args!(@kw $acc.kw(stringify!($k), $v); $($($rest)*)?)
    };
    (@pos $acc:expr;) => { $acc };
    (@pos $acc:expr; $k:ident = $($rest:tt)*) => {
        $crate::args!(@kw $acc; $k = $($rest)*)
    };
    (@pos $acc:expr; $v:expr $(, $($rest:tt)*)?) => {
        $crate::args!(@pos $acc.pos($v); $($($rest)*)?)
    };
    ($($t:tt)+) => { $crate::args!(@pos $crate::Args::new(); $($t)+) };
}

/// Normalise `args` into the field map for `resource`.
///
/// `fallback` is only consulted when `args` is empty; callers compute it
/// lazily (see `Record::resolve_update`).
pub fn resolve(
    args: Args,
    resource: &str,
    options: &[&str],
    required: &[&str],
    fallback: Option<FieldMap>,
) -> Result<FieldMap> {
    let Args {
        positional,
        mut keywords,
    } = args;

    let resolved = if let Some(Arg::Record(fields)) = positional.first() {
        fields.clone()
    } else if let Some(value) = keywords.remove(resource) {
        match value {
            Value::Object(fields) => fields,
            other => {
                return Err(ApiError::validation(format!(
                    "{resource}: expected a record for '{resource}', got {other}"
                )))
            }
        }
    } else if !positional.is_empty() {
        if positional.len() > options.len() {
            debug!(resource, extra = positional.len() - options.len(), "ignoring surplus positional arguments");
        }
        for (name, arg) in options.iter().zip(positional) {
            let value = match arg {
                Arg::Value(v) => v,
                Arg::Record(fields) => Value::Object(fields),
            };
            keywords.insert((*name).to_string(), value);
        }
        keywords
    } else if keywords.is_empty() {
        fallback.unwrap_or_default()
    } else {
        keywords
    };

    let missing: Vec<String> = required
        .iter()
        .filter(|name| !resolved.contains_key(**name))
        .map(|name| (*name).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::missing(resource, missing));
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::resources::Board;
    use serde_json::json;

    const OPTIONS: &[&str] = &["name", "position"];

    fn map(v: Value) -> FieldMap {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn positional_values_zip_against_options() {
        let out = resolve(args!("A", 1), "board", OPTIONS, &[], None).unwrap();
        assert_eq!(Value::Object(out), json!({"name": "A", "position": 1}));
    }

    #[test]
    fn keyword_values_pass_through() {
        let out = resolve(args!(name = "A", position = 1), "board", OPTIONS, &[], None).unwrap();
        assert_eq!(Value::Object(out), json!({"name": "A", "position": 1}));
    }

    #[test]
    fn mixed_positional_and_keyword() {
        let out = resolve(args!("A", position = 2), "board", OPTIONS, &["name"], None).unwrap();
        assert_eq!(Value::Object(out), json!({"name": "A", "position": 2}));
    }

    #[test]
    fn positional_overwrites_same_named_keyword() {
        // Long-standing behaviour kept for compatibility: the positional
        // value wins even though the keyword was explicit.
        let out = resolve(args!("positional", name = "keyword"), "board", OPTIONS, &[], None).unwrap();
        assert_eq!(out["name"], json!("positional"));
    }

    #[test]
    fn record_argument_is_the_whole_result() {
        let mut board = Board::new("From record");
        board.position = Field::Value(3);
        let args = Args::record(&board).pos("ignored").kw("position", 9);
        let out = resolve(args, "board", OPTIONS, &["name"], None).unwrap();
        assert_eq!(Value::Object(out), json!({"name": "From record", "position": 3}));
    }

    #[test]
    fn record_keyword_is_the_whole_result() {
        let board = Board::new("Keyword record");
        let args = Args::new().kw("position", 9).kw_record(&board);
        let out = resolve(args, "board", OPTIONS, &[], None).unwrap();
        assert_eq!(Value::Object(out), json!({"name": "Keyword record"}));
    }

    #[test]
    fn non_object_resource_keyword_is_rejected() {
        let err = resolve(args!(board = 5), "board", OPTIONS, &[], None).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn empty_args_use_fallback() {
        let fallback = map(json!({"id": "1", "name": "Current", "position": 65535}));
        let out = resolve(Args::new(), "board", OPTIONS, &[], Some(fallback.clone())).unwrap();
        assert_eq!(out, fallback);
    }

    #[test]
    fn fallback_ignored_when_args_present() {
        let fallback = map(json!({"name": "Current"}));
        let out = resolve(args!(position = 4), "board", OPTIONS, &[], Some(fallback)).unwrap();
        assert_eq!(Value::Object(out), json!({"position": 4}));
    }

    #[test]
    fn missing_required_names_exactly_the_missing_fields() {
        let err = resolve(args!(position = 1), "label", &["name", "position", "color"], &["name", "color"], None)
            .unwrap_err();
        match err {
            ApiError::MissingRequired { resource, fields } => {
                assert_eq!(resource, "label");
                assert_eq!(fields, vec!["name".to_string(), "color".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn required_is_checked_on_the_record_path_too() {
        let board = Board::default();
        let err = resolve(Args::record(&board), "board", OPTIONS, &["name"], None).unwrap_err();
        assert!(matches!(err, ApiError::MissingRequired { .. }));
    }

    #[test]
    fn surplus_positionals_are_dropped() {
        let out = resolve(args!("A", 1, true), "board", OPTIONS, &[], None).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn empty_macro_is_empty() {
        assert!(args!().is_empty());
        assert_eq!(args!(), Args::new());
    }
}
