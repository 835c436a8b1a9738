//! The contract every Planka resource implements.
//!
//! # Design
//! Resources are plain serde structs whose fields are `Field<T>`, plus a
//! skipped `routes` slot holding the session they were decoded from. The
//! trait supplies everything that does not depend on the concrete type:
//! serialization of set fields, identity, binding, reload-in-place and the
//! scoped `editor`. Types override `update` and `refresh` where Planka has
//! an endpoint for them; the defaults do nothing.
//!
//! Identity is the `id` field. Equality and hashing go through `RecordKey`,
//! which also carries the resource name so records of different kinds never
//! collide. Records without an id fall back to hashing their content; two
//! unsaved records with identical fields are therefore equal.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{ApiError, Result};
use crate::overload::{resolve, Args};
use crate::routes::{take_item, Routes};

pub type FieldMap = serde_json::Map<String, Value>;

/// Planka ids are 64-bit snowflakes sent as strings.
pub type Id = String;

/// Identity used for `Eq`/`Hash`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub kind: &'static str,
    pub hash: u64,
}

pub trait Record: Serialize + DeserializeOwned + Clone + std::fmt::Debug {
    /// Resource name as Planka spells it in payloads (`board`, `boardMembership`).
    const NAME: &'static str;

    fn id(&self) -> Option<&str>;

    /// camelCase names of fields still holding `Field::Required`.
    fn missing_required(&self) -> Vec<String>;

    fn routes_slot(&self) -> Option<&Routes>;

    fn routes_slot_mut(&mut self) -> &mut Option<Routes>;

    fn is_bound(&self) -> bool {
        self.routes_slot().is_some()
    }

    fn routes(&self) -> Result<&Routes> {
        self.routes_slot().ok_or(ApiError::NotBound { resource: Self::NAME })
    }

    fn bind(mut self, routes: Routes) -> Self {
        self.set_routes(routes);
        self
    }

    fn set_routes(&mut self, routes: Routes) {
        *self.routes_slot_mut() = Some(routes);
    }

    fn require_id(&self) -> Result<&str> {
        self.id().ok_or(ApiError::NotPersisted { resource: Self::NAME })
    }

    /// Set fields in declaration order, skipping unset and still-required ones.
    fn snapshot(&self) -> FieldMap {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                warn!(resource = Self::NAME, value = %other, "record did not serialize to an object");
                FieldMap::new()
            }
            Err(err) => {
                warn!(resource = Self::NAME, error = %err, "record failed to serialize");
                FieldMap::new()
            }
        }
    }

    /// The payload of a no-argument `update`. Fails if a required field was
    /// never supplied.
    fn fields(&self) -> Result<FieldMap> {
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(ApiError::missing(Self::NAME, missing));
        }
        match serde_json::to_value(self).map_err(|e| ApiError::SerializationError(e.to_string()))? {
            Value::Object(map) => Ok(map),
            other => Err(ApiError::SerializationError(format!(
                "{} serialized to {other}",
                Self::NAME
            ))),
        }
    }

    fn key(&self) -> RecordKey {
        let hash = match self.id() {
            Some(id) => id.parse::<u64>().unwrap_or_else(|_| hash_text(id)),
            None => {
                let content = serde_json::to_string(self).unwrap_or_else(|err| {
                    warn!(resource = Self::NAME, error = %err, "hashing unsaved record by its debug form");
                    format!("{self:?}")
                });
                hash_text(&format!("{}{content}", Self::NAME))
            }
        };
        RecordKey {
            kind: Self::NAME,
            hash,
        }
    }

    /// Parse an RFC 3339 timestamp field such as `createdAt`. Missing and
    /// null fields are `None`.
    fn timestamp(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        match self.snapshot().get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|e| ApiError::DeserializationError(format!("{}.{key} {s:?}: {e}", Self::NAME))),
            Some(other) => Err(ApiError::DeserializationError(format!(
                "{}.{key} is not a timestamp: {other}",
                Self::NAME
            ))),
        }
    }

    fn created_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.timestamp("createdAt")
    }

    fn updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.timestamp("updatedAt")
    }

    fn deleted_at(&self) -> Result<Option<DateTime<Utc>>> {
        self.timestamp("deletedAt")
    }

    /// The record's set fields as a JSON string. Relationships are not
    /// followed.
    fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ApiError::SerializationError(e.to_string()))
    }

    /// `{name}_{<last five id chars>}` for display; records without a name
    /// or id fall back to the resource name and the tail of their hash.
    fn unique_name(&self) -> String {
        let name = match self.snapshot().get("name") {
            Some(Value::String(name)) => Some(name.clone()),
            _ => None,
        };
        match (self.id(), name) {
            (Some(id), Some(name)) => format!("{name}_{{{}}}", tail(id, 5)),
            _ => format!("{}_{}", Self::NAME, tail(&self.key().hash.to_string(), 5)),
        }
    }

    /// Replace every field from a raw record, keeping the bound session.
    fn reload(&mut self, value: Value) -> Result<()> {
        let routes = self.routes_slot_mut().take();
        let mut fresh: Self = serde_json::from_value(value)?;
        *fresh.routes_slot_mut() = routes;
        *self = fresh;
        Ok(())
    }

    /// Resolve update arguments with this record as the fallback.
    fn resolve_update(&self, args: Args, options: &[&str]) -> Result<FieldMap> {
        let fallback = if args.is_empty() { Some(self.fields()?) } else { None };
        resolve(args, Self::NAME, options, &[], fallback)
    }

    /// PATCH `fields` to `path` and reload from the returned item.
    fn push(&mut self, path: &str, fields: &FieldMap) -> Result<()> {
        let body = self.routes()?.patch(path, fields)?;
        self.reload(take_item(body, path)?)
    }

    /// GET `path` and reload from the returned item.
    fn pull(&mut self, path: &str) -> Result<()> {
        let body = self.routes()?.get(path)?;
        self.reload(take_item(body, path)?)
    }

    /// Reload from the entry in `candidates` with the same id.
    fn rescan(&mut self, candidates: Vec<Self>) -> Result<()> {
        let id = self.require_id()?.to_string();
        match candidates.into_iter().find(|c| c.id() == Some(id.as_str())) {
            Some(found) => {
                let routes = self.routes_slot_mut().take();
                *self = found;
                *self.routes_slot_mut() = routes;
                Ok(())
            }
            None => Err(ApiError::NotFound {
                endpoint: format!("{} {id}", Self::NAME),
            }),
        }
    }

    fn update(&mut self, args: Args) -> Result<()> {
        let _ = args;
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    /// Edit the record in place and push it once the closure returns.
    ///
    /// The record is refreshed first. `update` with no arguments then runs
    /// exactly once on every exit path: normal return, `Err`, or panic. It is
    /// not a transaction; whatever the closure set before failing is pushed.
    /// The closure's error wins over the update's; a panic is resumed after
    /// the update.
    fn editor<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.refresh()?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        let pushed = self.update(Args::new());
        match outcome {
            Ok(Ok(value)) => pushed.map(|_| value),
            Ok(Err(err)) => {
                if let Err(update_err) = pushed {
                    warn!(resource = Self::NAME, error = %update_err, "update after failed edit also failed");
                }
                Err(err)
            }
            Err(payload) => {
                if let Err(update_err) = pushed {
                    warn!(resource = Self::NAME, error = %update_err, "update after panicking edit failed");
                }
                panic::resume_unwind(payload)
            }
        }
    }
}

/// Last `n` characters of `text`.
fn tail(text: &str, n: usize) -> &str {
    let start = text.char_indices().rev().nth(n - 1).map_or(0, |(i, _)| i);
    &text[start..]
}

fn hash_text(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// snake_case field ident to Planka's camelCase key.
pub fn camel_case(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let mut upper = false;
    for c in ident.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Implements `Record`, `PartialEq`, `Eq` and `Hash` for a resource struct
/// with `id: Field<Id>` and `routes: Option<Routes>` fields. An optional
/// trailing block is spliced into the `Record` impl for overrides.
macro_rules! impl_record {
    ($ty:ident, $name:literal, required: [$($req:ident),* $(,)?] $(, { $($body:tt)* })?) => {
        impl $crate::record::Record for $ty {
            const NAME: &'static str = $name;

            fn id(&self) -> Option<&str> {
                self.id.as_deref()
            }

            #[allow(unused_mut)]
            fn missing_required(&self) -> Vec<String> {
                let mut missing = Vec::new();
                $(
                    if self.$req.is_required() {
                        missing.push($crate::record::camel_case(stringify!($req)));
                    }
                )*
                missing
            }

            fn routes_slot(&self) -> Option<&$crate::routes::Routes> {
                self.routes.as_ref()
            }

            fn routes_slot_mut(&mut self) -> &mut Option<$crate::routes::Routes> {
                &mut self.routes
            }

            $($($body)*)?
        }

        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $crate::record::Record::key(self) == $crate::record::Record::key(other)
            }
        }

        impl Eq for $ty {}

        impl std::hash::Hash for $ty {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                std::hash::Hash::hash(&$crate::record::Record::key(self), state)
            }
        }
    };
}

pub(crate) use impl_record;

/// Query helpers for collections returned by relationship accessors.
pub trait Query<R: Record> {
    /// Records whose fields equal every keyword in `args`.
    fn filter_where(&self, args: &Args) -> Vec<R>;

    fn select_where<P: Fn(&R) -> bool>(&self, predicate: P) -> Vec<R>;

    /// First record matching `args`.
    fn pop_where(&self, args: &Args) -> Option<R>;

    /// Sorted copy by the given field names, compared in order.
    fn order_by(&self, keys: &[&str], descending: bool) -> Vec<R>;
}

impl<R: Record> Query<R> for [R] {
    fn filter_where(&self, args: &Args) -> Vec<R> {
        self.iter().filter(|r| matches_all(*r, args)).cloned().collect()
    }

    fn select_where<P: Fn(&R) -> bool>(&self, predicate: P) -> Vec<R> {
        self.iter().filter(|r| predicate(r)).cloned().collect()
    }

    fn pop_where(&self, args: &Args) -> Option<R> {
        self.iter().find(|r| matches_all(*r, args)).cloned()
    }

    fn order_by(&self, keys: &[&str], descending: bool) -> Vec<R> {
        let mut keyed: Vec<(FieldMap, R)> = self.iter().map(|r| (r.snapshot(), r.clone())).collect();
        keyed.sort_by(|(a, _), (b, _)| {
            let ord = keys
                .iter()
                .map(|k| compare_values(a.get(*k), b.get(*k)))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal);
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        keyed.into_iter().map(|(_, r)| r).collect()
    }
}

fn matches_all<R: Record>(record: &R, args: &Args) -> bool {
    let fields = record.snapshot();
    args.keywords()
        .iter()
        .all(|(k, v)| fields.get(k).unwrap_or(&Value::Null) == v)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
