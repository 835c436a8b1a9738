//! In-memory tables of JSON records keyed by numeric id.

use std::collections::{BTreeMap, HashMap};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type Fields = Map<String, Value>;

pub const DEMO_USER_ID: &str = "1";
pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "demo";

pub struct Store {
    tables: HashMap<&'static str, BTreeMap<u64, Fields>>,
    next_id: u64,
    passwords: HashMap<String, String>,
    tokens: HashMap<String, String>,
    files: HashMap<String, Vec<u8>>,
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Store {
    /// Empty store with one admin account, `demo`/`demo`.
    pub fn seeded() -> Self {
        let mut store = Self {
            tables: HashMap::new(),
            next_id: 1000,
            passwords: HashMap::new(),
            tokens: HashMap::new(),
            files: HashMap::new(),
        };
        let mut demo = Fields::new();
        demo.insert("id".into(), Value::String(DEMO_USER_ID.into()));
        demo.insert("name".into(), Value::String("Demo Demo".into()));
        demo.insert("username".into(), Value::String(DEMO_USERNAME.into()));
        demo.insert("email".into(), Value::String("demo@demo.demo".into()));
        demo.insert("isAdmin".into(), Value::Bool(true));
        demo.insert("createdAt".into(), Value::String(now()));
        store.tables.entry("users").or_default().insert(1, demo);
        store.passwords.insert(DEMO_USER_ID.into(), DEMO_PASSWORD.into());
        store
    }

    pub fn insert(&mut self, table: &'static str, mut fields: Fields) -> Value {
        self.next_id += 1;
        let id = self.next_id;
        fields.insert("id".into(), Value::String(id.to_string()));
        fields.insert("createdAt".into(), Value::String(now()));
        fields.insert("updatedAt".into(), Value::Null);
        self.tables.entry(table).or_default().insert(id, fields.clone());
        Value::Object(fields)
    }

    pub fn get(&self, table: &str, id: &str) -> Option<Value> {
        let key = id.parse::<u64>().ok()?;
        self.tables.get(table)?.get(&key).cloned().map(Value::Object)
    }

    /// Merge `fields` into the record; `id` and `createdAt` are kept.
    pub fn patch(&mut self, table: &str, id: &str, fields: Fields) -> Option<Value> {
        let key = id.parse::<u64>().ok()?;
        let record = self.tables.get_mut(table)?.get_mut(&key)?;
        for (k, v) in fields {
            if k != "id" && k != "createdAt" {
                record.insert(k, v);
            }
        }
        record.insert("updatedAt".into(), Value::String(now()));
        Some(Value::Object(record.clone()))
    }

    pub fn remove(&mut self, table: &str, id: &str) -> Option<Value> {
        let key = id.parse::<u64>().ok()?;
        self.tables.get_mut(table)?.remove(&key).map(Value::Object)
    }

    pub fn all(&self, table: &str) -> Vec<Value> {
        self.tables
            .get(table)
            .map(|t| t.values().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    /// Records whose `key` equals the string `value`.
    pub fn filter(&self, table: &str, key: &str, value: &str) -> Vec<Value> {
        self.all(table)
            .into_iter()
            .filter(|r| r.get(key).and_then(Value::as_str) == Some(value))
            .collect()
    }

    /// Records whose `key` is any of `values`.
    pub fn filter_in(&self, table: &str, key: &str, values: &[String]) -> Vec<Value> {
        self.all(table)
            .into_iter()
            .filter(|r| {
                r.get(key)
                    .and_then(Value::as_str)
                    .is_some_and(|v| values.iter().any(|x| x == v))
            })
            .collect()
    }

    pub fn remove_where(&mut self, table: &str, key: &str, value: &str) -> Vec<Value> {
        let Some(rows) = self.tables.get_mut(table) else {
            return Vec::new();
        };
        let doomed: Vec<u64> = rows
            .iter()
            .filter(|(_, r)| r.get(key).and_then(Value::as_str) == Some(value))
            .map(|(id, _)| *id)
            .collect();
        doomed
            .into_iter()
            .filter_map(|id| rows.remove(&id).map(Value::Object))
            .collect()
    }

    pub fn set_password(&mut self, user_id: &str, password: &str) {
        self.passwords.insert(user_id.to_string(), password.to_string());
    }

    pub fn check_password(&self, user_id: &str, password: &str) -> bool {
        self.passwords.get(user_id).is_some_and(|p| p == password)
    }

    /// Find a user by username or email.
    pub fn find_login(&self, email_or_username: &str) -> Option<String> {
        self.all("users").into_iter().find_map(|u| {
            let matches = u.get("username").and_then(Value::as_str) == Some(email_or_username)
                || u.get("email").and_then(Value::as_str) == Some(email_or_username);
            if matches {
                u.get("id").and_then(Value::as_str).map(str::to_string)
            } else {
                None
            }
        })
    }

    pub fn issue_token(&mut self, user_id: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.tokens.insert(token.clone(), user_id.to_string());
        token
    }

    pub fn user_for_token(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }

    pub fn revoke_token(&mut self, token: &str) -> bool {
        self.tokens.remove(token).is_some()
    }

    pub fn store_file(&mut self, id: &str, bytes: Vec<u8>) {
        self.files.insert(id.to_string(), bytes);
    }

    pub fn file(&self, id: &str) -> Option<Vec<u8>> {
        self.files.get(id).cloned()
    }
}

/// Id of a record as a string.
pub fn id_of(record: &Value) -> String {
    record.get("id").and_then(Value::as_str).unwrap_or_default().to_string()
}
