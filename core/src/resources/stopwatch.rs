//! Card stopwatch: the stored value and a mutable view over a card.
//!
//! # Design
//! Planka keeps the stopwatch as `{startedAt, total}` inside the card. A
//! running stopwatch has a start time and its total excludes the current
//! run. Every change goes through the card's `editor`, so the card is
//! refreshed first and pushed exactly once.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::Card;
use crate::error::{ApiError, Result};
use crate::field::Field;
use crate::record::Record;

/// Raw `stopwatch` storage on a card. `total` is whole seconds accumulated
/// by previous runs; a running stopwatch also has `startedAt`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StopwatchValue {
    pub started_at: Option<String>,
    pub total: i64,
}

impl StopwatchValue {
    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn start_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.started_at
            .as_deref()
            .map(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|t| t.with_timezone(&Utc))
                    .map_err(|e| ApiError::DeserializationError(format!("stopwatch startedAt {s:?}: {e}")))
            })
            .transpose()
    }
}

/// Stopwatch view borrowed from its card.
pub struct Stopwatch<'a> {
    card: &'a mut Card,
}

impl<'a> Stopwatch<'a> {
    pub(crate) fn new(card: &'a mut Card) -> Self {
        Self { card }
    }

    /// Current value as last seen on the card; zeroed when the card has none.
    pub fn value(&self) -> StopwatchValue {
        self.card.stopwatch.cloned().unwrap_or_default()
    }

    pub fn total(&self) -> i64 {
        self.value().total
    }

    pub fn is_running(&self) -> bool {
        self.value().is_running()
    }

    pub fn refresh(&mut self) -> Result<StopwatchValue> {
        self.card.refresh()?;
        Ok(self.value())
    }

    pub fn start_time(&mut self) -> Result<Option<DateTime<Utc>>> {
        self.refresh()?.start_time()
    }

    /// No-op when already running.
    pub fn start(&mut self) -> Result<()> {
        let mut value = self.refresh()?;
        if value.is_running() {
            return Ok(());
        }
        value.started_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
        self.store(value)
    }

    /// Fold the running time into `total`. No-op when stopped.
    pub fn stop(&mut self) -> Result<()> {
        let mut value = self.refresh()?;
        let Some(started) = value.start_time()? else {
            return Ok(());
        };
        value.total += (Utc::now() - started).num_seconds().max(0);
        value.started_at = None;
        self.store(value)
    }

    /// Overwrite the accumulated total.
    pub fn set(&mut self, hours: i64, minutes: i64, seconds: i64) -> Result<()> {
        let mut value = self.value();
        value.total = hours * 3600 + minutes * 60 + seconds;
        self.store(value)
    }

    /// Remove the stopwatch from the card.
    pub fn delete(self) -> Result<()> {
        self.card.remove_stopwatch()
    }

    fn store(&mut self, value: StopwatchValue) -> Result<()> {
        self.card.editor(|card| {
            card.stopwatch = Field::Value(value);
            Ok(())
        })
    }
}
