//! Blocking client for the Planka kanban REST API.
//!
//! # Overview
//! A [`Planka`] session authenticates once, then hands out typed records
//! (projects, boards, lists, cards, ...) bound to that session. Records
//! follow their relationships on demand, always fetching fresh data, and
//! push changes back with `update`, `editor` or the resource-specific
//! helpers.
//!
//! # Design
//! - All I/O goes through the [`Transport`] trait, which executes one plain
//!   [`HttpRequest`] and returns one [`HttpResponse`]. The ureq-backed
//!   transport is the default; tests substitute an in-memory one.
//! - Record fields are [`Field`]s, which tell "never loaded" apart from
//!   "explicitly null" and from "must be supplied before sending".
//! - Create and update calls accept the same shapes: positional values,
//!   keywords, a whole record, or nothing. See [`args!`] and [`Args`].
//!
//! ```no_run
//! use planka_core::prelude::*;
//!
//! # fn main() -> planka_core::Result<()> {
//! let planka = Planka::new("http://localhost:3000", &PasswordAuth::new("demo", "demo"))?;
//! let project = planka.create_project(args!("Roadmap"))?;
//! let board = project.create_board(args!("Q3"))?;
//! let todo = board.create_list(args!("Todo"))?;
//! let mut card = todo.create_card(args!("Write release notes"))?;
//! card.editor(|c| {
//!     c.description.set("Cover the new sorting options");
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod compat;
pub mod config;
pub mod constants;
pub mod error;
pub mod field;
pub mod http;
pub mod overload;
pub mod position;
pub mod record;
pub mod resources;
pub mod routes;
#[cfg(feature = "ureq")]
pub mod transport;

#[cfg(test)]
mod testing;

pub use auth::{Auth, PasswordAuth, TokenAuth};
pub use client::Planka;
pub use config::Config;
pub use constants::ListSort;
pub use error::{ApiError, Result};
pub use field::Field;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use overload::Args;
pub use record::{Query, Record};
pub use resources::{
    Action, Archive, Attachment, Background, Board, BoardMembership, Card, CardLabel, CardMembership,
    CardSubscription, IdentityProviderUser, Label, List, Notification, Project, ProjectManager, Stopwatch,
    StopwatchValue, Task, User,
};
pub use routes::Routes;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;

/// Everything needed for typical scripts.
pub mod prelude {
    pub use crate::args;
    pub use crate::{
        Args, Auth, Board, Card, Config, Field, Label, List, ListSort, PasswordAuth, Planka, Project, Query,
        Record, TokenAuth, User,
    };
}
