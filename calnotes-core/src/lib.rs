//! Core types for calnotes.
//!
//! This crate holds everything that does not depend on HTTP:
//! - `model` for users, notes, and sessions
//! - `date` and `grid` for month arithmetic and the calendar grid
//! - `defaults` for the built-in holiday table
//! - `credentials` for registration, login, and password hashing
//! - `store` for the SQLite-backed persistence layer

pub mod credentials;
pub mod date;
pub mod defaults;
pub mod error;
pub mod grid;
pub mod model;
pub mod store;

pub use credentials::{Hasher, HasherConfig, authenticate, register};
pub use date::{YearMonth, format_date, parse_date};
pub use defaults::DefaultEvents;
pub use error::{CalNotesError, CalNotesResult};
pub use grid::{DayCell, MonthGrid, MonthInfo, build_month_grid};
pub use model::{Note, NoteId, Session, SessionPolicy, User, UserId};
pub use store::{Store, StoreStats};
