//! Reconciles a day's scheduled bus departures with what was observed at the control posts.
//!
//! Load a schedule with [`Engine::load_file`], annotate rows with
//! [`Engine::on_field_edited`] and read back classified rows through the [`Effect`]s each
//! command returns.

pub mod clock;
pub mod decode;
pub mod deviation;
pub mod engine;
pub mod error;
pub mod export;
pub mod filter;
pub mod normalize;
pub mod past_due;
pub mod store;
pub mod ticker;
pub mod time_of_day;
pub mod types;

pub use clock::{Clock, FixedClock, ZonedClock};
pub use deviation::Deviation;
pub use engine::{Effect, Engine, Field, FilterChange, ViewRow};
pub use error::{Error, Result};
pub use store::{FileStore, MemoryStore, Store};
pub use ticker::{Tick, TokioScheduler};
pub use types::*;
