//! Transaction-scoped persistence context for satchel.
//!
//! A [`Session`] intercepts record creation, lookup, and mutation, and
//! defers store writes until an explicit or implicit flush point. Three
//! components cooperate under the session's orchestration:
//!
//! - the [`identity`] map: at most one live managed instance per
//!   `(kind, key)`, so repeated finds inside one transaction return the
//!   same instance and never re-query the store;
//! - the [`queue`]: the write-behind buffer of pending inserts, updates,
//!   and deletes, drained in program order at flush;
//! - the [`dirty`] checker: snapshot comparison at flush time that turns
//!   in-memory field mutations into implicit updates.
//!
//! The session consumes any [`satchel_store::StoreAdapter`]; it never
//! touches storage directly.

pub mod dirty;
pub mod error;
pub mod identity;
pub mod queue;
pub mod session;

// Re-export key types for ergonomic use.
pub use error::SessionError;
pub use identity::{IdentityMap, RecordHandle};
pub use queue::{ChangeQueue, PendingWrite};
pub use session::Session;
