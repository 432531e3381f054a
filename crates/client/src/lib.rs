//! Consumer-side mirror of the node-group API.
//!
//! [`GroupsApi`] speaks the HTTP contract, [`GroupCache`] keeps the local
//! copy with staged edits held apart from the authoritative list, and
//! [`GroupClient`] ties the two together.

pub mod cache;
pub mod errors;
pub mod http;

mod client;

pub use cache::{GroupCache, PendingChange};
pub use client::GroupClient;
pub use errors::ClientError;
pub use http::GroupsApi;
