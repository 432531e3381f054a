//! Service layer providing the group-list business core on top of the
//! key-value storage boundary.
//! - Separates business rules from storage access.
//! - Reuses the wire model in the `common` crate.
//! - Provides clear error types and documented interfaces.

pub mod errors;
pub mod groups;
pub mod storage;
