//! Storage abstractions for the service layer
//!
//! The `KvStore` trait is the backend boundary; `JsonFileKv` is the
//! file-backed adapter used outside tests.

pub mod json_file_kv;
pub mod kv;
