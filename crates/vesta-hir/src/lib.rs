//! Method-body intermediate representation for Vesta.
//!
//! The front-end lowers one method or initializer at a time into a [`body::Body`]:
//! arena-allocated statements, expressions, and local-variable slots addressed
//! by dense ids. `vesta-flow` consumes this IR; nothing here depends on syntax
//! trees, so analyses can be tested by building bodies directly.

/// Flow-oriented method-body IR consumed by `vesta-flow`.
pub mod body;

/// Type references, close contracts, and the checked-exception model.
pub mod types;
