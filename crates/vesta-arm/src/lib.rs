//! The automatic-resource-management runtime protocol: closing order and
//! suppressed-exception composition for try-with-resources.

mod exception;
mod scope;

pub use crate::exception::Exception;
pub use crate::scope::{run_finally, Resource, ResourceScope};
