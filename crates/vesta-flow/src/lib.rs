//! Flow analysis: definite assignment, reachability classification, switch
//! fall-through checking, null tracking, and try-with-resources auditing.

mod bits;
mod context;
mod diagnostics;
mod flow;
mod info;
mod resources;

pub use crate::diagnostics::{FlowConfig, FlowDiagnosticKind, SeveritySetting};
pub use crate::flow::{analyze, FlowAnalysisResult};
pub use crate::info::{FlowInfo, NullState, Reach};
pub use crate::resources::CloseObligation;
