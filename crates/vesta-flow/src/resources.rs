//! Try-with-resources bookkeeping: close obligations and close-contract
//! handler matching.

use serde::Serialize;
use vesta_hir::body::LocalId;
use vesta_hir::types::{CloseContract, ExceptionModel};
use vesta_types::Span;

/// The closing work one try-with-resources statement owes on every exit
/// path, normal or abrupt. Emitted so lowering stages can synthesize the
/// close calls without redoing the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CloseObligation {
    /// Span of the owning try statement.
    pub try_span: Span,
    /// The resource locals in the order their close() calls run, which is
    /// the reverse of declaration order.
    pub resources: Vec<LocalId>,
}

/// Exception types this close() declares that no surrounding handler covers.
///
/// `handlers` holds every type that could absorb the exception: catch-clause
/// types of the enclosing try statements plus the method's declared throws.
/// The result keeps the contract's declaration order so diagnostics come out
/// in the order the programmer wrote.
pub(crate) fn unhandled_close_exceptions<'a>(
    contract: &'a CloseContract,
    handlers: &[&str],
    model: &ExceptionModel,
) -> Vec<&'a str> {
    contract
        .throws
        .iter()
        .map(String::as_str)
        .filter(|exc| !handlers.iter().any(|handler| model.is_subtype(exc, handler)))
        .collect()
}
