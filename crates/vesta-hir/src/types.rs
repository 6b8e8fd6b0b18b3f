//! Resolved type information the flow engine consumes.
//!
//! Name and type resolution happen upstream; by the time a body reaches the
//! analyzer every declared type is a [`TypeRef`] carrying whatever the
//! analyzer needs to know about it, and exception subtyping questions are
//! answered by an [`ExceptionModel`] the host fills in from its class model.

use std::collections::HashMap;

/// A resolved reference to a declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    /// Fully qualified binary name, e.g. `java.io.InputStream`.
    pub name: String,
    /// The no-arg close-contract method, when the type has one.
    pub close: Option<CloseContract>,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            close: None,
        }
    }

    /// A type usable in a try-with-resources header: it exposes a no-arg
    /// `close()` declaring the given checked exceptions, in throws-clause
    /// order.
    pub fn closeable<I, S>(name: impl Into<String>, throws: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            close: Some(CloseContract {
                throws: throws.into_iter().map(Into::into).collect(),
            }),
        }
    }

    #[must_use]
    pub fn is_closeable(&self) -> bool {
        self.close.is_some()
    }
}

/// The `close()` method surface of an auto-closeable type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseContract {
    /// Checked exception types declared by `close()`, in declaration order.
    /// Declaration order is preserved because diagnostics report in it.
    pub throws: Vec<String>,
}

/// A compile-time-constant value attached to an expression by upstream
/// constant folding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Const {
    Bool(bool),
    Int(i64),
}

/// Minimal exception-supertype oracle.
///
/// Answers "is `sub` a subtype of `sup`" for exception types, which is all
/// the flow engine needs to match thrown types against catch clauses and
/// `throws` declarations. Reflexive by definition; transitive through the
/// recorded direct-supertype edges.
#[derive(Debug, Clone, Default)]
pub struct ExceptionModel {
    supertype: HashMap<String, String>,
}

impl ExceptionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subtype(&mut self, sub: impl Into<String>, sup: impl Into<String>) {
        self.supertype.insert(sub.into(), sup.into());
    }

    #[must_use]
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        let mut current = sub;
        // The chain cannot be longer than the number of recorded edges.
        for _ in 0..=self.supertype.len() {
            if current == sup {
                return true;
            }
            match self.supertype.get(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }
}
