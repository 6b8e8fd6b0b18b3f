use thiserror::Error;

/// A thrown exception value: class, message, and the secondary exceptions
/// attached to it by the resource-closing protocol.
///
/// Suppressed exceptions are ordered; the order is the order in which the
/// protocol attached them, which follows closing order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{class}: {message}")]
pub struct Exception {
    pub class: String,
    pub message: String,
    suppressed: Vec<Exception>,
}

impl Exception {
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
            suppressed: Vec::new(),
        }
    }

    /// Attach a secondary exception. Attachment order is preserved.
    pub fn add_suppressed(&mut self, suppressed: Exception) {
        self.suppressed.push(suppressed);
    }

    pub fn suppressed(&self) -> &[Exception] {
        &self.suppressed
    }
}
