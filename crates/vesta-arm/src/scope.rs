use crate::exception::Exception;

/// A value participating in automatic resource management: something with a
/// fallible no-arg `close()`.
pub trait Resource {
    fn close(&mut self) -> Result<(), Exception>;
}

/// The per-try closing protocol.
///
/// Resources acquire left to right and close in strict reverse order on
/// every exit of the body. Exception composition is first-error-wins: the
/// exception already propagating stays primary, and later close errors are
/// attached to its suppressed list in closing order.
pub struct ResourceScope<R> {
    open: Vec<R>,
}

impl<R> ResourceScope<R> {
    pub fn new() -> Self {
        Self { open: Vec::new() }
    }
}

impl<R> Default for ResourceScope<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Resource> ResourceScope<R> {
    /// Initialize the next resource. If the initializer throws, every
    /// already-open resource closes in reverse order first, suppressing its
    /// close errors onto the initializer's exception; the failed resource
    /// itself never opens.
    pub fn acquire(
        &mut self,
        init: impl FnOnce() -> Result<R, Exception>,
    ) -> Result<(), Exception> {
        match init() {
            Ok(resource) => {
                self.open.push(resource);
                Ok(())
            }
            Err(primary) => Err(self.unwind_onto(primary)),
        }
    }

    /// Run the body over the open resources, then close them all.
    pub fn run<T>(
        mut self,
        body: impl FnOnce(&mut [R]) -> Result<T, Exception>,
    ) -> Result<T, Exception> {
        let outcome = body(&mut self.open);
        self.complete(outcome)
    }

    /// Close every open resource in reverse order and fold the close errors
    /// into the body's outcome. After a normal outcome the first close error
    /// becomes the primary exception and later ones are suppressed onto it;
    /// after an abrupt outcome its exception stays primary and every close
    /// error is suppressed onto that.
    pub fn complete<T>(mut self, outcome: Result<T, Exception>) -> Result<T, Exception> {
        match outcome {
            Ok(value) => {
                let mut primary: Option<Exception> = None;
                while let Some(mut resource) = self.open.pop() {
                    if let Err(err) = resource.close() {
                        match primary.as_mut() {
                            None => primary = Some(err),
                            Some(p) => p.add_suppressed(err),
                        }
                    }
                }
                match primary {
                    None => Ok(value),
                    Some(primary) => Err(primary),
                }
            }
            Err(primary) => Err(self.unwind_onto(primary)),
        }
    }

    fn unwind_onto(&mut self, mut primary: Exception) -> Exception {
        while let Some(mut resource) = self.open.pop() {
            if let Err(err) = resource.close() {
                primary.add_suppressed(err);
            }
        }
        primary
    }
}

/// Apply a finally step to an outcome. A finally that completes abruptly
/// replaces the outcome entirely: its exception propagates alone and the
/// in-flight primary, suppressed list included, is discarded.
pub fn run_finally<T>(
    outcome: Result<T, Exception>,
    finally: impl FnOnce() -> Result<(), Exception>,
) -> Result<T, Exception> {
    match finally() {
        Ok(()) => outcome,
        Err(replacement) => Err(replacement),
    }
}
