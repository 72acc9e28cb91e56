use std::fmt;

/// Finalizer configuration.
pub struct FinishOptions<'a> {
    include_diagnostics: Box<dyn FnOnce() -> bool + 'a>,
}

impl Default for FinishOptions<'_> {
    fn default() -> Self {
        Self {
            include_diagnostics: Box::new(|| false),
        }
    }
}

impl fmt::Debug for FinishOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinishOptions").finish_non_exhaustive()
    }
}

impl<'a> FinishOptions<'a> {
    /// Decides whether low-level diagnostic data is attached to invocation annotations.
    ///
    /// Called once, when finishing starts, since the answer may depend on state that only
    /// settles at shutdown.
    pub fn with_diagnostics(mut self, predicate: impl FnOnce() -> bool + 'a) -> Self {
        self.include_diagnostics = Box::new(predicate);
        self
    }

    pub(crate) fn resolve_diagnostics(&mut self) -> bool {
        let predicate = std::mem::replace(&mut self.include_diagnostics, Box::new(|| false));
        predicate()
    }
}
