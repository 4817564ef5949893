//! Scope guard over the sources an operation opens.
//!
//! Every source stream an operation opens is registered here. Closing the
//! `Closer` releases all of them in reverse order of registration, keeps
//! going when one fails, and reports the first failure with the others
//! suppressed onto it. Dropping an unclosed `Closer` releases them too.

use vtlset_core::prelude::{Error, Result};

use crate::stream::{CloseHook, DataStream, Rows};

#[derive(Default)]
pub struct Closer {
    resources: Vec<(String, CloseHook)>,
}

impl Closer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of the stream's close hook and hand back its rows.
    pub fn register(&mut self, name: impl Into<String>, stream: DataStream) -> Rows {
        let (rows, hook) = stream.into_parts();
        if let Some(hook) = hook {
            self.resources.push((name.into(), hook));
        }
        rows
    }

    pub fn register_hook(
        &mut self,
        name: impl Into<String>,
        hook: impl FnOnce() -> Result<()> + 'static,
    ) {
        self.resources.push((name.into(), Box::new(hook)));
    }

    /// Number of registered resources not yet released.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Release everything, most recently registered first.
    pub fn close(&mut self) -> Result<()> {
        let mut failure: Option<Error> = None;
        while let Some((_name, hook)) = self.resources.pop() {
            match hook() {
                Ok(()) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(source = %_name, "closed source");
                }
                Err(e) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(source = %_name, error = %e, "source failed to close");
                    failure = Some(match failure {
                        None => e,
                        Some(primary) => primary.suppress_all(e),
                    });
                }
            }
        }
        match failure {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }

    /// Release everything after `primary` aborted the operation. Close
    /// failures are suppressed onto `primary`.
    pub fn close_with(&mut self, primary: Error) -> Error {
        match self.close() {
            Ok(()) => primary,
            Err(e) => primary.suppress_all(e),
        }
    }
}

impl Drop for Closer {
    fn drop(&mut self) {
        if self.resources.is_empty() {
            return;
        }
        if let Err(_e) = self.close() {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_e, "failed to release sources of a dropped closer");
        }
    }
}
