//! Per-server session state

use std::sync::atomic::{AtomicBool, Ordering};

use crate::{Error, Result};

/// Whether `get_initial_context` has run for this server.
///
/// Each server owns its own session, so two servers in one process never
/// see each other's state.
#[derive(Debug, Default)]
pub struct Session {
    context_loaded: AtomicBool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_context_loaded(&self) {
        self.context_loaded.store(true, Ordering::SeqCst);
    }

    pub fn is_context_loaded(&self) -> bool {
        self.context_loaded.load(Ordering::SeqCst)
    }

    /// Fail with [`Error::ContextNotLoaded`] until the context is loaded
    pub fn require_context(&self) -> Result<()> {
        if self.is_context_loaded() {
            Ok(())
        } else {
            Err(Error::ContextNotLoaded)
        }
    }
}
