// src/local.rs
//! Owned transient host references.

use crate::host::HostRuntime;

/// A transient reference released exactly once when the guard drops, on the
/// success path and on every early return alike.
pub struct LocalRef<'h, H: HostRuntime> {
    host: &'h H,
    inner: Option<H::Local>,
}

impl<'h, H: HostRuntime> LocalRef<'h, H> {
    pub fn new(host: &'h H, local: H::Local) -> Self {
        Self {
            host,
            inner: Some(local),
        }
    }

    pub fn as_local(&self) -> &H::Local {
        // only `drop` takes the reference out
        match &self.inner {
            Some(local) => local,
            None => unreachable!("LocalRef used after release"),
        }
    }

    pub fn is_null(&self) -> bool {
        self.host.is_null(self.as_local())
    }
}

impl<H: HostRuntime> Drop for LocalRef<'_, H> {
    fn drop(&mut self) {
        if let Some(local) = self.inner.take() {
            self.host.delete_local(local);
        }
    }
}
