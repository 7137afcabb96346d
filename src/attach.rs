// src/attach.rs
//! Thread attachment as a scoped resource.
//!
//! The first [`AttachScope`] entered on a thread attaches it to the host and
//! leaves a thread-local record behind; dropping that record when the thread
//! exits detaches it again. Later scopes on the same thread only consult the
//! record, so attaching is idempotent and never duplicated.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::BridgeResult;
use crate::host::{Attach, HostRuntime};

struct ThreadAttachment {
    host_key: usize,
    detach: Box<dyn Fn()>,
}

impl Drop for ThreadAttachment {
    fn drop(&mut self) {
        (self.detach)();
    }
}

thread_local! {
    static ATTACHMENTS: RefCell<Vec<ThreadAttachment>> = const { RefCell::new(Vec::new()) };
}

fn host_key<H: HostRuntime>(host: &Arc<H>) -> usize {
    Arc::as_ptr(host) as *const () as usize
}

/// Proof that the current thread is attached to one host for as long as the
/// scope lives. Not `Send`: attachment is per thread.
pub struct AttachScope<'h, H: HostRuntime> {
    host: &'h H,
    _not_send: PhantomData<*const ()>,
}

impl<'h, H: HostRuntime> AttachScope<'h, H> {
    pub fn enter(host: &'h Arc<H>) -> BridgeResult<Self> {
        let key = host_key(host);
        let known = ATTACHMENTS.with(|a| a.borrow().iter().any(|t| t.host_key == key));
        if !known {
            match host.attach_current_thread()? {
                Attach::New => {
                    tracing::debug!(thread = ?std::thread::current().id(), "attached thread to host runtime");
                    let owner = Arc::clone(host);
                    ATTACHMENTS.with(|a| {
                        a.borrow_mut().push(ThreadAttachment {
                            host_key: key,
                            detach: Box::new(move || owner.detach_current_thread()),
                        })
                    });
                }
                // Attached by someone else (e.g. a host thread calling in);
                // whoever attached it detaches it.
                Attach::Existing => {}
            }
        }
        Ok(Self {
            host: host.as_ref(),
            _not_send: PhantomData,
        })
    }

    pub fn host(&self) -> &'h H {
        self.host
    }
}

/// Whether this thread holds an attachment made by the bridge for `host`.
pub fn is_attached<H: HostRuntime>(host: &Arc<H>) -> bool {
    let key = host_key(host);
    ATTACHMENTS.with(|a| a.borrow().iter().any(|t| t.host_key == key))
}
