//! Post-processing hooks registered by views during a request

use crate::Reply;
use std::fmt;

/// A response transform run once the outermost view has returned.
///
/// The hook may edit the reply in place and return `None`, or return a
/// replacement which the next hook then receives. Out-of-band fragments
/// still pending on a replaced reply move to its replacement, ahead of the
/// replacement's own.
pub type ResponseHook = Box<dyn FnOnce(&mut Reply) -> Option<Reply> + Send>;

/// Registration-ordered queue of [`ResponseHook`]s for one request
#[derive(Default)]
pub struct HookChain {
    hooks: Vec<ResponseHook>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: ResponseHook) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every registered hook once, in registration order, leaving the
    /// chain empty
    pub fn drain(&mut self, mut reply: Reply) -> Reply {
        let hooks = std::mem::take(&mut self.hooks);
        tracing::debug!(count = hooks.len(), "Draining response hooks");
        for hook in hooks {
            if let Some(mut replacement) = hook(&mut reply) {
                let mut pending = reply.take_oob();
                pending.extend(replacement.take_oob());
                replacement.queue_oob(pending);
                reply = replacement;
            }
        }
        reply
    }

    pub fn clear(&mut self) {
        self.hooks.clear();
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
