//! Update handler registry

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::state::InstanceKey;

/// Future returned by an update handler
pub type HandlerFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Async update handler, called with `true` for unsolicited pushes
pub type UpdateHandler = Arc<dyn Fn(bool) -> HandlerFuture + Send + Sync>;

/// Handlers per mirrored instance, in registration order
#[derive(Default)]
pub struct CallbackRegistry {
    handlers: HashMap<InstanceKey, Vec<UpdateHandler>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, key: InstanceKey, handler: UpdateHandler) {
        self.handlers.entry(key).or_default().push(handler);
    }

    /// Handlers for `key`, cloned so they can run without holding the registry
    pub fn handlers_for(&self, key: &InstanceKey) -> Vec<UpdateHandler> {
        self.handlers.get(key).cloned().unwrap_or_default()
    }

    pub fn handler_count(&self, key: &InstanceKey) -> usize {
        self.handlers.get(key).map_or(0, Vec::len)
    }
}

/// Run `handlers` one after another
///
/// A failing handler is logged and does not stop the ones after it.
/// Returns the number of failures.
pub async fn dispatch(key: &InstanceKey, handlers: Vec<UpdateHandler>, is_push: bool) -> usize {
    let mut failures = 0;
    for handler in handlers {
        if let Err(e) = handler(is_push).await {
            warn!(
                "Update handler for {} {} failed: {:#}",
                key.host, key.object, e
            );
            failures += 1;
        }
    }
    failures
}
