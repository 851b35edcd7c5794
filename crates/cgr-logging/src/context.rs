//! Node context for multi-node logging
//!
//! Simulations often run several routing nodes in one process. This module
//! keeps the local node number in thread-local storage so every span opened
//! while a [`NodeContextGuard`] is alive can be attributed to that node.

use std::cell::RefCell;

use cgr_core::NodeNbr;
use uuid::Uuid;

/// Node context data stored in thread-local storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeContextData {
    /// Node whose routing decisions are being logged
    pub node: NodeNbr,
    /// Unique ID for this node's session
    pub instance_id: Uuid,
}

thread_local! {
    static NODE_CONTEXT: RefCell<Option<NodeContextData>> = const { RefCell::new(None) };
}

/// RAII guard for node context
///
/// Sets the node context for the current thread and restores the previous
/// one, if any, when dropped.
///
/// # Example
///
/// ```ignore
/// use cgr_core::NodeNbr;
/// use cgr_logging::NodeContextGuard;
///
/// let _guard = NodeContextGuard::new(NodeNbr(7));
/// tracing::info!("Routing bundle");
/// ```
pub struct NodeContextGuard {
    previous: Option<NodeContextData>,
}

impl NodeContextGuard {
    /// Attribute the current scope to `node` with a fresh instance ID
    pub fn new(node: NodeNbr) -> Self {
        Self::with_instance_id(node, Uuid::new_v4())
    }

    /// Attribute the current scope to `node` with a known instance ID
    ///
    /// Useful when the same node should keep one ID across restarts.
    pub fn with_instance_id(node: NodeNbr, instance_id: Uuid) -> Self {
        let previous = NODE_CONTEXT.with(|ctx| {
            ctx.borrow_mut()
                .replace(NodeContextData { node, instance_id })
        });
        Self { previous }
    }

    /// Get the current node context (if any)
    pub fn current() -> Option<NodeContextData> {
        NODE_CONTEXT.with(|ctx| *ctx.borrow())
    }

    /// Get the current node number (if set)
    pub fn current_node() -> Option<NodeNbr> {
        Self::current().map(|ctx| ctx.node)
    }
}

impl Drop for NodeContextGuard {
    fn drop(&mut self) {
        NODE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Run a block with the node context set
///
/// # Example
///
/// ```ignore
/// with_node_context!(NodeNbr(7), {
///     tracing::info!("Routing bundle");
/// });
/// ```
#[macro_export]
macro_rules! with_node_context {
    ($node:expr, $body:block) => {{
        let _guard = $crate::context::NodeContextGuard::new($node);
        $body
    }};
}
