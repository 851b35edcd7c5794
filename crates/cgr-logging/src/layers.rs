//! Tracing layers for routing nodes
//!
//! [`NodeContextLayer`] stamps spans with the node context active when they
//! were opened. [`jsonl_layer`] builds the JSON formatter used for both
//! console and file output.

use tracing::{Subscriber, span};
use tracing_subscriber::fmt::format::{Format, Json, JsonFields};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::config::JsonlConfig;
use crate::context::{NodeContextData, NodeContextGuard};

/// Layer that attaches node context to new spans
#[derive(Debug, Default)]
pub struct NodeContextLayer;

impl NodeContextLayer {
    pub fn new() -> Self {
        Self
    }
}

/// Extension data stored on spans
#[derive(Debug, Clone, Copy)]
pub struct NodeContextExtension {
    pub data: NodeContextData,
}

impl<S> Layer<S> for NodeContextLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, _attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        if let Some(data) = NodeContextGuard::current() {
            span.extensions_mut().insert(NodeContextExtension { data });
        }
    }
}

/// JSONL formatting layer writing to `writer`
pub fn jsonl_layer<S, W>(
    config: &JsonlConfig,
    writer: W,
) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + 'static,
{
    fmt::layer()
        .json()
        .with_current_span(config.include_current_span)
        .with_span_list(config.include_spans)
        .flatten_event(config.flatten_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread_info)
        .with_thread_names(config.include_thread_info)
        .with_writer(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use cgr_core::NodeNbr;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    /// Records the node stamped on each span as it is entered
    struct Recorder(Arc<Mutex<Vec<Option<NodeNbr>>>>);

    impl<S> Layer<S> for Recorder
    where
        S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    {
        fn on_enter(&self, id: &span::Id, ctx: Context<'_, S>) {
            let node = ctx.span(id).and_then(|span| {
                span.extensions()
                    .get::<NodeContextExtension>()
                    .map(|ext| ext.data.node)
            });
            self.0.lock().unwrap().push(node);
        }
    }

    #[test]
    fn test_spans_carry_node_context() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriber = Registry::default()
            .with(NodeContextLayer::new())
            .with(Recorder(seen.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info_span!("unattributed").in_scope(|| {});

            let _guard = NodeContextGuard::new(NodeNbr(12));
            tracing::info_span!("route").in_scope(|| {});
        });

        assert_eq!(*seen.lock().unwrap(), vec![None, Some(NodeNbr(12))]);
    }

    #[test]
    fn test_jsonl_layer_writes_lines() {
        #[derive(Clone, Default)]
        struct Buffer(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for Buffer {
            fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(bytes);
                Ok(bytes.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = Registry::default().with(jsonl_layer(&JsonlConfig::default(), move || {
            writer.clone()
        }));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(destination = 5, "route selected");
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let line: serde_json::Value = serde_json::from_str(output.trim()).unwrap();
        assert_eq!(line["message"], "route selected");
        assert_eq!(line["destination"], 5);
    }
}
