//! Test support: tracing setup and node fixtures.

use std::env;
use std::sync::Once;

use chrono::{TimeZone, Utc};
use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{MindmapId, Node, NodeId};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Node of mindmap 1 at the origin, with a fixed creation time.
///
/// `order_index` defaults to the id so siblings keep insertion order.
pub fn node(id: i64, parent: Option<i64>) -> Node {
    node_in(MindmapId(1), id, parent, id)
}

/// Fully specified fixture node.
pub fn node_in(mindmap_id: MindmapId, id: i64, parent: Option<i64>, order_index: i64) -> Node {
    Node {
        id: NodeId(id),
        mindmap_id,
        parent_id: parent.map(NodeId),
        title: format!("node {id}"),
        content: None,
        order_index,
        x_position: 0.0,
        y_position: 0.0,
        created_at: Utc.timestamp_opt(1_700_000_000, 0).single().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_test_setup() {
        init_test_setup();
    }

    #[test]
    fn given_fixture_when_building_node_then_parent_is_mapped() {
        let n = node(2, Some(1));
        assert_eq!(n.parent_id, Some(NodeId(1)));
        assert_eq!(n.order_index, 2);
        assert!(!n.is_root());
    }
}
