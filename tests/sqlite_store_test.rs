//! End-to-end tests over a SQLite database file.

use std::path::Path;

use mindlayout::application::services::CreateNode;
use mindlayout::application::ApplicationError;
use mindlayout::config::Settings;
use mindlayout::domain::{LayoutMap, MindmapId, Node, NodeChanges, NodeId, Position};
use mindlayout::infrastructure::traits::NodeStore;
use mindlayout::infrastructure::{ServiceContainer, SqliteNodeStore};
use mindlayout::util::testing::init_test_setup;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const MAP: MindmapId = MindmapId(7);

struct Db {
    _dir: TempDir,
    settings: Settings,
}

impl Db {
    fn container(&self) -> ServiceContainer {
        ServiceContainer::new(self.settings.clone()).expect("open database")
    }

    fn stored(&self) -> Vec<Node> {
        let store = SqliteNodeStore::open(&self.settings.database_path, self.settings.busy_timeout())
            .unwrap();
        let mut tx = store.begin().unwrap();
        tx.fetch_nodes(MAP).unwrap()
    }

    fn positions(&self) -> LayoutMap {
        self.stored().into_iter().map(|n| (n.id, n.position())).collect()
    }
}

#[fixture]
fn db() -> Db {
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        database_path: dir.path().join("nested").join("maps.sqlite3"),
        ..Settings::default()
    };
    Db {
        _dir: dir,
        settings,
    }
}

fn add(container: &ServiceContainer, parent: Option<NodeId>, title: &str) -> Node {
    container
        .nodes
        .create_node(CreateNode {
            mindmap_id: MAP,
            parent_id: parent,
            title: title.to_string(),
            content: Some(format!("{title} notes")),
        })
        .unwrap()
}

#[rstest]
fn given_fresh_path_when_opening_then_parent_directories_are_created(db: Db) {
    db.container();
    assert!(Path::new(&db.settings.database_path).exists());
}

#[rstest]
fn given_created_nodes_when_reopening_then_positions_persist(db: Db) {
    // Arrange
    let root = {
        let container = db.container();
        let root = add(&container, None, "root");
        let a = add(&container, Some(root.id), "a");
        add(&container, Some(root.id), "b");
        add(&container, Some(a.id), "a1");
        root
    };

    // Act
    let reopened = db.container();
    let preview = reopened.layout.preview_layout(MAP).unwrap();

    // Assert
    let stored = db.stored();
    assert_eq!(stored.len(), 4);
    assert_eq!(stored[0].id, root.id);
    assert_eq!(stored[0].content.as_deref(), Some("root notes"));
    assert_eq!(db.positions(), preview);
    assert_eq!(db.positions()[&root.id], Position::ORIGIN);
}

#[rstest]
fn given_subtree_when_deleting_then_cascade_removes_descendants(db: Db) {
    let container = db.container();
    let root = add(&container, None, "root");
    let a = add(&container, Some(root.id), "a");
    let a1 = add(&container, Some(a.id), "a1");
    add(&container, Some(a1.id), "a1x");
    let b = add(&container, Some(root.id), "b");

    let summary = container.nodes.delete_node(a.id).unwrap();

    assert_eq!(summary.removed, 3);
    let ids: Vec<NodeId> = db.stored().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![root.id, b.id]);
    assert_eq!(db.positions(), container.layout.preview_layout(MAP).unwrap());
}

#[rstest]
fn given_node_when_moving_then_parent_and_positions_are_stored(db: Db) {
    let container = db.container();
    let root = add(&container, None, "root");
    let a = add(&container, Some(root.id), "a");
    let b = add(&container, Some(root.id), "b");

    let moved = container.nodes.move_node(b.id, a.id).unwrap();

    let stored_b = db.stored().into_iter().find(|n| n.id == b.id).unwrap();
    assert_eq!(stored_b.parent_id, Some(a.id));
    assert_eq!(stored_b.order_index, 0);
    assert_eq!(stored_b.position(), moved.position());
}

#[rstest]
fn given_reorder_when_committed_then_order_and_positions_persist(db: Db) {
    let container = db.container();
    let root = add(&container, None, "root");
    let a = add(&container, Some(root.id), "a");
    let b = add(&container, Some(root.id), "b");

    container
        .nodes
        .update_node(
            a.id,
            NodeChanges {
                order_index: Some(5),
                ..NodeChanges::default()
            },
        )
        .unwrap();

    let stored = db.stored();
    assert_eq!(stored[1].order_index, 5);
    assert_eq!(stored[1].title, "a");
    assert_eq!(stored[1].position(), b.position());
    assert_eq!(db.positions(), container.layout.preview_layout(MAP).unwrap());
}

#[rstest]
fn given_move_under_descendant_when_rejected_then_database_unchanged(db: Db) {
    let container = db.container();
    let root = add(&container, None, "root");
    let a = add(&container, Some(root.id), "a");
    let a1 = add(&container, Some(a.id), "a1");
    let before = db.stored();

    let err = container.nodes.move_node(a.id, a1.id).unwrap_err();

    assert!(matches!(err, ApplicationError::InvalidParent { .. }));
    assert_eq!(db.stored(), before);
}

#[rstest]
fn given_uncommitted_transaction_when_dropped_then_rolled_back(db: Db) {
    let container = db.container();
    let root = add(&container, None, "root");

    {
        let mut tx = container.store.begin().unwrap();
        tx.delete_subtree(root.id).unwrap();
        assert!(tx.fetch_nodes(MAP).unwrap().is_empty());
    }

    assert_eq!(db.stored().len(), 1);
}

#[rstest]
fn given_stale_positions_when_recomputing_then_layout_is_rewritten(db: Db) {
    let container = db.container();
    let root = add(&container, None, "root");
    let a = add(&container, Some(root.id), "a");
    {
        let mut tx = container.store.begin().unwrap();
        tx.batch_update_positions(&LayoutMap::from([(a.id, Position::new(1.0, 2.0))]))
            .unwrap();
        tx.commit().unwrap();
    }

    let summary = container.layout.recompute_layout(MAP).unwrap();

    assert_eq!(summary.positioned, 2);
    assert_eq!(db.positions()[&a.id], a.position());
}
