//! SQLite node store.
//!
//! Every transaction opens its own connection. Write transactions start with
//! `BEGIN IMMEDIATE`, so writers are serialised by SQLite itself, also across
//! processes sharing the database file. Read transactions use `BEGIN DEFERRED`
//! and never take the write lock.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, instrument, warn};

use crate::domain::{LayoutMap, MindmapId, NewNode, Node, NodeChanges, NodeId};
use crate::infrastructure::error::{StoreError, StoreResult};
use crate::infrastructure::traits::{NodeStore, NodeTransaction};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS nodes (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    mindmap_id   INTEGER NOT NULL,
    parent_id    INTEGER REFERENCES nodes(id) ON DELETE CASCADE,
    title        TEXT NOT NULL,
    content      TEXT,
    order_index  INTEGER NOT NULL DEFAULT 0,
    x_position   REAL NOT NULL DEFAULT 0,
    y_position   REAL NOT NULL DEFAULT 0,
    created_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_nodes_mindmap ON nodes(mindmap_id);
CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id);
";

const NODE_COLUMNS: &str =
    "id, mindmap_id, parent_id, title, content, order_index, x_position, y_position, created_at";

/// Node store backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteNodeStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteNodeStore {
    /// Open (and create if needed) the database at `path` and apply the schema.
    #[instrument(level = "debug")]
    pub fn open(path: &Path, busy_timeout: Duration) -> StoreResult<Self> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    StoreError::io(format!("create database directory {}", dir.display()), e)
                })?;
            }
        }
        let store = Self {
            path: path.to_path_buf(),
            busy_timeout,
        };
        store.connect()?.execute_batch(SCHEMA)?;
        debug!("opened node store at {}", path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> StoreResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    fn start(&self, begin: &str) -> StoreResult<Box<dyn NodeTransaction>> {
        let conn = self.connect()?;
        conn.execute_batch(begin)?;
        Ok(Box::new(SqliteTransaction {
            conn,
            finished: false,
        }))
    }
}

impl NodeStore for SqliteNodeStore {
    fn begin(&self) -> StoreResult<Box<dyn NodeTransaction>> {
        self.start("BEGIN IMMEDIATE")
    }

    fn begin_read(&self) -> StoreResult<Box<dyn NodeTransaction>> {
        self.start("BEGIN DEFERRED")
    }
}

struct SqliteTransaction {
    conn: Connection,
    finished: bool,
}

fn row_to_node(row: &Row<'_>) -> rusqlite::Result<Node> {
    Ok(Node {
        id: NodeId(row.get(0)?),
        mindmap_id: MindmapId(row.get(1)?),
        parent_id: row.get::<_, Option<i64>>(2)?.map(NodeId),
        title: row.get(3)?,
        content: row.get(4)?,
        order_index: row.get(5)?,
        x_position: row.get(6)?,
        y_position: row.get(7)?,
        created_at: row.get::<_, DateTime<Utc>>(8)?,
    })
}

impl NodeTransaction for SqliteTransaction {
    fn fetch_nodes(&mut self, mindmap_id: MindmapId) -> StoreResult<Vec<Node>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {NODE_COLUMNS} FROM nodes WHERE mindmap_id = ?1 ORDER BY id"
        ))?;
        let nodes = stmt
            .query_map(params![mindmap_id.0], row_to_node)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(nodes)
    }

    fn find_node(&mut self, id: NodeId) -> StoreResult<Option<Node>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {NODE_COLUMNS} FROM nodes WHERE id = ?1"))?;
        Ok(stmt.query_row(params![id.0], row_to_node).optional()?)
    }

    fn max_order_index(
        &mut self,
        mindmap_id: MindmapId,
        parent_id: Option<NodeId>,
    ) -> StoreResult<Option<i64>> {
        let max = self.conn.query_row(
            "SELECT MAX(order_index) FROM nodes WHERE mindmap_id = ?1 AND parent_id IS ?2",
            params![mindmap_id.0, parent_id.map(|p| p.0)],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(max)
    }

    fn insert_node(&mut self, node: NewNode) -> StoreResult<Node> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO nodes (mindmap_id, parent_id, title, content, order_index, x_position, y_position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6)",
            params![
                node.mindmap_id.0,
                node.parent_id.map(|p| p.0),
                node.title,
                node.content,
                node.order_index,
                created_at,
            ],
        )?;
        Ok(Node {
            id: NodeId(self.conn.last_insert_rowid()),
            mindmap_id: node.mindmap_id,
            parent_id: node.parent_id,
            title: node.title,
            content: node.content,
            order_index: node.order_index,
            x_position: 0.0,
            y_position: 0.0,
            created_at,
        })
    }

    fn delete_subtree(&mut self, id: NodeId) -> StoreResult<usize> {
        // Cascaded deletes are not reported by sqlite3_changes, so count first.
        let removed = self.conn.query_row(
            "WITH RECURSIVE subtree(id) AS (
                 SELECT id FROM nodes WHERE id = ?1
                 UNION
                 SELECT n.id FROM nodes n JOIN subtree s ON n.parent_id = s.id
             )
             SELECT COUNT(*) FROM subtree",
            params![id.0],
            |row| row.get::<_, i64>(0),
        )?;
        if removed == 0 {
            return Err(StoreError::NodeNotFound(id));
        }
        self.conn
            .execute("DELETE FROM nodes WHERE id = ?1", params![id.0])?;
        Ok(removed as usize)
    }

    fn set_parent(&mut self, id: NodeId, parent_id: NodeId, order_index: i64) -> StoreResult<()> {
        let updated = self.conn.execute(
            "UPDATE nodes SET parent_id = ?1, order_index = ?2 WHERE id = ?3",
            params![parent_id.0, order_index, id.0],
        )?;
        if updated == 0 {
            return Err(StoreError::NodeNotFound(id));
        }
        Ok(())
    }

    fn update_node(&mut self, id: NodeId, changes: &NodeChanges) -> StoreResult<()> {
        let updated = self.conn.execute(
            "UPDATE nodes SET
                 title = COALESCE(?1, title),
                 content = COALESCE(?2, content),
                 order_index = COALESCE(?3, order_index)
             WHERE id = ?4",
            params![changes.title, changes.content, changes.order_index, id.0],
        )?;
        if updated == 0 {
            return Err(StoreError::NodeNotFound(id));
        }
        Ok(())
    }

    fn batch_update_positions(&mut self, positions: &LayoutMap) -> StoreResult<usize> {
        let mut stmt = self
            .conn
            .prepare_cached("UPDATE nodes SET x_position = ?1, y_position = ?2 WHERE id = ?3")?;
        let mut updated = 0;
        for (id, position) in positions {
            updated += stmt.execute(params![position.x, position.y, id.0])?;
        }
        Ok(updated)
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("rollback failed: {}", e);
            }
        }
    }
}
