//! Category hierarchy guard.
//!
//! # Responsibility
//! - Prove a category can be linked under a candidate parent without
//!   closing a cycle.
//! - Collect a category subtree for cascade-style reads.
//!
//! # Invariants
//! - Both walks terminate on cyclic data: a revisited id ends the walk.
//! - Upward walks longer than `max_depth` fail with `HierarchyTooDeep`.
//! - The guard only reads; it never mutates storage.

use crate::model::category::CategoryId;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::rows::{load_category, parse_uuid};
use rusqlite::Connection;
use std::collections::{BTreeSet, HashSet, VecDeque};

/// Read-only hierarchy checks over one connection or open transaction.
pub struct CycleGuard<'conn> {
    conn: &'conn Connection,
    max_depth: usize,
}

impl<'conn> CycleGuard<'conn> {
    pub fn new(conn: &'conn Connection, max_depth: usize) -> Self {
        Self { conn, max_depth }
    }

    /// Returns whether placing `category_id` under `candidate_parent_id`
    /// would create a cycle.
    ///
    /// Detaching (`None`) is always safe. The walk follows parent links from
    /// the candidate, including soft-deleted rows, until it reaches a root,
    /// a missing row, `category_id`, or a node it already visited.
    pub fn would_create_cycle(
        &self,
        category_id: CategoryId,
        candidate_parent_id: Option<CategoryId>,
    ) -> RepoResult<bool> {
        let Some(candidate_parent_id) = candidate_parent_id else {
            return Ok(false);
        };
        if candidate_parent_id == category_id {
            return Ok(true);
        }

        let mut visited = HashSet::new();
        let mut cursor = Some(candidate_parent_id);
        while let Some(current) = cursor {
            if current == category_id || !visited.insert(current) {
                return Ok(true);
            }
            if visited.len() > self.max_depth {
                return Err(RepoError::HierarchyTooDeep {
                    category_id: candidate_parent_id,
                    max_depth: self.max_depth,
                });
            }
            cursor = load_category(self.conn, current, true)?.and_then(|node| node.parent_id);
        }
        Ok(false)
    }

    /// Returns `root_id` plus every active descendant id.
    pub fn collect_subtree_ids(&self, root_id: CategoryId) -> RepoResult<BTreeSet<CategoryId>> {
        let mut collected = BTreeSet::from([root_id]);
        let mut queue = VecDeque::from([root_id]);
        let mut stmt = self.conn.prepare_cached(
            "SELECT id
             FROM categories
             WHERE parent_id = ?1
               AND is_deleted = 0
             ORDER BY id ASC;",
        )?;

        while let Some(parent_id) = queue.pop_front() {
            let mut rows = stmt.query([parent_id.to_string()])?;
            while let Some(row) = rows.next()? {
                let value: String = row.get(0)?;
                let child_id = parse_uuid(&value, "categories.id")?;
                if collected.insert(child_id) {
                    queue.push_back(child_id);
                }
            }
        }
        Ok(collected)
    }
}
