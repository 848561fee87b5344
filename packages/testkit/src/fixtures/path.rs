//! Perfect `b`-ary tree of `arc` relations, used to exercise path queries.
//!
//! For depth `n` and branching factor `b` the fixture holds:
//! - one `start-vertex` labelled `a0`;
//! - `b^i` `vertex` nodes labelled `a{i},{j}` for each level `i` in `1..=n`;
//! - an `arc` from `a{i},{j}` to `a{i+1},{j*b + c}` for each child `c < b`,
//!   plus `a0 → a1,{c}` at the top.
//!
//! Every node is indexed by its label (see [`IndexResolver`]). Nodes are all
//! created before any arc, so wiring only ever resolves labels that exist.
//!
//! Building into a store that already holds `a0` fails with
//! [`FixtureError::AlreadyPopulated`]; fixtures never merge.

use std::time::{Duration, Instant};

use grove_store::{EntityType, GraphSession, Instance, Relation, RelationType, RoleType};

use crate::{
    error::{FixtureError, IndexError},
    index::IndexResolver,
};

pub const VERTEX: &str = "vertex";
pub const START_VERTEX: &str = "start-vertex";
pub const ARC: &str = "arc";
pub const ARC_FROM: &str = "arc-from";
pub const ARC_TO: &str = "arc-to";

/// Label of the root node.
pub const ROOT_LABEL: &str = "a0";

const PROGRESS_EVERY: u64 = 100;

/// Label of node `position` on `level`.
pub fn vertex_label(level: u32, position: u64) -> String {
    if level == 0 {
        ROOT_LABEL.to_string()
    } else {
        format!("a{level},{position}")
    }
}

/// Number of nodes on `level`: `branching^level`.
pub fn level_width(level: u32, branching: u64) -> Result<u64, FixtureError> {
    branching
        .checked_pow(level)
        .ok_or(FixtureError::TooLarge {
            depth: level,
            branching,
        })
}

/// `1 + Σ_{i=1..depth} branching^i`.
pub fn expected_node_count(depth: u32, branching: u64) -> Result<u64, FixtureError> {
    (1..=depth).try_fold(1u64, |total, level| {
        level_width(level, branching)
            .ok()
            .and_then(|width| total.checked_add(width))
            .ok_or_else(|| FixtureError::TooLarge { depth, branching })
    })
}

/// `Σ_{i=0..depth-1} branching^(i+1)`: one incoming arc per non-root node.
pub fn expected_edge_count(depth: u32, branching: u64) -> Result<u64, FixtureError> {
    Ok(expected_node_count(depth, branching)? - 1)
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Handles to the path fixture's schema concepts.
#[derive(Debug, Clone)]
pub struct PathGraphSchema {
    pub vertex: EntityType,
    pub start_vertex: EntityType,
    pub arc: RelationType,
    pub arc_from: RoleType,
    pub arc_to: RoleType,
}

impl PathGraphSchema {
    /// Define the schema (idempotent).
    pub fn define<S: GraphSession + ?Sized>(session: &S) -> Result<Self, FixtureError> {
        let arc_from = session.put_role_type(ARC_FROM)?;
        let arc_to = session.put_role_type(ARC_TO)?;
        Ok(Self {
            vertex: session.put_entity_type(VERTEX)?,
            start_vertex: session.put_entity_type(START_VERTEX)?,
            arc: session.put_relation_type(ARC, &[arc_from.clone(), arc_to.clone()])?,
            arc_from,
            arc_to,
        })
    }
}

/// What a build produced.
#[derive(Debug, Clone, Copy)]
pub struct PathGraphSummary {
    pub depth: u32,
    pub branching: u64,
    pub nodes: u64,
    pub edges: u64,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// PathGraph
// ---------------------------------------------------------------------------

/// Builder for the path fixture over one session.
pub struct PathGraph<'s, S: GraphSession + ?Sized> {
    session: &'s S,
    schema: PathGraphSchema,
    index: IndexResolver<'s, S>,
}

impl<'s, S: GraphSession + ?Sized> PathGraph<'s, S> {
    /// Define the fixture and index schema in `session`.
    pub fn new(session: &'s S) -> Result<Self, FixtureError> {
        Ok(Self {
            session,
            schema: PathGraphSchema::define(session)?,
            index: IndexResolver::define(session)?,
        })
    }

    /// Define the schema, build the tree, and commit once.
    pub fn load(
        session: &'s S,
        depth: u32,
        branching: u64,
    ) -> Result<PathGraphSummary, FixtureError> {
        let graph = Self::new(session)?;
        let summary = graph.build(depth, branching)?;
        session.commit()?;
        Ok(summary)
    }

    pub fn schema(&self) -> &PathGraphSchema {
        &self.schema
    }

    pub fn index(&self) -> &IndexResolver<'s, S> {
        &self.index
    }

    /// Create every node and arc of the tree. Does not commit.
    pub fn build(&self, depth: u32, branching: u64) -> Result<PathGraphSummary, FixtureError> {
        if branching == 0 {
            return Err(FixtureError::InvalidBranching);
        }
        expected_node_count(depth, branching)?;

        match self.index.resolve(ROOT_LABEL) {
            Err(IndexError::NotFound(_)) => {}
            Ok(_) | Err(IndexError::Ambiguous { .. }) => {
                return Err(FixtureError::AlreadyPopulated(ROOT_LABEL.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        let started = Instant::now();
        let nodes = self.insert_nodes(depth, branching)?;
        let edges = self.insert_arcs(depth, branching)?;
        let elapsed = started.elapsed();

        tracing::info!(
            depth,
            branching,
            nodes,
            edges,
            elapsed_ms = elapsed.as_millis() as u64,
            "path graph built"
        );
        Ok(PathGraphSummary {
            depth,
            branching,
            nodes,
            edges,
            elapsed,
        })
    }

    fn insert_nodes(&self, depth: u32, branching: u64) -> Result<u64, FixtureError> {
        self.index.put_entity(ROOT_LABEL, &self.schema.start_vertex)?;
        let mut nodes = 1;

        for level in 1..=depth {
            let width = level_width(level, branching)?;
            for position in 0..width {
                self.index
                    .put_entity(&vertex_label(level, position), &self.schema.vertex)?;
                nodes += 1;
                if position != 0 && position % PROGRESS_EVERY == 0 {
                    tracing::debug!(level, inserted = position, of = width, "entities inserted");
                }
            }
        }
        Ok(nodes)
    }

    fn insert_arcs(&self, depth: u32, branching: u64) -> Result<u64, FixtureError> {
        let mut edges = 0;
        if depth == 0 {
            return Ok(edges);
        }

        let root = self.index.resolve(ROOT_LABEL)?;
        for child in 0..branching {
            self.arc(&root, &self.index.resolve(&vertex_label(1, child))?)?;
            edges += 1;
        }

        for level in 1..depth {
            let width = level_width(level, branching)?;
            for position in 0..width {
                let parent = self.index.resolve(&vertex_label(level, position))?;
                for c in 0..branching {
                    let child = self
                        .index
                        .resolve(&vertex_label(level + 1, position * branching + c))?;
                    self.arc(&parent, &child)?;
                    edges += 1;
                }
                if position != 0 && position % PROGRESS_EVERY == 0 {
                    tracing::debug!(
                        level,
                        of_levels = depth - 1,
                        connected = position,
                        of = width,
                        "entities connected"
                    );
                }
            }
        }
        Ok(edges)
    }

    fn arc(&self, from: &Instance, to: &Instance) -> Result<(), FixtureError> {
        self.session.insert_relation(
            Relation::new(&self.schema.arc)
                .role_player(&self.schema.arc_from, from)
                .role_player(&self.schema.arc_to, to),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(vertex_label(0, 0), "a0");
        assert_eq!(vertex_label(3, 12), "a3,12");
    }

    #[test]
    fn counts_follow_geometric_series() {
        assert_eq!(expected_node_count(0, 5).unwrap(), 1);
        assert_eq!(expected_node_count(2, 2).unwrap(), 7);
        assert_eq!(expected_edge_count(2, 2).unwrap(), 6);
        assert_eq!(expected_node_count(3, 3).unwrap(), 1 + 3 + 9 + 27);
        assert_eq!(expected_node_count(4, 1).unwrap(), 5);
    }

    #[test]
    fn oversized_tree_is_rejected() {
        assert_eq!(
            expected_node_count(64, 2).unwrap_err(),
            FixtureError::TooLarge {
                depth: 64,
                branching: 2
            }
        );
    }
}
