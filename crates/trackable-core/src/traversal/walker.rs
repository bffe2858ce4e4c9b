use std::collections::{HashSet, VecDeque};

use crate::errors::{Result, TrackingError};
use crate::model::EntityRef;
use crate::ops::EntityGraph;

/// Options for a graph walk
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    /// Yield the root itself as the first item
    pub include_root: bool,
    /// Visit budget; defaults to the number of entities in the graph
    pub max_visits: Option<usize>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            include_root: true,
            max_visits: None,
        }
    }
}

impl WalkOptions {
    pub fn excluding_root() -> Self {
        Self {
            include_root: false,
            max_visits: None,
        }
    }
}

/// Lazy breadth-first walk over child-role navigations
///
/// Uses an explicit worklist and a seen-set keyed by instance identity, so
/// cyclic graphs terminate and every reachable entity is yielded once.
/// After the first error the walk is fused.
pub struct Walk<'a> {
    graph: &'a EntityGraph,
    root: EntityRef,
    include_root: bool,
    limit: usize,
    visits: usize,
    queue: VecDeque<EntityRef>,
    seen: HashSet<EntityRef>,
    failed: bool,
}

/// Start a walk from `root`
///
/// The root does not need to exist until the walk is polled; a missing root
/// or a dangling child reference yields `EntityNotFound`.
pub fn walk(graph: &EntityGraph, root: EntityRef, options: WalkOptions) -> Walk<'_> {
    let mut queue = VecDeque::new();
    queue.push_back(root);
    let mut seen = HashSet::new();
    seen.insert(root);

    Walk {
        graph,
        root,
        include_root: options.include_root,
        limit: options.max_visits.unwrap_or_else(|| graph.len()),
        visits: 0,
        queue,
        seen,
        failed: false,
    }
}

/// Collect every entity reachable from `root`
///
/// # Errors
///
/// * `EntityNotFound` - root or a referenced child is not in the graph
/// * `CyclicGraphOverflow` - the walk exceeded the graph size
pub fn reachable(graph: &EntityGraph, root: EntityRef, include_root: bool) -> Result<Vec<EntityRef>> {
    walk(
        graph,
        root,
        WalkOptions {
            include_root,
            max_visits: None,
        },
    )
    .collect()
}

impl Iterator for Walk<'_> {
    type Item = Result<EntityRef>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let current = self.queue.pop_front()?;

            self.visits += 1;
            if self.visits > self.limit {
                self.failed = true;
                return Some(Err(TrackingError::CyclicGraphOverflow {
                    root: self.root,
                    limit: self.limit,
                }));
            }

            let children = match self.graph.children(current) {
                Ok(children) => children,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            };

            for child in children {
                if self.seen.insert(child) {
                    self.queue.push_back(child);
                }
            }

            if current == self.root && !self.include_root {
                continue;
            }

            return Some(Ok(current));
        }
    }
}
