use std::collections::{BTreeMap, BTreeSet};

use crate::classpath::ClassTable;

/// Parent→children adjacency over the class table.
///
/// Each class is a child of its resolved superclass and of every resolved
/// interface it declares. Names missing from the table contribute no edge.
#[derive(Clone, Debug)]
pub(crate) struct ClassGraph<'a> {
    root: &'a str,
    children: BTreeMap<&'a str, Vec<&'a str>>,
}

/// Depth recorded for every class reachable from the root.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct DepthStats {
    depths: BTreeMap<String, u32>,
}

impl<'a> ClassGraph<'a> {
    pub(crate) fn build(table: &'a ClassTable) -> Self {
        let mut children: BTreeMap<&'a str, Vec<&'a str>> = BTreeMap::new();
        for descriptor in table.iter() {
            let child = descriptor.qualified_name.as_str();
            if let Some(parent) = descriptor.super_name.as_deref() {
                if table.contains(parent) {
                    children.entry(parent).or_default().push(child);
                }
            }
            if table.is_root(descriptor) {
                continue;
            }
            for interface in &descriptor.interfaces {
                if table.contains(interface) {
                    children.entry(interface.as_str()).or_default().push(child);
                }
            }
        }
        for list in children.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        Self {
            root: table.root_name(),
            children,
        }
    }

    pub(crate) fn children_of(&self, name: &str) -> &[&'a str] {
        self.children.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn edge_count(&self) -> usize {
        self.children.values().map(Vec::len).sum()
    }

    /// Depth-first walk from the root.
    ///
    /// The root sits at depth 1 and is not recorded. A class first reached from
    /// a node at depth `n` is recorded at `n + 1`; classes are never revisited, so
    /// the first path found in name order decides the depth.
    pub(crate) fn depths(&self) -> DepthStats {
        struct Frame<'g> {
            node: &'g str,
            depth: u32,
            next_child: usize,
        }

        let mut visited = BTreeSet::new();
        let mut depths = BTreeMap::new();
        visited.insert(self.root);
        let mut stack = vec![Frame {
            node: self.root,
            depth: 1,
            next_child: 0,
        }];
        while let Some(frame) = stack.last_mut() {
            let Some(child) = self.children_of(frame.node).get(frame.next_child).copied() else {
                stack.pop();
                continue;
            };
            frame.next_child += 1;
            let depth = frame.depth + 1;
            if visited.insert(child) {
                depths.insert(child.to_string(), depth);
                stack.push(Frame {
                    node: child,
                    depth,
                    next_child: 0,
                });
            }
        }
        DepthStats { depths }
    }
}

impl DepthStats {
    /// Deepest recorded depth, or -1 when nothing besides the root is reachable.
    pub(crate) fn max_depth(&self) -> i64 {
        self.depths
            .values()
            .max()
            .map(|depth| i64::from(*depth))
            .unwrap_or(-1)
    }

    /// Mean recorded depth; NaN when nothing is recorded.
    pub(crate) fn average_depth(&self) -> f64 {
        if self.depths.is_empty() {
            return f64::NAN;
        }
        let total: u64 = self.depths.values().map(|depth| u64::from(*depth)).sum();
        total as f64 / self.depths.len() as f64
    }

    #[cfg(test)]
    pub(crate) fn depth_of(&self, name: &str) -> Option<u32> {
        self.depths.get(name).copied()
    }

    pub(crate) fn reachable_count(&self) -> usize {
        self.depths.len()
    }
}
