//! File reference discovery
//!
//! Any mapping holding a scalar `filename` setting references an artifact.
//! References are recorded as paths from the walk root so the pipeline can
//! revisit and rewrite each entry after the walk.

use std::fmt;

use swu_libconf::{Group, Node};

/// One step from a group into a child node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Setting name within a group
    Key(String),
    /// Position within a sequence
    Index(usize),
}

/// Location of an entry below the walk root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPath(Vec<PathSegment>);

impl EntryPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for EntryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(k) if i == 0 => write!(f, "{}", k)?,
                PathSegment::Key(k) => write!(f, ".{}", k)?,
                PathSegment::Index(n) => write!(f, "[{}]", n)?,
            }
        }
        Ok(())
    }
}

/// Collect every entry below `root` that carries a `filename`, in
/// document order.
pub fn collect_file_references(root: &Group) -> Vec<EntryPath> {
    let mut found = Vec::new();
    let mut path = Vec::new();
    walk_group(root, &mut path, &mut found);
    found
}

fn walk_group(group: &Group, path: &mut Vec<PathSegment>, found: &mut Vec<EntryPath>) {
    for (name, value) in group.iter() {
        match value {
            Node::Scalar(_) => {
                if name == "filename" {
                    found.push(EntryPath(path.clone()));
                }
            }
            Node::Mapping(_) | Node::Sequence(_) => {
                path.push(PathSegment::Key(name.to_string()));
                walk_node(value, path, found);
                path.pop();
            }
        }
    }
}

fn walk_node(node: &Node, path: &mut Vec<PathSegment>, found: &mut Vec<EntryPath>) {
    match node {
        Node::Mapping(group) => walk_group(group, path, found),
        Node::Sequence(seq) => {
            for (i, item) in seq.items.iter().enumerate() {
                path.push(PathSegment::Index(i));
                walk_node(item, path, found);
                path.pop();
            }
        }
        Node::Scalar(_) => {}
    }
}

/// Borrow the entry at `path` for modification.
pub fn entry_mut<'a>(root: &'a mut Group, path: &EntryPath) -> Option<&'a mut Group> {
    group_entry_mut(root, &path.0)
}

fn group_entry_mut<'a>(group: &'a mut Group, rest: &[PathSegment]) -> Option<&'a mut Group> {
    match rest.split_first() {
        None => Some(group),
        Some((PathSegment::Key(k), tail)) => node_entry_mut(group.get_mut(k)?, tail),
        Some((PathSegment::Index(_), _)) => None,
    }
}

fn node_entry_mut<'a>(node: &'a mut Node, rest: &[PathSegment]) -> Option<&'a mut Group> {
    match node {
        Node::Mapping(group) => group_entry_mut(group, rest),
        Node::Sequence(seq) => match rest.split_first() {
            Some((PathSegment::Index(i), tail)) => node_entry_mut(seq.items.get_mut(*i)?, tail),
            _ => None,
        },
        Node::Scalar(_) => None,
    }
}
