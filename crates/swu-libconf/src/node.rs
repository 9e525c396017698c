//! Descriptor tree types.

use std::fmt;

/// A node of the descriptor tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A leaf value
    Scalar(Scalar),
    /// A named group of settings, `{ ... }`
    Mapping(Group),
    /// A list `( ... )` or an array `[ ... ]`
    Sequence(Sequence),
}

/// Leaf values.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for Scalar {
    /// Plain rendering, without quoting or escaping.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{:?}", x),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

/// Bracket style of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    /// `( ... )`, may hold any node
    List,
    /// `[ ... ]`, scalars only
    Array,
}

/// An ordered sequence of nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub kind: SequenceKind,
    pub items: Vec<Node>,
}

impl Sequence {
    /// Create a list from nodes
    pub fn list(items: Vec<Node>) -> Self {
        Self {
            kind: SequenceKind::List,
            items,
        }
    }

    /// Create an array from nodes
    pub fn array(items: Vec<Node>) -> Self {
        Self {
            kind: SequenceKind::Array,
            items,
        }
    }
}

/// Settings of a group, in document order. Names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    entries: Vec<(String, Node)>,
}

impl Group {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of settings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the group has no settings
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a setting by name
    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Look up a setting by name for modification
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Whether a setting exists
    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a value, replacing in place or appending at the end.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Node>) {
        let name = name.into();
        let value = value.into();
        match self.get_mut(&name) {
            Some(slot) => *slot = value,
            None => self.entries.push((name, value)),
        }
    }

    pub(crate) fn push(&mut self, name: String, value: Node) {
        self.entries.push((name, value));
    }

    /// String value of a setting, if it is a string
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Node::as_str)
    }

    /// Boolean value of a setting, if it is a boolean
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Node::as_bool)
    }

    /// Iterate over settings in document order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Node {
    /// Borrow as a string scalar
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Scalar(Scalar::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a boolean scalar
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Node::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as a group
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Mapping(g) => Some(g),
            _ => None,
        }
    }

    /// Borrow as a group for modification
    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Node::Mapping(g) => Some(g),
            _ => None,
        }
    }

    /// Borrow as a sequence
    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a sequence for modification
    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Node::Sequence(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Scalar> for Node {
    fn from(value: Scalar) -> Self {
        Node::Scalar(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Scalar(Scalar::Str(value.to_string()))
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::Scalar(Scalar::Str(value))
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Scalar(Scalar::Bool(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Node::Scalar(Scalar::Int(value))
    }
}

impl From<Group> for Node {
    fn from(value: Group) -> Self {
        Node::Mapping(value)
    }
}

impl From<Sequence> for Node {
    fn from(value: Sequence) -> Self {
        Node::Sequence(value)
    }
}
