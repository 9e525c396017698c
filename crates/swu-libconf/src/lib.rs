//! libconfig support for sw-description files.
//!
//! Parses the libconfig text format into a closed node tree and writes it
//! back in the layout of the classic Python `libconf` serializer.

mod node;
mod parser;
mod writer;

pub use node::{Group, Node, Scalar, Sequence, SequenceKind};
pub use parser::{parse, ParseError};
pub use writer::{escape_string, to_string};
