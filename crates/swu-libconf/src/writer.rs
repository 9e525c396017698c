//! libconfig serializer.
//!
//! Output layout matches the Python `libconf` dumper that sw-description
//! tooling has historically produced: four-space indentation, containers
//! opened on their own line after `name =`, `;` after every setting and
//! `,` between sequence items.

use crate::node::{Group, Node, Scalar, SequenceKind};

const INDENT: usize = 4;

/// Serialize a top-level group.
pub fn to_string(root: &Group) -> String {
    let mut out = String::new();
    write_group(root, 0, &mut out);
    out
}

fn write_group(group: &Group, indent: usize, out: &mut String) {
    for (name, value) in group.iter() {
        write_value(Some(name), value, indent, out);
        out.push_str(";\n");
    }
}

fn write_value(name: Option<&str>, value: &Node, indent: usize, out: &mut String) {
    let spaces = " ".repeat(indent);
    let (prefix, prefix_nl) = match name {
        Some(n) => (format!("{} = ", n), format!("{} =\n{}", n, spaces)),
        None => (String::new(), String::new()),
    };

    match value {
        Node::Mapping(group) => {
            out.push_str(&format!("{}{}{{\n", spaces, prefix_nl));
            write_group(group, indent + INDENT, out);
            out.push_str(&format!("{}}}", spaces));
        }
        Node::Sequence(seq) => {
            let (open, close) = match seq.kind {
                SequenceKind::List => ('(', ')'),
                SequenceKind::Array => ('[', ']'),
            };
            out.push_str(&format!("{}{}{}\n", spaces, prefix_nl, open));
            for (i, item) in seq.items.iter().enumerate() {
                write_value(None, item, indent + INDENT, out);
                if i + 1 < seq.items.len() {
                    out.push_str(",\n");
                }
            }
            out.push_str(&format!("\n{}{}", spaces, close));
        }
        Node::Scalar(scalar) => {
            out.push_str(&spaces);
            out.push_str(&prefix);
            out.push_str(&format_scalar(scalar));
        }
    }
}

fn format_scalar(scalar: &Scalar) -> String {
    match scalar {
        Scalar::Str(s) => escape_string(s),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Int(i) if i32::try_from(*i).is_ok() => i.to_string(),
        Scalar::Int(i) => format!("{}L", i),
        Scalar::Float(f) => format!("{:?}", f),
    }
}

/// Quote and escape a string value.
///
/// Newlines and tabs become the two-character sequences `\n` and `\t`.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
