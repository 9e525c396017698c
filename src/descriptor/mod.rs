//! The sw-description manifest
//!
//! The descriptor is parsed into a libconfig tree, its file references are
//! rewritten by the pipeline, and the tree is serialized again as the
//! first archive member.

mod template;
mod walker;

pub use template::{expand_functions, expand_variables, TemplateError, TemplateFunction};
pub use walker::{collect_file_references, entry_mut, EntryPath, PathSegment};

use swu_libconf::{Group, ParseError};

/// Archive member name of the manifest
pub const MANIFEST_NAME: &str = "sw-description";

/// Top-level group holding all file references
pub const SOFTWARE_GROUP: &str = "software";

/// A parsed sw-description
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    root: Group,
}

impl Descriptor {
    /// Parse expanded descriptor text
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Ok(Self {
            root: swu_libconf::parse(text)?,
        })
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    /// The `software` group, if present
    pub fn software(&self) -> Option<&Group> {
        self.root.get(SOFTWARE_GROUP).and_then(|n| n.as_group())
    }

    /// File references below `software`, or `None` without that group.
    pub fn file_references(&self) -> Option<Vec<EntryPath>> {
        self.software().map(collect_file_references)
    }

    /// Borrow a reference returned by [`Descriptor::file_references`]
    pub fn entry_mut(&mut self, path: &EntryPath) -> Option<&mut Group> {
        let software = self.root.get_mut(SOFTWARE_GROUP)?.as_group_mut()?;
        entry_mut(software, path)
    }

    /// Serialize for embedding in the archive.
    pub fn to_text(&self) -> String {
        repair_escapes(&swu_libconf::to_string(&self.root))
    }
}

/// Turn escaped `\n` and `\t` sequences back into the raw characters.
///
/// Embedded scripts must reach the device with their line structure
/// intact. Idempotent.
///
/// The replacement is textual over the whole serialized manifest, so a
/// string holding a literal backslash followed by `n` or `t` (such as
/// `C:\new`) is rewritten as well and does not survive a round trip.
pub fn repair_escapes(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\t", "\t")
}
