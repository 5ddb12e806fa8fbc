//! Identity-only error tags.
//!
//! # Invariants
//! - Two tags are equal only when they are the same allocation.
//! - The label is diagnostic text and never takes part in equality.

use super::RepoError;
use std::error::Error;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Opaque marker attached to a [`RepoError`] to signal a cross-cutting condition.
///
/// Cloning a tag yields the same identity; calling [`Tag::new`] twice yields
/// two distinct tags even with the same label.
#[derive(Clone)]
pub struct Tag(Arc<TagToken>);

struct TagToken {
    label: &'static str,
}

impl Tag {
    pub fn new(label: &'static str) -> Self {
        Self(Arc::new(TagToken { label }))
    }

    pub fn label(&self) -> &'static str {
        self.0.label
    }

    /// Returns whether `err` is a [`RepoError`] carrying this exact tag.
    pub fn is_tagged(&self, err: &(dyn Error + 'static)) -> bool {
        err.downcast_ref::<RepoError>()
            .is_some_and(|repo_err| repo_err.has_tag(self))
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Tag {}

impl Debug for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tag({}@{:p})", self.0.label, Arc::as_ptr(&self.0))
    }
}
