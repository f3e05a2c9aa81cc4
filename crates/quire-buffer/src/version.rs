//! Version chain.
//!
//! Every change appends a new `Version` to a forward-linked chain. A version
//! holds the change that leads to its successor, so the changes between any
//! two versions of the same document can be replayed (or replayed inverted,
//! backwards) to move an offset across time without keeping old texts.
//!
//! ## Learning: `OnceLock` as a Write-Once Link
//!
//! The newest version does not know its successor yet. `OnceLock` lets the
//! provider fill the link in exactly once while readers on other threads keep
//! shared (`Arc`) access to the node.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock};

use crate::change::{AnchorMovementType, DocumentChangeEventArgs};
use crate::{BufferError, BufferResult};

static NEXT_CHAIN_ID: AtomicU64 = AtomicU64::new(1);

struct Link {
    change: Arc<DocumentChangeEventArgs>,
    next: Arc<VersionNode>,
}

struct VersionNode {
    chain: u64,
    id: u64,
    next: OnceLock<Link>,
}

impl VersionNode {
    fn new(chain: u64, id: u64) -> Self {
        Self {
            chain,
            id,
            next: OnceLock::new(),
        }
    }
}

impl Drop for VersionNode {
    // Unlink iteratively: a long history would otherwise drop recursively.
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(link) = next {
            match Arc::try_unwrap(link.next) {
                Ok(mut node) => next = node.next.take(),
                Err(_) => break,
            }
        }
    }
}

/// An immutable marker for one point in a document's history.
#[derive(Clone)]
pub struct Version(Arc<VersionNode>);

impl Version {
    /// Returns true if both versions come from the same provider.
    pub fn belongs_to_same_document_as(&self, other: &Version) -> bool {
        self.0.chain == other.0.chain
    }

    /// Compares the age of two versions of the same document: `Less` means
    /// `self` is older than `other`.
    pub fn compare_age(&self, other: &Version) -> BufferResult<Ordering> {
        if !self.belongs_to_same_document_as(other) {
            return Err(BufferError::VersionMismatch);
        }
        Ok(self.0.id.cmp(&other.0.id))
    }

    /// The changes that turn this version into `other`. Going backwards in
    /// time yields the inverted changes in reverse order.
    pub fn changes_to(&self, other: &Version) -> BufferResult<Vec<Arc<DocumentChangeEventArgs>>> {
        Ok(match self.compare_age(other)? {
            Ordering::Less => self.forward_changes(other),
            Ordering::Greater => other
                .forward_changes(self)
                .iter()
                .rev()
                .map(|change| Arc::new(change.invert()))
                .collect(),
            Ordering::Equal => Vec::new(),
        })
    }

    /// Moves an offset from this version to `other`.
    pub fn move_offset_to(
        &self,
        other: &Version,
        offset: usize,
        movement: AnchorMovementType,
    ) -> BufferResult<usize> {
        Ok(self
            .changes_to(other)?
            .iter()
            .fold(offset, |offset, change| change.get_new_offset(offset, movement)))
    }

    // Changes from self (inclusive) to newer (exclusive).
    fn forward_changes(&self, newer: &Version) -> Vec<Arc<DocumentChangeEventArgs>> {
        let mut changes = Vec::with_capacity((newer.0.id - self.0.id) as usize);
        let mut node = &self.0;
        while node.id != newer.0.id {
            let Some(link) = node.next.get() else {
                break;
            };
            changes.push(Arc::clone(&link.change));
            node = &link.next;
        }
        changes
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.0.chain == other.0.chain && self.0.id == other.0.id
    }
}

impl Eq for Version {}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Version")
            .field("chain", &self.0.chain)
            .field("id", &self.0.id)
            .finish()
    }
}

/// Owns the head of a version chain.
#[derive(Debug)]
pub struct VersionProvider {
    current: Version,
}

impl VersionProvider {
    /// Starts a new chain.
    pub fn new() -> Self {
        let chain = NEXT_CHAIN_ID.fetch_add(1, AtomicOrdering::Relaxed);
        Self {
            current: Version(Arc::new(VersionNode::new(chain, 0))),
        }
    }

    /// The newest version.
    pub fn current_version(&self) -> Version {
        self.current.clone()
    }

    /// Records `change` as the step from the current version to a new one.
    pub fn append_change(&mut self, change: Arc<DocumentChangeEventArgs>) {
        let head = &self.current.0;
        let next = Arc::new(VersionNode::new(head.chain, head.id + 1));
        let linked = head.next.set(Link {
            change,
            next: Arc::clone(&next),
        });
        debug_assert!(linked.is_ok(), "head version already has a successor");
        self.current = Version(next);
    }
}

impl Default for VersionProvider {
    fn default() -> Self {
        Self::new()
    }
}
