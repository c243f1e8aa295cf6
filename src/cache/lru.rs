//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::HashMap;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    struct NodeId;
}

#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Keys live in a doubly-linked list stored in a slot arena, with a
/// key -> node index on the side, so touch, remove and evict are O(1):
/// - Head = Least recently used
/// - Tail = Most recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    nodes: SlotMap<NodeId, Node>,
    index: HashMap<String, NodeId>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as recently used (moves it to the tail).
    ///
    /// Unknown keys are inserted as the most recent.
    pub fn touch(&mut self, key: &str) {
        match self.index.get(key) {
            Some(&id) => {
                if self.tail == Some(id) {
                    return;
                }
                self.unlink(id);
                self.push_back(id);
            }
            None => {
                let id = self.nodes.insert(Node {
                    key: key.to_string(),
                    prev: None,
                    next: None,
                });
                self.index.insert(key.to_string(), id);
                self.push_back(id);
            }
        }
    }

    // == Remove ==
    /// Removes a key from the tracker. Returns false if it was not tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(id) => {
                self.unlink(id);
                self.nodes.remove(id);
                true
            }
            None => false,
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let id = self.head?;
        self.unlink(id);
        let node = self.nodes.remove(id)?;
        self.index.remove(&node.key);
        Some(node.key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.head
            .and_then(|id| self.nodes.get(id))
            .map(|node| node.key.as_str())
    }

    /// Iterates keys from least to most recently used.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            tracker: self,
            cursor: self.head,
        }
    }

    /// Drops every tracked key.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    // == Contains ==
    /// Checks if a key is being tracked.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn unlink(&mut self, id: NodeId) {
        let (prev, next) = {
            let node = &self.nodes[id];
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }

        let node = &mut self.nodes[id];
        node.prev = None;
        node.next = None;
    }

    fn push_back(&mut self, id: NodeId) {
        {
            let node = &mut self.nodes[id];
            node.prev = self.tail;
            node.next = None;
        }
        match self.tail {
            Some(t) => self.nodes[t].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }
}

/// Oldest-to-newest key iterator over an [`LruTracker`].
pub struct Iter<'a> {
    tracker: &'a LruTracker,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.tracker.nodes.get(self.cursor?)?;
        self.cursor = node.next;
        Some(node.key.as_str())
    }
}
