//! Lock-guarded doubly linked list with exactly-once claiming.
//!
//! # Overview
//!
//! [`ConcurrentList`] keeps its nodes in a slab owned by the list and links
//! them by slot index. Callers address nodes through [`NodeHandle`]s, which
//! carry the slot generation: a handle whose node has been removed is
//! reported as [`ListError::StaleHandle`] instead of silently aliasing
//! whatever node reuses the slot later.
//!
//! Every operation takes the list's single mutex, so the list can be shared
//! freely between threads. The one operation that makes it a work queue is
//! [`ConcurrentList::claim_first_unclaimed`]: many racing consumers may call
//! it on the same list and no node is ever handed out twice.
//!
//! # Example
//!
//! ```
//! use find_dupes::engine::ConcurrentList;
//!
//! let list = ConcurrentList::new("example");
//! list.push_back("a");
//! list.push_back("b");
//!
//! let first = list.claim_first_unclaimed().unwrap();
//! let second = list.claim_first_unclaimed().unwrap();
//! assert!(list.claim_first_unclaimed().is_none());
//!
//! assert_eq!(list.remove(first).unwrap(), "a");
//! assert_eq!(list.remove(second).unwrap(), "b");
//! assert!(list.is_empty());
//! ```

use parking_lot::Mutex;

/// Handle to a node stored in a [`ConcurrentList`].
///
/// Handles are cheap to copy and only meaningful for the list that issued
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    slot: u32,
    generation: u32,
}

/// Errors reported by [`ConcurrentList`] operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// The handle refers to a node that was already removed.
    #[error("list '{list}': stale node handle (slot {slot}, generation {generation})")]
    StaleHandle {
        /// Name of the list
        list: &'static str,
        /// Slot the handle pointed at
        slot: u32,
        /// Generation recorded in the handle
        generation: u32,
    },

    /// The node was expected to be claimed but is not.
    #[error("list '{list}': node in slot {slot} is not claimed")]
    NotClaimed {
        /// Name of the list
        list: &'static str,
        /// Slot of the unclaimed node
        slot: u32,
    },
}

struct Node<T> {
    value: T,
    prev: Option<u32>,
    next: Option<u32>,
    in_use: bool,
}

struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

struct Links<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

impl<T> Links<T> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    fn alloc(&mut self, value: T) -> u32 {
        let node = Node {
            value,
            prev: None,
            next: None,
            in_use: false,
        };
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize].node = Some(node);
                slot
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                (self.slots.len() - 1) as u32
            }
        }
    }

    fn handle(&self, slot: u32) -> NodeHandle {
        NodeHandle {
            slot,
            generation: self.slots[slot as usize].generation,
        }
    }

    fn node(&self, slot: u32) -> Option<&Node<T>> {
        self.slots.get(slot as usize).and_then(|s| s.node.as_ref())
    }

    fn node_mut(&mut self, slot: u32) -> Option<&mut Node<T>> {
        self.slots.get_mut(slot as usize).and_then(|s| s.node.as_mut())
    }

    fn resolve(&self, handle: NodeHandle) -> Option<u32> {
        let slot = self.slots.get(handle.slot as usize)?;
        (slot.generation == handle.generation && slot.node.is_some()).then_some(handle.slot)
    }

    fn link_back(&mut self, slot: u32) {
        let old_tail = self.tail;
        if let Some(node) = self.node_mut(slot) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail.and_then(|t| self.node_mut(t)) {
            Some(tail) => tail.next = Some(slot),
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
        self.len += 1;
    }

    fn link_front(&mut self, slot: u32) {
        let old_head = self.head;
        if let Some(node) = self.node_mut(slot) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head.and_then(|h| self.node_mut(h)) {
            Some(head) => head.prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
        self.len += 1;
    }

    /// Unlink a resolved slot and return its value. The slot generation is
    /// bumped so outstanding handles go stale.
    fn unlink(&mut self, slot: u32) -> Option<T> {
        let entry = self.slots.get_mut(slot as usize)?;
        let node = entry.node.take()?;
        entry.generation = entry.generation.wrapping_add(1);

        match node.prev.and_then(|p| self.node_mut(p)) {
            Some(prev) => prev.next = node.next,
            None => self.head = node.next,
        }
        match node.next.and_then(|n| self.node_mut(n)) {
            Some(next) => next.prev = node.prev,
            None => self.tail = node.prev,
        }

        self.free.push(slot);
        self.len -= 1;
        Some(node.value)
    }

    fn iter(&self) -> LinkIter<'_, T> {
        LinkIter {
            links: self,
            cursor: self.head,
        }
    }
}

struct LinkIter<'a, T> {
    links: &'a Links<T>,
    cursor: Option<u32>,
}

impl<'a, T> Iterator for LinkIter<'a, T> {
    type Item = (u32, &'a Node<T>);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.cursor?;
        let node = self.links.node(slot)?;
        self.cursor = node.next;
        Some((slot, node))
    }
}

/// Thread-safe doubly linked list with a claim-first-unclaimed primitive.
pub struct ConcurrentList<T> {
    name: &'static str,
    links: Mutex<Links<T>>,
}

impl<T> ConcurrentList<T> {
    /// Create an empty list. The name only shows up in errors and logs.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            links: Mutex::new(Links::new()),
        }
    }

    /// Name given at construction.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append a value at the tail.
    pub fn push_back(&self, value: T) -> NodeHandle {
        let mut links = self.links.lock();
        let slot = links.alloc(value);
        links.link_back(slot);
        links.handle(slot)
    }

    /// Insert a value at the head.
    pub fn push_front(&self, value: T) -> NodeHandle {
        let mut links = self.links.lock();
        let slot = links.alloc(value);
        links.link_front(slot);
        links.handle(slot)
    }

    /// Remove a node and hand its value back.
    ///
    /// # Errors
    ///
    /// [`ListError::StaleHandle`] if the node was already removed.
    pub fn remove(&self, handle: NodeHandle) -> Result<T, ListError> {
        let mut links = self.links.lock();
        let slot = links.resolve(handle).ok_or_else(|| self.stale(handle))?;
        links.unlink(slot).ok_or_else(|| self.stale(handle))
    }

    /// Remove a node that must currently be claimed.
    ///
    /// # Errors
    ///
    /// [`ListError::StaleHandle`] for a removed node, [`ListError::NotClaimed`]
    /// if nobody claimed it.
    pub fn remove_claimed(&self, handle: NodeHandle) -> Result<T, ListError> {
        let mut links = self.links.lock();
        let slot = links.resolve(handle).ok_or_else(|| self.stale(handle))?;
        if !links.node(slot).is_some_and(|n| n.in_use) {
            return Err(ListError::NotClaimed {
                list: self.name,
                slot,
            });
        }
        links.unlink(slot).ok_or_else(|| self.stale(handle))
    }

    /// Claim the first node not yet marked in-use.
    ///
    /// Scans from the head under the list lock, marks the first unclaimed
    /// node in-use and returns its handle. Returns `None` when the list is
    /// empty or every node is already claimed.
    pub fn claim_first_unclaimed(&self) -> Option<NodeHandle> {
        self.claim_first_unclaimed_with(|_| ()).map(|(handle, ())| handle)
    }

    /// Like [`claim_first_unclaimed`](Self::claim_first_unclaimed), also
    /// running `f` on the claimed value while the lock is still held.
    pub fn claim_first_unclaimed_with<R>(
        &self,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<(NodeHandle, R)> {
        let mut links = self.links.lock();
        let slot = links
            .iter()
            .find(|(_, node)| !node.in_use)
            .map(|(slot, _)| slot)?;
        let handle = links.handle(slot);
        let node = links.node_mut(slot)?;
        node.in_use = true;
        Some((handle, f(&mut node.value)))
    }

    /// Whether the node is currently claimed.
    ///
    /// # Errors
    ///
    /// [`ListError::StaleHandle`] if the node was removed.
    pub fn is_claimed(&self, handle: NodeHandle) -> Result<bool, ListError> {
        let links = self.links.lock();
        let slot = links.resolve(handle).ok_or_else(|| self.stale(handle))?;
        Ok(links.node(slot).is_some_and(|n| n.in_use))
    }

    /// Run `f` on the value behind `handle`.
    ///
    /// # Errors
    ///
    /// [`ListError::StaleHandle`] if the node was removed.
    pub fn with<R>(&self, handle: NodeHandle, f: impl FnOnce(&T) -> R) -> Result<R, ListError> {
        let links = self.links.lock();
        let node = links
            .resolve(handle)
            .and_then(|slot| links.node(slot))
            .ok_or_else(|| self.stale(handle))?;
        Ok(f(&node.value))
    }

    /// Run `f` on the value behind `handle`, mutably.
    ///
    /// # Errors
    ///
    /// [`ListError::StaleHandle`] if the node was removed.
    pub fn with_mut<R>(
        &self,
        handle: NodeHandle,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, ListError> {
        let mut links = self.links.lock();
        let slot = links.resolve(handle).ok_or_else(|| self.stale(handle))?;
        let node = links.node_mut(slot).ok_or_else(|| self.stale(handle))?;
        Ok(f(&mut node.value))
    }

    /// Snapshot of all handles in list order.
    #[must_use]
    pub fn handles(&self) -> Vec<NodeHandle> {
        let links = self.links.lock();
        links.iter().map(|(slot, _)| links.handle(slot)).collect()
    }

    /// Visit every value in list order while holding the lock.
    pub fn for_each(&self, mut f: impl FnMut(&T)) {
        let links = self.links.lock();
        for (_, node) in links.iter() {
            f(&node.value);
        }
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.lock().len
    }

    /// Whether the list has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.lock().head.is_none()
    }

    /// Number of nodes currently marked in-use.
    #[must_use]
    pub fn claimed_count(&self) -> usize {
        self.links.lock().iter().filter(|(_, n)| n.in_use).count()
    }

    /// Remove every node, claimed or not, and return the values in list
    /// order. Only safe once no other thread holds handles into the list.
    pub fn drain(&self) -> Vec<T> {
        let mut links = self.links.lock();
        let mut values = Vec::with_capacity(links.len);
        while let Some(head) = links.head {
            match links.unlink(head) {
                Some(value) => values.push(value),
                None => break,
            }
        }
        values
    }

    fn stale(&self, handle: NodeHandle) -> ListError {
        ListError::StaleHandle {
            list: self.name,
            slot: handle.slot,
            generation: handle.generation,
        }
    }
}

impl<T> std::fmt::Debug for ConcurrentList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentList")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish()
    }
}
