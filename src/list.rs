//! Intrusive doubly linked recency list.
//!
//! The front of the list is the most recently used node, the back the least
//! recently used one. Nodes are heap allocated and addressed by `NonNull`
//! handles that the owning cache keeps in its hash map, which gives O(1)
//! promotion and removal.
//!
//! The list does not enforce a capacity; the cache decides when to pop from
//! the back.

use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;

/// A node in the recency list.
pub(crate) struct Node<T> {
    value: T,
    prev: Option<NonNull<Node<T>>>,
    next: Option<NonNull<Node<T>>>,
}

impl<T> Node<T> {
    /// Shared access to the stored value.
    #[inline]
    pub(crate) fn value(&self) -> &T {
        &self.value
    }

    /// Exclusive access to the stored value.
    #[inline]
    pub(crate) fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

/// Doubly linked list ordered from most to least recently used.
pub(crate) struct RecencyList<T> {
    head: Option<NonNull<Node<T>>>,
    tail: Option<NonNull<Node<T>>>,
    len: usize,
    _owns: PhantomData<Box<Node<T>>>,
}

// SAFETY: the list exclusively owns every node it links; moving the list moves
// ownership of all nodes with it.
unsafe impl<T: Send> Send for RecencyList<T> {}

// SAFETY: shared references only allow reading node values.
unsafe impl<T: Sync> Sync for RecencyList<T> {}

impl<T> RecencyList<T> {
    /// Creates an empty list.
    pub(crate) fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
            _owns: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Handle to the least recently used node.
    #[inline]
    pub(crate) fn back(&self) -> Option<NonNull<Node<T>>> {
        self.tail
    }

    /// Pushes a value at the most recently used position and returns its handle.
    pub(crate) fn push_front(&mut self, value: T) -> NonNull<Node<T>> {
        let node = Box::new(Node {
            value,
            prev: None,
            next: None,
        });
        let node = NonNull::from(Box::leak(node));
        // SAFETY: `node` was just allocated and is not linked anywhere.
        unsafe { self.link_front(node) };
        self.len += 1;
        node
    }

    /// Moves `node` to the most recently used position.
    ///
    /// # Safety
    ///
    /// `node` must be a handle returned by this list that has not been removed.
    pub(crate) unsafe fn move_to_front(&mut self, node: NonNull<Node<T>>) {
        if self.head == Some(node) {
            return;
        }
        // SAFETY: caller guarantees `node` is linked into this list.
        unsafe {
            self.unlink(node);
            self.link_front(node);
        }
    }

    /// Unlinks `node` and returns its value.
    ///
    /// # Safety
    ///
    /// `node` must be a handle returned by this list that has not been removed.
    /// The handle is dangling once this returns.
    pub(crate) unsafe fn remove(&mut self, node: NonNull<Node<T>>) -> T {
        // SAFETY: caller guarantees `node` is linked into this list and was
        // allocated by `push_front` through `Box`.
        unsafe {
            self.unlink(node);
            self.len -= 1;
            Box::from_raw(node.as_ptr()).value
        }
    }

    /// Removes and returns the least recently used value.
    pub(crate) fn pop_back(&mut self) -> Option<T> {
        let tail = self.tail?;
        // SAFETY: `tail` is linked into this list.
        Some(unsafe { self.remove(tail) })
    }

    /// Iterates from the least to the most recently used value.
    pub(crate) fn iter_lru(&self) -> IterLru<'_, T> {
        IterLru {
            cursor: self.tail,
            remaining: self.len,
            _list: PhantomData,
        }
    }

    /// Drops every node.
    pub(crate) fn clear(&mut self) {
        while self.pop_back().is_some() {}
    }

    /// # Safety
    ///
    /// `node` must be valid and currently unlinked.
    unsafe fn link_front(&mut self, mut node: NonNull<Node<T>>) {
        // SAFETY: caller guarantees `node` is valid; `head` is a node we own.
        unsafe {
            node.as_mut().prev = None;
            node.as_mut().next = self.head;
            match self.head {
                Some(mut head) => head.as_mut().prev = Some(node),
                None => self.tail = Some(node),
            }
        }
        self.head = Some(node);
    }

    /// # Safety
    ///
    /// `node` must be valid and linked into this list.
    unsafe fn unlink(&mut self, mut node: NonNull<Node<T>>) {
        // SAFETY: neighbours of a linked node are themselves linked nodes.
        unsafe {
            let (prev, next) = (node.as_ref().prev, node.as_ref().next);
            match prev {
                Some(mut prev) => prev.as_mut().next = next,
                None => self.head = next,
            }
            match next {
                Some(mut next) => next.as_mut().prev = prev,
                None => self.tail = prev,
            }
            node.as_mut().prev = None;
            node.as_mut().next = None;
        }
    }
}

impl<T> Drop for RecencyList<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for RecencyList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter_lru()).finish()
    }
}

/// Iterator from least to most recently used.
pub(crate) struct IterLru<'a, T> {
    cursor: Option<NonNull<Node<T>>>,
    remaining: usize,
    _list: PhantomData<&'a RecencyList<T>>,
}

impl<'a, T> Iterator for IterLru<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = self.cursor?;
        // SAFETY: the iterator borrows the list, so no node can be removed
        // while it is alive.
        let node = unsafe { &*node.as_ptr() };
        self.cursor = node.prev;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect<T: Clone>(list: &RecencyList<T>) -> Vec<T> {
        list.iter_lru().cloned().collect()
    }

    #[test]
    fn test_push_front_orders_by_recency() {
        let mut list = RecencyList::new();
        list.push_front(1);
        list.push_front(2);
        list.push_front(3);
        assert_eq!(list.len(), 3);
        assert_eq!(collect(&list), vec![1, 2, 3]);
    }

    #[test]
    fn test_move_to_front() {
        let mut list = RecencyList::new();
        let a = list.push_front("a");
        list.push_front("b");
        list.push_front("c");
        unsafe { list.move_to_front(a) };
        assert_eq!(collect(&list), vec!["b", "c", "a"]);

        // Already at the front: no-op.
        unsafe { list.move_to_front(a) };
        assert_eq!(collect(&list), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_remove_middle_and_ends() {
        let mut list = RecencyList::new();
        let a = list.push_front('a');
        let b = list.push_front('b');
        let c = list.push_front('c');
        assert_eq!(unsafe { list.remove(b) }, 'b');
        assert_eq!(collect(&list), vec!['a', 'c']);
        assert_eq!(unsafe { list.remove(c) }, 'c');
        assert_eq!(unsafe { list.remove(a) }, 'a');
        assert!(list.is_empty());
        assert!(list.back().is_none());
    }

    #[test]
    fn test_pop_back() {
        let mut list = RecencyList::new();
        assert_eq!(list.pop_back(), None::<i32>);
        list.push_front(10);
        list.push_front(20);
        assert_eq!(list.pop_back(), Some(10));
        assert_eq!(list.pop_back(), Some(20));
        assert_eq!(list.pop_back(), None);
    }

    #[test]
    fn test_clear_drops_owned_values() {
        use std::sync::Arc;
        let tracker = Arc::new(());
        let mut list = RecencyList::new();
        for _ in 0..5 {
            list.push_front(Arc::clone(&tracker));
        }
        assert_eq!(Arc::strong_count(&tracker), 6);
        list.clear();
        assert_eq!(Arc::strong_count(&tracker), 1);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_drop_releases_nodes() {
        use std::sync::Arc;
        let tracker = Arc::new(());
        {
            let mut list = RecencyList::new();
            list.push_front(Arc::clone(&tracker));
            list.push_front(Arc::clone(&tracker));
        }
        assert_eq!(Arc::strong_count(&tracker), 1);
    }

    #[test]
    fn test_value_mut_through_handle() {
        let mut list = RecencyList::new();
        let mut node = list.push_front(String::from("x"));
        unsafe { node.as_mut().value_mut().push('y') };
        assert_eq!(unsafe { node.as_ref().value() }, "xy");
    }
}
