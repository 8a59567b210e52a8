use std::collections::HashMap;

/// Address of the payload a node describes. Nodes are keyed by the address
/// of the block they belong to, so a link is just another address.
pub(crate) type Link = Option<u32>;

/// Storage all nodes of all lists live in. A node belongs to at most one
/// list at a time.
pub(crate) type Nodes<T> = HashMap<u32, Node<T>>;

#[derive(Debug)]
pub(crate) struct Node<T> {
    /// Address of the next node of the list
    pub next: Link,
    /// Address of the previous node of the list
    pub prev: Link,
    /// Element of the node
    pub data: T,
}

/// Intrusive doubly linked list over nodes held in a shared [`Nodes`] map.
///
/// The list only owns its ends. Linking and unlinking touch
/// at most three nodes, so moving an entry between lists is O(1) no matter
/// how long they are.
#[derive(Debug, Default)]
pub(crate) struct List {
    head: Link,
    tail: Link,
}

pub(crate) struct Iter<'a, T> {
    current: Link,
    nodes: &'a Nodes<T>,
}

impl<T> Node<T> {
    pub fn new(data: T) -> Self {
        Self {
            next: None,
            prev: None,
            data,
        }
    }
}

impl List {
    pub fn new() -> Self {
        Self {
            head: None,
            tail: None,
        }
    }

    #[inline]
    pub fn first(&self) -> Link {
        self.head
    }

    /// Links the node stored under `key` at the end of the list.
    ///
    /// The node must already be in `nodes` and must not be linked into any
    /// list. Does nothing if `key` is unknown.
    pub fn append<T>(&mut self, key: u32, nodes: &mut Nodes<T>) {
        let Some(node) = nodes.get_mut(&key) else {
            return;
        };
        node.prev = self.tail;
        node.next = None;

        match self.tail.and_then(|tail| nodes.get_mut(&tail)) {
            Some(tail) => tail.next = Some(key),
            None => self.head = Some(key),
        }

        self.tail = Some(key);
    }

    /// Unlinks the node stored under `key`. The node stays in `nodes`.
    ///
    /// The node must currently be linked into this list.
    pub fn remove<T>(&mut self, key: u32, nodes: &mut Nodes<T>) {
        let Some(node) = nodes.get_mut(&key) else {
            return;
        };
        let (prev, next) = (node.prev.take(), node.next.take());

        match prev.and_then(|p| nodes.get_mut(&p)) {
            Some(prev) => prev.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| nodes.get_mut(&n)) {
            Some(next) => next.prev = prev,
            None => self.tail = prev,
        }
    }

    /// Moves the node stored under `from` to `to`, keeping its position in
    /// the list. `to` must not be in use.
    pub fn rekey<T>(&mut self, from: u32, to: u32, nodes: &mut Nodes<T>) {
        let Some(node) = nodes.remove(&from) else {
            return;
        };
        let (prev, next) = (node.prev, node.next);
        nodes.insert(to, node);

        match prev.and_then(|p| nodes.get_mut(&p)) {
            Some(prev) => prev.next = Some(to),
            None => self.head = Some(to),
        }
        match next.and_then(|n| nodes.get_mut(&n)) {
            Some(next) => next.prev = Some(to),
            None => self.tail = Some(to),
        }
    }

    /// Successor of `key`, read before any modification the caller makes.
    #[inline]
    pub fn next<T>(key: u32, nodes: &Nodes<T>) -> Link {
        nodes.get(&key).and_then(|node| node.next)
    }

    pub fn iter<'a, T>(&self, nodes: &'a Nodes<T>) -> Iter<'a, T> {
        Iter {
            current: self.head,
            nodes,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (u32, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.current?;
        let node = self.nodes.get(&key)?;
        self.current = node.next;

        Some((key, &node.data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &List, nodes: &Nodes<char>) -> Vec<u32> {
        list.iter(nodes).map(|(key, _)| key).collect()
    }

    fn filled(keys: &[u32]) -> (List, Nodes<char>) {
        let mut nodes = Nodes::new();
        let mut list = List::new();
        for &key in keys {
            nodes.insert(key, Node::new('x'));
            list.append(key, &mut nodes);
        }
        (list, nodes)
    }

    #[test]
    fn new_list_is_empty() {
        let list = List::new();
        let nodes: Nodes<u8> = Nodes::new();

        assert_eq!(list.first(), None);
        assert!(list.iter(&nodes).next().is_none());
    }

    #[test]
    fn append_keeps_order() {
        let (list, nodes) = filled(&[40, 10, 30]);
        assert_eq!(keys(&list, &nodes), vec![40, 10, 30]);
        assert_eq!(list.first(), Some(40));
        assert_eq!(list.tail, Some(30));
        assert_eq!(List::next(10, &nodes), Some(30));
    }

    #[test]
    fn remove_head_middle_and_tail() {
        let (mut list, mut nodes) = filled(&[1, 2, 3, 4]);

        list.remove(1, &mut nodes);
        assert_eq!(keys(&list, &nodes), vec![2, 3, 4]);

        list.remove(3, &mut nodes);
        assert_eq!(keys(&list, &nodes), vec![2, 4]);

        list.remove(4, &mut nodes);
        assert_eq!(keys(&list, &nodes), vec![2]);
        assert_eq!(list.tail, Some(2));

        list.remove(2, &mut nodes);
        assert_eq!(list.first(), None);
        assert_eq!(list.tail, None);
    }

    #[test]
    fn moved_node_relinks_cleanly() {
        let (mut a, mut nodes) = filled(&[1, 2, 3]);
        let mut b = List::new();

        a.remove(2, &mut nodes);
        b.append(2, &mut nodes);

        assert_eq!(keys(&a, &nodes), vec![1, 3]);
        assert_eq!(keys(&b, &nodes), vec![2]);
        assert_eq!(b.first(), Some(2));
        assert_eq!(b.tail, Some(2));
    }

    #[test]
    fn rekey_keeps_position() {
        let (mut list, mut nodes) = filled(&[1, 2, 3]);

        list.rekey(2, 20, &mut nodes);
        assert_eq!(keys(&list, &nodes), vec![1, 20, 3]);
        assert!(!nodes.contains_key(&2));

        list.rekey(1, 10, &mut nodes);
        list.rekey(3, 30, &mut nodes);
        assert_eq!(keys(&list, &nodes), vec![10, 20, 30]);
        assert_eq!(list.first(), Some(10));
        assert_eq!(list.tail, Some(30));
        assert_eq!(nodes[&30].prev, Some(20));
    }
}
