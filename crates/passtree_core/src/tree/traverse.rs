//! Ordered traversal of a [`Tree`].

use super::{Entry, Group, Tree};
use crate::id::UniqueId;
use std::ops::ControlFlow;

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A group.
    Group,
    /// An entry.
    Entry,
}

/// Borrowed tree node.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    /// A group.
    Group(&'a Group),
    /// An entry.
    Entry(&'a Entry),
}

impl NodeRef<'_> {
    /// Returns the node's identifier.
    #[must_use]
    pub fn uuid(&self) -> UniqueId {
        match self {
            Self::Group(g) => g.uuid(),
            Self::Entry(e) => e.uuid(),
        }
    }

    /// Returns the node's kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Group(_) => NodeKind::Group,
            Self::Entry(_) => NodeKind::Entry,
        }
    }
}

/// Callbacks for [`Tree::traverse`].
///
/// Returning `ControlFlow::Break` stops the walk.
pub trait TreeVisitor {
    /// Called for every group, the start group included.
    fn visit_group(&mut self, _group: &Group, _depth: usize) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    /// Called for every entry.
    fn visit_entry(&mut self, _entry: &Entry, _depth: usize) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

struct Cursor<'a> {
    group: &'a Group,
    depth: usize,
    next_entry: usize,
    next_group: usize,
}

/// Pre-order iterator over `(node, depth)` pairs.
///
/// Yields the start group first; for every group its entries come before
/// its subgroups, and each subgroup is followed by its own contents.
pub struct PreOrder<'a> {
    tree: &'a Tree,
    start: Option<&'a Group>,
    stack: Vec<Cursor<'a>>,
}

impl<'a> PreOrder<'a> {
    pub(crate) fn new(tree: &'a Tree, start: Option<&'a Group>) -> Self {
        Self {
            tree,
            start,
            stack: Vec::new(),
        }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (NodeRef<'a>, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;

        if let Some(start) = self.start.take() {
            self.stack.push(Cursor {
                group: start,
                depth: 0,
                next_entry: 0,
                next_group: 0,
            });
            return Some((NodeRef::Group(start), 0));
        }

        loop {
            let top = self.stack.last_mut()?;
            let depth = top.depth + 1;

            if let Some(&id) = top.group.entries().get(top.next_entry) {
                top.next_entry += 1;
                if let Some(entry) = tree.entry(id) {
                    return Some((NodeRef::Entry(entry), depth));
                }
                continue;
            }

            if let Some(&id) = top.group.groups().get(top.next_group) {
                top.next_group += 1;
                if let Some(group) = tree.group(id) {
                    self.stack.push(Cursor {
                        group,
                        depth,
                        next_entry: 0,
                        next_group: 0,
                    });
                    return Some((NodeRef::Group(group), depth));
                }
                continue;
            }

            self.stack.pop();
        }
    }
}

impl Tree {
    /// Walks the whole tree in pre-order, starting at the root.
    #[must_use]
    pub fn pre_order(&self) -> PreOrder<'_> {
        PreOrder::new(self, Some(self.root()))
    }

    /// Walks the subtree below `group` in pre-order, starting at `group`.
    ///
    /// Yields nothing if `group` does not exist.
    #[must_use]
    pub fn pre_order_from(&self, group: UniqueId) -> PreOrder<'_> {
        PreOrder::new(self, self.group(group))
    }

    /// Feeds every node to `visitor` in pre-order until it breaks.
    pub fn traverse<V: TreeVisitor + ?Sized>(&self, visitor: &mut V) -> ControlFlow<()> {
        for (node, depth) in self.pre_order() {
            match node {
                NodeRef::Group(g) => visitor.visit_group(g, depth)?,
                NodeRef::Entry(e) => visitor.visit_entry(e, depth)?,
            }
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time;

    #[test]
    fn entries_come_before_subgroups() {
        let now = time::now();
        let mut tree = Tree::with_root_name("Root", now);
        let root = tree.root_id();
        let sub = tree.add_group(root, Group::new("Sub", now)).unwrap();
        let e1 = tree.add_entry(root, Entry::new(now)).unwrap();
        let e2 = tree.add_entry(sub, Entry::new(now)).unwrap();

        let order: Vec<_> = tree.pre_order().map(|(n, d)| (n.uuid(), d)).collect();
        assert_eq!(order, vec![(root, 0), (e1, 1), (sub, 1), (e2, 2)]);
    }

    #[test]
    fn visitor_can_stop_early() {
        struct CountUntil(usize);
        impl TreeVisitor for CountUntil {
            fn visit_entry(&mut self, _: &Entry, _: usize) -> ControlFlow<()> {
                self.0 += 1;
                if self.0 == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            }
        }

        let now = time::now();
        let mut tree = Tree::with_root_name("Root", now);
        let root = tree.root_id();
        for _ in 0..5 {
            tree.add_entry(root, Entry::new(now)).unwrap();
        }

        let mut v = CountUntil(0);
        assert!(tree.traverse(&mut v).is_break());
        assert_eq!(v.0, 2);
    }
}
