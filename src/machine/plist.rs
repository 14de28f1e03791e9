use std::rc::Rc;

type Link<T> = Option<Rc<Node<T>>>;

struct Node<T> {
    item: T,
    next: Link<T>,
}

/// Persistent singly-linked list. Head is the front (top of stack, next unit
/// of work). Clones share every node; `push`/`pop` never modify shared nodes.
pub struct PList<T> {
    head: Link<T>,
    len: usize,
}

impl<T> PList<T> {
    pub fn new() -> Self {
        PList { head: None, len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn peek(&self) -> Option<&T> {
        self.head.as_ref().map(|node| &node.item)
    }

    pub fn push(&mut self, item: T) {
        let next = self.head.take();
        self.head = Some(Rc::new(Node { item, next }));
        self.len += 1;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter { next: self.head.as_deref() }
    }
}

impl<T: Clone> PList<T> {
    /// Removes the head, cloning it only when the node is shared.
    pub fn pop(&mut self) -> Option<T> {
        let node = self.head.take()?;
        self.len -= 1;
        match Rc::try_unwrap(node) {
            Ok(Node { item, next }) => {
                self.head = next;
                Some(item)
            }
            Err(shared) => {
                self.head = shared.next.clone();
                Some(shared.item.clone())
            }
        }
    }

    /// Puts `items` in front, keeping their order: the first item becomes the head.
    pub fn prepend<I>(&mut self, items: I)
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: DoubleEndedIterator,
    {
        for item in items.into_iter().rev() {
            self.push(item);
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Clone for PList<T> {
    fn clone(&self) -> Self {
        PList { head: self.head.clone(), len: self.len }
    }
}

impl<T> Default for PList<T> {
    fn default() -> Self {
        PList::new()
    }
}

impl<T> Drop for PList<T> {
    // Unlink iteratively so long lists don't recurse on drop.
    fn drop(&mut self) {
        let mut link = self.head.take();
        while let Some(node) = link {
            match Rc::try_unwrap(node) {
                Ok(mut node) => link = node.next.take(),
                Err(_) => break,
            }
        }
    }
}

impl<T: Clone> FromIterator<T> for PList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let items: Vec<T> = iter.into_iter().collect();
        let mut list = PList::new();
        list.prepend(items);
        list
    }
}

impl<T: PartialEq> PartialEq for PList<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len {
            return false;
        }
        let mut a = self.head.as_ref();
        let mut b = other.head.as_ref();
        while let (Some(x), Some(y)) = (a, b) {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            if x.item != y.item {
                return false;
            }
            a = x.next.as_ref();
            b = y.next.as_ref();
        }
        true
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for PList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, T> {
    next: Option<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.next.map(|node| {
            self.next = node.next.as_deref();
            &node.item
        })
    }
}
