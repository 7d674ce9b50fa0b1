use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Fixed-capacity FIFO window.
///
/// Pushing into a full buffer drops the oldest element. Iteration order is
/// oldest → newest.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buf: VecDeque<T>,
    capacity: NonZeroUsize,
}

impl<T> RingBuffer<T> {
    /// Empty buffer holding at most `capacity` elements.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.get()),
            capacity,
        }
    }

    /// Appends `value`, returning the element evicted to make room.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.buf.len() == self.capacity.get() {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(value);
        evicted
    }

    /// Elements from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buf.iter()
    }

    /// Newest element, if any.
    pub fn last(&self) -> Option<&T> {
        self.buf.back()
    }

    /// Elements currently held.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Upper bound on `len()`.
    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Owned copy of the contents, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(capacity: usize) -> RingBuffer<i32> {
        RingBuffer::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn keeps_everything_below_capacity() {
        let mut rb = ring(4);
        assert_eq!(rb.push(1), None);
        assert_eq!(rb.push(2), None);

        assert_eq!(rb.len(), 2);
        assert_eq!(rb.to_vec(), vec![1, 2]);
    }

    #[test]
    fn push_returns_evicted_oldest() {
        let mut rb = ring(2);
        rb.push(10);
        rb.push(20);

        assert_eq!(rb.push(30), Some(10));
        assert_eq!(rb.push(40), Some(20));
        assert_eq!(rb.to_vec(), vec![30, 40]);
    }

    #[test]
    fn capacity_one_holds_latest() {
        let mut rb = ring(1);
        for i in 0..5 {
            rb.push(i);
        }
        assert_eq!(rb.len(), 1);
        assert_eq!(rb.last(), Some(&4));
    }

    #[test]
    fn empty_buffer() {
        let rb = ring(3);
        assert!(rb.is_empty());
        assert_eq!(rb.last(), None);
        assert_eq!(rb.iter().count(), 0);
        assert_eq!(rb.capacity(), 3);
    }
}
