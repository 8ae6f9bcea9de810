//! A queue of objects whose destruction is delayed by a number of frames.

#[derive(Debug)]
struct Item<T> {
    value: T,
    // Time to live
    ttl: u32,
}

/// Holds values until they have been in the queue for `max_ttl` frames, so the GPU is guaranteed to be done with
/// them. Expired values are handed back by [`DeletionQueue::next_frame()`], the owner destroys them.
#[derive(Debug)]
pub struct DeletionQueue<T> {
    max_ttl: u32,
    items: Vec<Item<T>>,
}

impl<T> DeletionQueue<T> {
    /// Create a queue that keeps values alive for `max_ttl` frames. A ttl of zero is treated as one.
    pub fn new(max_ttl: u32) -> DeletionQueue<T> {
        DeletionQueue {
            max_ttl: max_ttl.max(1),
            items: vec![],
        }
    }

    /// Pushes a value onto the deletion queue.
    /// Note that this moves out of the parameter so that you can't access an object after
    /// it is pushed.
    pub fn push(&mut self, value: T) {
        self.items.push(Item {
            value,
            ttl: self.max_ttl,
        });
    }

    /// Advance the frame counter by one, decreasing time to live by one on each element.
    /// Elements whose time to live reaches zero are removed and returned.
    pub fn next_frame(&mut self) -> Vec<T> {
        self.items.iter_mut().for_each(|item| item.ttl -= 1);
        let (expired, alive): (Vec<_>, Vec<_>) = self.items.drain(..).partition(|item| item.ttl == 0);
        self.items = alive;
        expired.into_iter().map(|item| item.value).collect()
    }

    /// Remove and return every value, regardless of its time to live.
    pub fn drain_all(&mut self) -> Vec<T> {
        self.items.drain(..).map(|item| item.value).collect()
    }

    /// Number of values waiting for destruction.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_expire_after_ttl_frames() {
        let mut queue = DeletionQueue::new(2);
        queue.push(1);
        assert!(queue.next_frame().is_empty());
        queue.push(2);
        assert_eq!(queue.next_frame(), vec![1]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_frame(), vec![2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_returns_everything() {
        let mut queue = DeletionQueue::new(10);
        queue.push("a");
        queue.push("b");
        assert_eq!(queue.drain_all(), vec!["a", "b"]);
        assert!(queue.next_frame().is_empty());
    }
}
