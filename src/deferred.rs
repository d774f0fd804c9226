use alloc::collections::VecDeque;

use crate::event::Event;

/// Notifications that must wait until exclusive access has been released.
///
/// Handlers push here while holding the service lock. The service drains
/// the queue after unlocking, so a notify function can never observe a
/// half-updated table or deadlock on re-entry.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    queue: VecDeque<Event>,
}
impl DeferredQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn push(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    /// Nonblocking, returns None if the queue is empty
    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fifo() {
        let a = Event::new();
        let b = Event::new();

        let mut q = DeferredQueue::new();
        assert!(q.is_empty());
        q.push(a.clone());
        q.push(b.clone());
        assert_eq!(q.len(), 2);

        assert!(q.pop().unwrap().same_as(&a));
        assert!(q.pop().unwrap().same_as(&b));
        assert!(q.pop().is_none());
    }
}
