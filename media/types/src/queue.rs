/*!
    Bounded blocking queue connecting pipeline stages.
*/

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/**
    A bounded single-producer/single-consumer FIFO of media units.

    Each queue links exactly two pipeline stages. The producer blocks in
    [`push`](Self::push) when the queue is full, which propagates
    backpressure upstream and bounds memory: decoded frames can be tens of
    megabytes each, so an unbounded queue would allow arbitrary growth.

    Termination is an explicit state, not a sentinel value. The producer
    calls [`finish`](Self::finish) after its last unit; the consumer then
    drains the remaining units and observes `None` from
    [`pop`](Self::pop). A finished queue silently drops further pushes.

    Units pushed but never popped are dropped with the queue.
*/
pub struct MediaQueue<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

struct State<T> {
    items: VecDeque<T>,
    finished: bool,
}

impl<T> MediaQueue<T> {
    /**
        Create a queue holding at most `capacity` units.

        # Panics

        Panics if `capacity` is zero.
    */
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity cannot be zero");
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                finished: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /**
        Append a unit, blocking while the queue is at capacity.

        Does nothing if the queue has been finished; the unit is dropped.
    */
    pub fn push(&self, unit: T) {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.finished {
                return;
            }
            if state.items.len() < self.capacity {
                break;
            }
            state = self.not_full.wait(state).unwrap();
        }
        state.items.push_back(unit);
        self.not_empty.notify_one();
    }

    /**
        Remove and return the head unit, blocking while the queue is empty.

        Returns `None` once the queue has been finished and fully drained.
    */
    pub fn pop(&self) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(unit) = state.items.pop_front() {
                self.not_full.notify_one();
                return Some(unit);
            }
            if state.finished {
                return None;
            }
            state = self.not_empty.wait(state).unwrap();
        }
    }

    /**
        Mark the queue terminal and wake every waiter.

        Safe to call from either side: producers call it after their last
        unit, and a failing consumer may call it to unblock its producer.
    */
    pub fn finish(&self) {
        let mut state = self.state.lock().unwrap();
        state.finished = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /**
        Number of units currently queued.
    */
    pub fn len(&self) -> usize {
        self.state.lock().unwrap().items.len()
    }

    /**
        Returns true if no units are currently queued.
    */
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /**
        Returns true once [`finish`](Self::finish) has been called.
    */
    pub fn is_finished(&self) -> bool {
        self.state.lock().unwrap().finished
    }

    /**
        The configured capacity.
    */
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn fifo_order() {
        let queue = MediaQueue::new(8);
        for i in 0..5 {
            queue.push(i);
        }
        queue.finish();

        for i in 0..5 {
            assert_eq!(queue.pop(), Some(i));
        }
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn pop_drains_before_reporting_end() {
        let queue = MediaQueue::new(4);
        queue.push("a");
        queue.push("b");
        queue.finish();

        assert_eq!(queue.pop(), Some("a"));
        assert_eq!(queue.pop(), Some("b"));
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn push_after_finish_is_dropped() {
        let queue = MediaQueue::new(4);
        assert_eq!(queue.capacity(), 4);
        assert!(!queue.is_finished());

        queue.finish();
        queue.push(1);

        assert!(queue.is_finished());
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn pop_blocks_until_push() {
        let queue = Arc::new(MediaQueue::new(4));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.push(42);
            })
        };

        assert_eq!(queue.pop(), Some(42));
        producer.join().unwrap();
    }

    #[test]
    fn finish_wakes_blocked_consumer() {
        let queue: Arc<MediaQueue<i32>> = Arc::new(MediaQueue::new(4));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.finish();
            })
        };

        assert_eq!(queue.pop(), None);
        producer.join().unwrap();
    }

    #[test]
    fn bounded_capacity_applies_backpressure() {
        let queue = Arc::new(MediaQueue::new(2));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..100 {
                    queue.push(i);
                }
                queue.finish();
            })
        };

        // the producer can only ever run two units ahead of us
        let mut received = Vec::new();
        while let Some(unit) = queue.pop() {
            assert!(queue.len() <= 2);
            received.push(unit);
        }

        assert_eq!(received, (0..100).collect::<Vec<_>>());
        producer.join().unwrap();
    }

    #[test]
    fn finish_unblocks_waiting_producer() {
        let queue = Arc::new(MediaQueue::new(1));
        queue.push(1);

        let producer = {
            let queue = Arc::clone(&queue);
            // blocks on the full queue until the consumer side finishes it
            thread::spawn(move || queue.push(2))
        };

        thread::sleep(Duration::from_millis(20));
        queue.finish();
        producer.join().unwrap();

        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn drop_releases_retained_units() {
        let unit = Arc::new(());
        let queue = MediaQueue::new(4);
        queue.push(Arc::clone(&unit));
        queue.push(Arc::clone(&unit));
        assert_eq!(Arc::strong_count(&unit), 3);

        drop(queue);
        assert_eq!(Arc::strong_count(&unit), 1);
    }

    #[test]
    #[should_panic(expected = "queue capacity cannot be zero")]
    fn zero_capacity_panics() {
        let _ = MediaQueue::<i32>::new(0);
    }
}
