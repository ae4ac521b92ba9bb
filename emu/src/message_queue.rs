use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::message::Message;

/// Many producers, one consumer mailbox feeding the emulator thread.
///
/// The lock only guards the pending messages: the consumer swaps the whole buffer
/// out and applies the messages after releasing it, so producers never wait on
/// emulation work.
#[derive(Debug, Default)]
pub struct MessageQueue {
    messages: Mutex<Vec<Message>>,
}

impl MessageQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Message>> {
        // A producer panicking mid-push cannot leave a half written `Vec`.
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, message: Message) {
        self.lock().push(message);
    }

    /// Take every message queued so far, in push order.
    ///
    /// Messages pushed while the returned iterator is being consumed are kept for the
    /// next call.
    pub fn drain_all(&self) -> std::vec::IntoIter<Message> {
        std::mem::take(&mut *self.lock()).into_iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::thread;

    use pretty_assertions::assert_eq;

    use super::MessageQueue;
    use crate::message::Message;

    #[test]
    fn drain_empty_queue() {
        let queue = MessageQueue::new();

        assert_eq!(queue.drain_all().count(), 0);
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn fifo_order() {
        let queue = MessageQueue::new();
        queue.push(Message::Pause);
        queue.push(Message::Run { speed: 1 });
        queue.push(Message::Exit);
        assert_eq!(queue.len(), 3);

        let drained: Vec<_> = queue.drain_all().collect();
        assert_eq!(
            drained,
            vec![Message::Pause, Message::Run { speed: 1 }, Message::Exit]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn pushes_during_drain_wait_for_next_drain() {
        let queue = MessageQueue::new();
        queue.push(Message::Pause);

        let mut seen = Vec::new();
        for message in queue.drain_all() {
            queue.push(Message::Reset);
            seen.push(message);
        }

        assert_eq!(seen, vec![Message::Pause]);
        assert_eq!(queue.drain_all().collect::<Vec<_>>(), vec![Message::Reset]);
    }

    #[test]
    fn concurrent_producers() {
        const PRODUCERS: u64 = 8;
        const PER_PRODUCER: u64 = 500;

        let queue = Arc::new(MessageQueue::new());
        let handles: Vec<_> = (0..PRODUCERS)
            .map(|producer| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for sequence in 0..PER_PRODUCER {
                        // Encode (producer, sequence) in the payload.
                        queue.push(Message::SetAudioResampleFreq(
                            producer * PER_PRODUCER + sequence,
                        ));
                        if rand::random::<u8>() < 8 {
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        // Drain concurrently with the producers too.
        let mut received = Vec::new();
        while handles.iter().any(|h| !h.is_finished()) {
            received.extend(queue.drain_all());
        }
        for handle in handles {
            handle.join().unwrap();
        }
        received.extend(queue.drain_all());

        assert_eq!(received.len() as u64, PRODUCERS * PER_PRODUCER);

        let mut last_seen: HashMap<u64, u64> = HashMap::new();
        for message in received {
            let Message::SetAudioResampleFreq(value) = message else {
                panic!("unexpected message {message:?}");
            };
            let (producer, sequence) = (value / PER_PRODUCER, value % PER_PRODUCER);
            if let Some(previous) = last_seen.insert(producer, sequence) {
                assert!(previous < sequence, "producer {producer} out of order");
            }
        }
        assert_eq!(last_seen.len() as u64, PRODUCERS);
        assert!(last_seen.values().all(|last| *last == PER_PRODUCER - 1));
    }
}
