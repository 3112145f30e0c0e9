//! EventQueue — outbox событий, принадлежащий компоненту.
//!
//! Каждый facade (Vision, Motrix, Brain) копит свои события здесь; владелец
//! забирает их через `drain()` в конце тика. Глобальной шины нет: ECS слой
//! (`npc::systems::forward_npc_events`) переписывает их в Bevy Events.

#[derive(Debug, Clone)]
pub struct EventQueue<E> {
    pending: Vec<E>,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self { pending: Vec::new() }
    }
}

impl<E> EventQueue<E> {
    pub fn push(&mut self, event: E) {
        self.pending.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = E>) {
        self.pending.extend(events);
    }

    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.pending)
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.pending.iter()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_queue() {
        let mut queue = EventQueue::default();
        queue.push(1);
        queue.extend([2, 3]);
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.drain(), vec![1, 2, 3]);
        assert!(queue.is_empty());
    }
}
