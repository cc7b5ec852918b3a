use std::collections::VecDeque;
use crate::common::types::PageId;

/// Two-queue page replacement state. Pages fixed exactly once since
/// admission sit in the FIFO queue; pages fixed again sit in the LRU
/// queue ordered by recency of fix. Every resident page appears in
/// exactly one of the two queues.
///
/// The replacer only tracks ordering; pin counts are the pool's concern.
/// All mutation happens under the pool lock.
pub struct TwoQueueReplacer {
    fifo: VecDeque<PageId>,
    lru: VecDeque<PageId>,
}

impl TwoQueueReplacer {
    pub fn new(capacity: usize) -> Self {
        Self {
            fifo: VecDeque::with_capacity(capacity),
            lru: VecDeque::with_capacity(capacity),
        }
    }

    /// A page entering the pool starts at the tail of the FIFO queue.
    pub fn admit(&mut self, page_id: PageId) {
        debug_assert!(!self.contains(page_id));
        self.fifo.push_back(page_id);
    }

    /// A re-fixed page leaves whichever queue held it and moves to the
    /// most-recently-used end of the LRU queue.
    pub fn touch(&mut self, page_id: PageId) {
        if !remove_from(&mut self.fifo, page_id) {
            remove_from(&mut self.lru, page_id);
        }
        self.lru.push_back(page_id);
    }

    /// Unfix rule: a page on the LRU queue moves to the LRU tail; a page
    /// on the FIFO queue stays where it is. Promotion happens at
    /// fix-time, not unfix-time.
    pub fn refresh(&mut self, page_id: PageId) {
        if remove_from(&mut self.lru, page_id) {
            self.lru.push_back(page_id);
        }
    }

    /// Drop a page from whichever queue holds it.
    pub fn remove(&mut self, page_id: PageId) -> bool {
        remove_from(&mut self.fifo, page_id) || remove_from(&mut self.lru, page_id)
    }

    /// Eviction candidates in scan order: FIFO oldest to newest, then
    /// LRU oldest to newest.
    pub fn candidates(&self) -> impl Iterator<Item = PageId> + '_ {
        self.fifo.iter().chain(self.lru.iter()).copied()
    }

    pub fn fifo_list(&self) -> Vec<PageId> {
        self.fifo.iter().copied().collect()
    }

    pub fn lru_list(&self) -> Vec<PageId> {
        self.lru.iter().copied().collect()
    }

    fn contains(&self, page_id: PageId) -> bool {
        self.fifo.contains(&page_id) || self.lru.contains(&page_id)
    }
}

fn remove_from(queue: &mut VecDeque<PageId>, page_id: PageId) -> bool {
    if let Some(pos) = queue.iter().position(|&id| id == page_id) {
        queue.remove(pos);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_appends_to_fifo() {
        let mut replacer = TwoQueueReplacer::new(4);
        replacer.admit(1);
        replacer.admit(2);
        assert_eq!(replacer.fifo_list(), vec![1, 2]);
        assert_eq!(replacer.lru_list(), Vec::<PageId>::new());
    }

    #[test]
    fn test_touch_promotes_to_lru_tail() {
        let mut replacer = TwoQueueReplacer::new(4);
        replacer.admit(1);
        replacer.admit(2);

        replacer.touch(1);
        assert_eq!(replacer.fifo_list(), vec![2]);
        assert_eq!(replacer.lru_list(), vec![1]);

        replacer.touch(2);
        replacer.touch(1);
        assert_eq!(replacer.fifo_list(), Vec::<PageId>::new());
        assert_eq!(replacer.lru_list(), vec![2, 1]);
    }

    #[test]
    fn test_refresh_moves_lru_entry_only() {
        let mut replacer = TwoQueueReplacer::new(4);
        replacer.admit(1);
        replacer.admit(2);
        replacer.touch(1);
        replacer.touch(2);

        // LRU order is [1, 2]; refreshing 1 moves it behind 2.
        replacer.refresh(1);
        assert_eq!(replacer.lru_list(), vec![2, 1]);

        // FIFO entries stay put on refresh.
        replacer.admit(3);
        replacer.admit(4);
        replacer.refresh(3);
        assert_eq!(replacer.fifo_list(), vec![3, 4]);
    }

    #[test]
    fn test_candidates_scan_fifo_before_lru() {
        let mut replacer = TwoQueueReplacer::new(4);
        replacer.admit(1);
        replacer.touch(1);
        replacer.admit(2);
        replacer.admit(3);

        let order: Vec<PageId> = replacer.candidates().collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn test_remove_from_either_queue() {
        let mut replacer = TwoQueueReplacer::new(4);
        replacer.admit(1);
        replacer.admit(2);
        replacer.touch(2);

        assert!(replacer.remove(1));
        assert!(replacer.remove(2));
        assert!(!replacer.remove(3));
        assert!(replacer.fifo_list().is_empty());
        assert!(replacer.lru_list().is_empty());
    }
}
