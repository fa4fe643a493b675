//! Fixed-capacity history buffer
//!
//! Newest-first ring buffer indexed through a rotating head. Pushing a new
//! entry once the buffer is full overwrites the oldest slot in place, so a
//! push never shifts the other entries.

/// Bounded newest-first history. Index 0 is the most recent entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RingHistory<T> {
    /// Backing storage; grows up to `capacity` then wraps.
    slots: Vec<T>,
    /// Slot holding the newest entry. Meaningless while empty.
    head: usize,
    capacity: usize,
}

impl<T> RingHistory<T> {
    /// Create an empty history holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Push a new most-recent entry, returning the evicted oldest one if full.
    pub fn push(&mut self, value: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(value);
        }
        if self.slots.len() < self.capacity {
            self.slots.push(value);
            self.head = self.slots.len() - 1;
            None
        } else {
            self.head = (self.head + 1) % self.capacity;
            Some(std::mem::replace(&mut self.slots[self.head], value))
        }
    }

    /// Entry `age` steps back from the newest.
    pub fn get(&self, age: usize) -> Option<&T> {
        let len = self.slots.len();
        if age >= len {
            return None;
        }
        self.slots.get((self.head + len - age) % len)
    }

    /// Most recent entry.
    pub fn newest(&self) -> Option<&T> {
        self.get(0)
    }

    /// Iterate newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.slots.len()).filter_map(move |age| self.get(age))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

impl<T: Clone> RingHistory<T> {
    /// Replace the contents with `capacity` copies of `value`.
    pub fn fill(&mut self, value: T) {
        let capacity = self.capacity();
        self.slots.clear();
        self.slots.resize(capacity, value);
        self.head = capacity.saturating_sub(1);
    }

    /// Copy out newest to oldest.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
