//! IdGenerator: monotonically increasing ids with LIFO recycling.

/// Id type issued by [`IdGenerator`].
pub type Id = u32;

/// Issues unique ids, handing back previously returned ids first.
///
/// Returned ids are kept on a LIFO free list, so the most recently
/// returned id is the next one issued. The generator does not detect
/// double returns; returning an id that was never issued trips a debug
/// assertion.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    counter: Id,
    returned: Vec<Id>,
}

impl IdGenerator {
    /// Create a generator whose first fresh id is `begin`.
    pub fn new(begin: Id) -> Self {
        Self {
            counter: begin,
            returned: Vec::new(),
        }
    }

    /// Issue an id: the last returned one if any, otherwise the counter.
    pub fn get(&mut self) -> Id {
        if let Some(id) = self.returned.pop() {
            return id;
        }
        let id = self.counter;
        self.counter += 1;
        id
    }

    /// Return `id` so that a later `get` may reissue it.
    pub fn put(&mut self, id: Id) {
        debug_assert!(
            id < self.counter,
            "id {id} was never issued (counter is {})",
            self.counter
        );
        self.returned.push(id);
    }

    /// Forget every issued and returned id and restart counting at `begin`.
    ///
    /// All ids issued before the reset become invalid, but nothing stops a
    /// caller from still holding them.
    pub fn reset(&mut self, begin: Id) {
        self.returned.clear();
        self.counter = begin;
    }

    /// True if `id` is currently issued, i.e. below the counter and not
    /// sitting on the free list.
    pub fn is_returnable(&self, id: Id) -> bool {
        id < self.counter && !self.returned.contains(&id)
    }

    /// Number of ids waiting on the free list.
    pub fn returned_count(&self) -> usize {
        self.returned.len()
    }

    /// The next fresh id that will be issued once the free list is empty.
    pub fn counter(&self) -> Id {
        self.counter
    }
}
