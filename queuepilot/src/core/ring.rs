//! Fixed-capacity circular buffer with lifetime counters
//!
//! [`Ring`] is the non-blocking storage behind the pipeline's bounded queue.
//! It keeps the read/write indices, the occupancy and the produced/consumed
//! totals together so that one lock around it gives a consistent view of all
//! of them.

/// Consistent view of a ring's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueCounts {
    /// Items pushed since creation
    pub produced_total: u64,
    /// Items popped since creation
    pub consumed_total: u64,
    /// Items currently stored
    pub occupancy: usize,
}

/// Fixed-capacity circular buffer
///
/// The capacity does not need to be a power of two. The write index is never
/// stored independently of the read index and occupancy, so
/// `write_index == (read_index + occupancy) % capacity` holds by
/// construction.
///
/// # Example
///
/// ```
/// use queuepilot::Ring;
///
/// let mut ring = Ring::new(2);
/// assert!(ring.try_push(1).is_ok());
/// assert!(ring.try_push(2).is_ok());
/// assert_eq!(ring.try_push(3), Err(3));
///
/// assert_eq!(ring.try_pop(), Some(1));
/// assert_eq!(ring.counts().occupancy, 1);
/// ```
#[derive(Debug)]
pub struct Ring<T> {
    slots: Box<[Option<T>]>,
    read_index: usize,
    occupancy: usize,
    produced_total: u64,
    consumed_total: u64,
}

impl<T> Ring<T> {
    /// Create an empty ring with room for `capacity` items
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be at least 1");

        Ring {
            slots: (0..capacity).map(|_| None).collect(),
            read_index: 0,
            occupancy: 0,
            produced_total: 0,
            consumed_total: 0,
        }
    }

    /// Store `item` at the write index
    ///
    /// Returns the item back when the ring is full.
    pub fn try_push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }

        let index = self.write_index();
        self.slots[index] = Some(item);
        self.occupancy += 1;
        self.produced_total += 1;

        Ok(())
    }

    /// Take the item at the read index, if any
    pub fn try_pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let item = self.slots[self.read_index].take();
        self.read_index = (self.read_index + 1) % self.capacity();
        self.occupancy -= 1;
        self.consumed_total += 1;

        item
    }

    /// Counters as one consistent triple
    pub fn counts(&self) -> QueueCounts {
        QueueCounts {
            produced_total: self.produced_total,
            consumed_total: self.consumed_total,
            occupancy: self.occupancy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.occupancy
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    pub fn is_full(&self) -> bool {
        self.occupancy == self.capacity()
    }

    /// Index of the next slot to read
    pub fn read_index(&self) -> usize {
        self.read_index
    }

    /// Index of the next slot to write
    pub fn write_index(&self) -> usize {
        (self.read_index + self.occupancy) % self.capacity()
    }
}
