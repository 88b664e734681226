use chrono::Duration;

use crate::instant::Instant;
use crate::slots::{position_of, Slot};

/// Something pinned to a slot by its start.
pub trait SlotBound: Sized {
    fn slot_start(&self) -> Instant;

    #[must_use]
    fn rebind(self, slot: &Slot) -> Self;
}

#[derive(Debug)]
pub struct Remap<T> {
    pub kept: Vec<T>,
    /// Items whose old slot could not be found or whose position is past the
    /// end of the new grid.
    pub dropped: Vec<T>,
}

/// Moves every item from slot `i` of `old` to slot `i` of `new`.
///
/// Labels and durations are ignored: the third slot stays the third slot even
/// if it changed from a desk slot into cleanup.
pub fn remap_positional<T, I>(old: &[Slot], new: &[Slot], items: I, tolerance: Duration) -> Remap<T>
where
    T: SlotBound,
    I: IntoIterator<Item = T>,
{
    let mut remap = Remap {
        kept: Vec::new(),
        dropped: Vec::new(),
    };
    for item in items {
        match position_of(old, item.slot_start(), tolerance).and_then(|index| new.get(index)) {
            Some(slot) => remap.kept.push(item.rebind(slot)),
            None => remap.dropped.push(item),
        }
    }
    remap
}
