//! Object references and the allocator that positions them.
//!
//! References are handed out before their objects exist so that anything may
//! point at anything. Each one is positioned exactly once, when its
//! `N G obj` header is written, as a (fragment, offset-within-fragment) pair;
//! absolute offsets only exist after the sink has placed every fragment.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::sink::{FragmentId, PositionInfo};

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

#[derive(Debug, Clone, Copy)]
struct Position {
    fragment: FragmentId,
    offset: u64,
}

/// Allocates object numbers and records where each object was written.
///
/// Numbers start at 1 and follow allocation order. Generation is always 0.
#[derive(Debug, Default)]
pub struct ObjectTable {
    positions: Vec<Option<Position>>,
}

/// Allocator shared by every writer of one document.
pub type SharedObjectTable = Rc<RefCell<ObjectTable>>;

impl ObjectTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next object number.
    pub fn next_ref(&mut self) -> ObjectRef {
        self.positions.push(None);
        ObjectRef::new(self.positions.len() as u32, 0)
    }

    /// Number of references allocated so far.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether the object for `obj` has been started.
    pub fn is_positioned(&self, obj: ObjectRef) -> bool {
        self.slot(obj).map(|slot| slot.is_some()).unwrap_or(false)
    }

    fn slot(&self, obj: ObjectRef) -> Option<&Option<Position>> {
        (obj.id as usize)
            .checked_sub(1)
            .and_then(|index| self.positions.get(index))
    }

    /// Record where the header of `obj` starts.
    pub(crate) fn set_position(
        &mut self,
        obj: ObjectRef,
        fragment: FragmentId,
        offset: u64,
    ) -> Result<()> {
        let index = (obj.id as usize)
            .checked_sub(1)
            .filter(|index| *index < self.positions.len())
            .ok_or_else(|| Error::illegal(format!("{} was not allocated by this document", obj)))?;
        let slot = &mut self.positions[index];
        if slot.is_some() {
            return Err(Error::illegal(format!("{} was already written", obj)));
        }
        *slot = Some(Position { fragment, offset });
        log::trace!("positioned {} in fragment {} at {}", obj, fragment.index(), offset);
        Ok(())
    }

    /// Absolute offsets of every allocated object, in allocation order.
    pub fn resolve(&self, positions: &PositionInfo) -> Result<Vec<u64>> {
        self.positions
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let id = index as u32 + 1;
                let position = slot.ok_or(Error::UnresolvedReference(id))?;
                let base = positions.base_offset(position.fragment).ok_or_else(|| {
                    Error::illegal(format!(
                        "fragment {} holding object {} was never emitted",
                        position.fragment.index(),
                        id
                    ))
                })?;
                Ok(base + position.offset)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{FragmentSink, SpoolSink};

    #[test]
    fn test_object_ref_display() {
        let obj_ref = ObjectRef::new(10, 0);
        assert_eq!(format!("{}", obj_ref), "10 0 R");
    }

    #[test]
    fn test_allocation_is_sequential() {
        let mut table = ObjectTable::new();
        assert!(table.is_empty());
        let refs: Vec<_> = (0..3).map(|_| table.next_ref()).collect();
        assert_eq!(refs.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(refs.iter().all(|r| r.gen == 0));
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_position_set_exactly_once() {
        let mut sink = SpoolSink::new(Vec::new());
        let fragment = sink.append_fragment().unwrap();
        let mut table = ObjectTable::new();
        let r = table.next_ref();
        assert!(!table.is_positioned(r));
        table.set_position(r, fragment, 9).unwrap();
        assert!(table.is_positioned(r));
        assert!(matches!(
            table.set_position(r, fragment, 12),
            Err(Error::IllegalState(_))
        ));
        assert!(table
            .set_position(ObjectRef::new(5, 0), fragment, 0)
            .is_err());
    }

    #[test]
    fn test_resolve_adds_fragment_base() {
        let mut sink = SpoolSink::new(Vec::new());
        let first = sink.append_fragment().unwrap();
        sink.write(first, &[0u8; 15]).unwrap();
        let second = sink.append_fragment().unwrap();
        sink.close_fragment(first).unwrap();
        sink.close_fragment(second).unwrap();

        let mut table = ObjectTable::new();
        let a = table.next_ref();
        let b = table.next_ref();
        table.set_position(b, first, 3).unwrap();
        table.set_position(a, second, 0).unwrap();
        let offsets = table.resolve(&sink.position_info().unwrap()).unwrap();
        assert_eq!(offsets, vec![15, 3]);
    }

    #[test]
    fn test_resolve_fails_on_unwritten_reference() {
        let mut table = ObjectTable::new();
        table.next_ref();
        let err = table.resolve(&PositionInfo::default()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference(1)));
    }
}
