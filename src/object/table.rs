//! Per-object property table.
//!
//! Slots live in a vector in creation order and are never compacted, so a
//! `PropId` stays valid for the lifetime of the object (deleted slots become
//! tombstones). Buckets hold the head of a chain threaded through the slots.
//! The bucket count is a power of two and doubles once every bucket would be
//! used by one slot on average.

use crate::value::{JsObjectRef, JsString, JsValue};

/// Index of a slot in one object's table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropId(pub u32);

impl PropId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Property attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropFlags(u8);

impl PropFlags {
    pub const NONE: PropFlags = PropFlags(0);
    pub const WRITABLE: PropFlags = PropFlags(1);
    pub const ENUMERABLE: PropFlags = PropFlags(2);
    pub const CONFIGURABLE: PropFlags = PropFlags(4);
    /// Attributes of a property created by plain assignment
    pub const ALL: PropFlags = PropFlags(7);
    /// Writable and configurable, but hidden from enumeration
    pub const HIDDEN: PropFlags = PropFlags(5);
    /// `const` binding: assignment is a TypeError rather than a no-op
    pub const CONST: PropFlags = PropFlags(8);

    pub fn contains(self, other: PropFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn with(self, other: PropFlags, on: bool) -> PropFlags {
        if on {
            PropFlags(self.0 | other.0)
        } else {
            PropFlags(self.0 & !other.0)
        }
    }

    pub fn writable(self) -> bool {
        self.contains(PropFlags::WRITABLE)
    }

    pub fn enumerable(self) -> bool {
        self.contains(PropFlags::ENUMERABLE)
    }

    pub fn configurable(self) -> bool {
        self.contains(PropFlags::CONFIGURABLE)
    }

    pub fn is_const(self) -> bool {
        self.contains(PropFlags::CONST)
    }
}

impl std::ops::BitOr for PropFlags {
    type Output = PropFlags;

    fn bitor(self, rhs: PropFlags) -> PropFlags {
        PropFlags(self.0 | rhs.0)
    }
}

/// How a name is matched against slot names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    #[default]
    Sensitive,
    /// Exact match first, then the earliest slot differing only by case
    Insensitive,
}

/// What a slot holds
#[derive(Debug, Clone)]
pub enum SlotKind {
    /// Concrete value
    Value(JsValue),
    /// Accessor pair; either side may be absent
    Accessor {
        getter: Option<JsObjectRef>,
        setter: Option<JsObjectRef>,
    },
    /// Host-backed property, addressed by the host's id
    External(u32),
    /// Entry in the class's builtin property table
    Builtin(usize),
    /// Class-level indexed element (arguments, string characters)
    Indexed(u32),
    /// Resolves through the prototype at the given slot
    ProtoRef(PropId),
    /// Tombstone
    Deleted,
}

impl SlotKind {
    pub fn is_deleted(&self) -> bool {
        matches!(self, SlotKind::Deleted)
    }

    /// Own properties are everything except tombstones and prototype refs
    pub fn is_own(&self) -> bool {
        !matches!(self, SlotKind::Deleted | SlotKind::ProtoRef(_))
    }
}

#[derive(Debug, Clone)]
pub struct Slot {
    pub name: JsString,
    hash: u32,
    pub flags: PropFlags,
    pub kind: SlotKind,
    bucket_next: Option<u32>,
}

/// Case-folding string hash
pub fn string_hash(name: &str) -> u32 {
    name.chars()
        .flat_map(char::to_lowercase)
        .fold(0u32, |h, c| (h >> 28) ^ (h << 4) ^ u32::from(c))
}

const INITIAL_BUCKETS: usize = 8;

#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    slots: Vec<Slot>,
    buckets: Vec<Option<u32>>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots, tombstones included
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn slot(&self, id: PropId) -> Option<&Slot> {
        self.slots.get(id.index())
    }

    pub fn slot_mut(&mut self, id: PropId) -> Option<&mut Slot> {
        self.slots.get_mut(id.index())
    }

    pub fn kind(&self, id: PropId) -> Option<&SlotKind> {
        self.slot(id).map(|s| &s.kind)
    }

    pub fn flags(&self, id: PropId) -> PropFlags {
        self.slot(id).map(|s| s.flags).unwrap_or_default()
    }

    pub fn name(&self, id: PropId) -> Option<&JsString> {
        self.slot(id).map(|s| &s.name)
    }

    /// Replace a slot's kind and flags in place
    pub fn set(&mut self, id: PropId, kind: SlotKind, flags: PropFlags) {
        if let Some(slot) = self.slot_mut(id) {
            slot.kind = kind;
            slot.flags = flags;
        }
    }

    /// Turn a slot into a tombstone, dropping whatever it held
    pub fn tombstone(&mut self, id: PropId) {
        self.set(id, SlotKind::Deleted, PropFlags::NONE);
    }

    fn bucket_of(&self, hash: u32) -> usize {
        (hash as usize) & self.buckets.len().saturating_sub(1)
    }

    fn chain(&self, hash: u32) -> impl Iterator<Item = (u32, &Slot)> + '_ {
        let head = if self.buckets.is_empty() {
            None
        } else {
            self.buckets.get(self.bucket_of(hash)).copied().flatten()
        };
        std::iter::successors(
            head.and_then(|i| self.slots.get(i as usize).map(|s| (i, s))),
            move |(_, slot)| {
                slot.bucket_next
                    .and_then(|i| self.slots.get(i as usize).map(|s| (i, s)))
            },
        )
    }

    /// Find a slot by name. Tombstones are returned so their position can
    /// be reused. An exact match always wins; the insensitive fallback
    /// ignores tombstones and only succeeds when a single own slot folds to
    /// `name`.
    pub fn find(&self, name: &str, case: CaseMode) -> Option<PropId> {
        let hash = string_hash(name);
        let exact = self
            .chain(hash)
            .find(|(_, slot)| slot.hash == hash && slot.name.as_str() == name)
            .map(|(i, _)| PropId(i));
        if exact.is_some() || case == CaseMode::Sensitive {
            return exact;
        }
        match self.case_variants(name).as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Whether an insensitive lookup of `name` is ambiguous at this level:
    /// no exact slot, and several own slots differing only by case
    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.find(name, CaseMode::Sensitive).is_none() && self.case_variants(name).len() > 1
    }

    /// Own slots whose names fold to `name`, in creation order
    fn case_variants(&self, name: &str) -> Vec<PropId> {
        let hash = string_hash(name);
        let lowered = name.to_lowercase();
        let mut ids: Vec<PropId> = self
            .chain(hash)
            .filter(|(_, slot)| {
                slot.hash == hash
                    && slot.kind.is_own()
                    && slot.name.as_str().to_lowercase() == lowered
            })
            .map(|(i, _)| PropId(i))
            .collect();
        ids.sort();
        ids
    }

    /// Append a new slot. The caller checks the name is not present.
    pub fn add(&mut self, name: JsString, flags: PropFlags, kind: SlotKind) -> PropId {
        if self.slots.len() >= self.buckets.len() {
            self.grow();
        }
        let hash = string_hash(name.as_str());
        let index = self.slots.len() as u32;
        let bucket = self.bucket_of(hash);
        let head = self.buckets.get(bucket).copied().flatten();
        self.slots.push(Slot {
            name,
            hash,
            flags,
            kind,
            bucket_next: head,
        });
        if let Some(b) = self.buckets.get_mut(bucket) {
            *b = Some(index);
        }
        PropId(index)
    }

    fn grow(&mut self) {
        let size = (self.buckets.len() * 2).max(INITIAL_BUCKETS);
        self.buckets = vec![None; size];
        let mask = size - 1;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let bucket = (slot.hash as usize) & mask;
            if let Some(b) = self.buckets.get_mut(bucket) {
                slot.bucket_next = *b;
                *b = Some(i as u32);
            }
        }
    }

    /// Iterate slots in creation order
    pub fn iter(&self) -> impl Iterator<Item = (PropId, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, s)| (PropId(i as u32), s))
    }

    pub fn values(&self) -> impl Iterator<Item = &SlotKind> {
        self.slots.iter().map(|s| &s.kind)
    }

    /// Drop every slot
    pub fn clear(&mut self) {
        self.slots.clear();
        self.buckets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(n: i32) -> SlotKind {
        SlotKind::Value(JsValue::Int(n))
    }

    #[test]
    fn test_hash_folds_case() {
        assert_eq!(string_hash("Length"), string_hash("length"));
        assert_ne!(string_hash("a"), string_hash("b"));
    }

    #[test]
    fn test_add_and_find() {
        let mut table = PropertyTable::new();
        let a = table.add(JsString::from("a"), PropFlags::ALL, value(1));
        let b = table.add(JsString::from("b"), PropFlags::ALL, value(2));
        assert_eq!(table.find("a", CaseMode::Sensitive), Some(a));
        assert_eq!(table.find("b", CaseMode::Sensitive), Some(b));
        assert_eq!(table.find("c", CaseMode::Sensitive), None);
    }

    #[test]
    fn test_buckets_double_at_full_load() {
        let mut table = PropertyTable::new();
        for i in 0..8 {
            table.add(JsString::from(format!("p{}", i)), PropFlags::ALL, value(i));
        }
        assert_eq!(table.bucket_count(), 8);
        table.add(JsString::from("p8"), PropFlags::ALL, value(8));
        assert_eq!(table.bucket_count(), 16);
        for i in 0..9 {
            let name = format!("p{}", i);
            assert_eq!(table.find(&name, CaseMode::Sensitive), Some(PropId(i as u32)));
        }
    }

    #[test]
    fn test_case_insensitive_prefers_exact() {
        let mut table = PropertyTable::new();
        let upper = table.add(JsString::from("Foo"), PropFlags::ALL, value(1));
        let lower = table.add(JsString::from("foo"), PropFlags::ALL, value(2));
        assert_eq!(table.find("foo", CaseMode::Insensitive), Some(lower));
        assert_eq!(table.find("Foo", CaseMode::Insensitive), Some(upper));
        assert_eq!(table.find("FOO", CaseMode::Sensitive), None);
    }

    #[test]
    fn test_case_insensitive_collision_is_ambiguous() {
        let mut table = PropertyTable::new();
        table.add(JsString::from("Foo"), PropFlags::ALL, value(1));
        table.add(JsString::from("fOO"), PropFlags::ALL, value(2));
        let bar = table.add(JsString::from("Bar"), PropFlags::ALL, value(3));
        assert_eq!(table.find("FOO", CaseMode::Insensitive), None);
        assert!(table.is_ambiguous("FOO"));
        assert!(!table.is_ambiguous("Foo"));
        assert_eq!(table.find("BAR", CaseMode::Insensitive), Some(bar));
        assert!(!table.is_ambiguous("BAR"));
    }

    #[test]
    fn test_case_insensitive_ignores_tombstoned_variant() {
        let mut table = PropertyTable::new();
        let old = table.add(JsString::from("Foo"), PropFlags::ALL, value(1));
        let live = table.add(JsString::from("fOO"), PropFlags::ALL, value(2));
        table.tombstone(old);
        assert_eq!(table.find("FOO", CaseMode::Insensitive), Some(live));
        assert!(!table.is_ambiguous("FOO"));
    }

    #[test]
    fn test_tombstone_keeps_position() {
        let mut table = PropertyTable::new();
        let a = table.add(JsString::from("a"), PropFlags::ALL, value(1));
        table.add(JsString::from("b"), PropFlags::ALL, value(2));
        table.tombstone(a);
        assert_eq!(table.find("a", CaseMode::Sensitive), Some(a));
        assert!(table.kind(a).is_some_and(SlotKind::is_deleted));
        assert_eq!(table.find("A", CaseMode::Insensitive), None);
        let names: Vec<_> = table.iter().map(|(_, s)| s.name.to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
