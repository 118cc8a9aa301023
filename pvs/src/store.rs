/*
Copyright (c) 2022 VMware, Inc.
SPDX-License-Identifier: MIT
Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:
The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.
THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::error::{PvsError, Result};
use crate::scope::ScopeConfig;
use crate::target::{Handle, Target, Unit};
use crate::topology::Topology;

/// Hands out entry handles.  Clones share one counter, so stores built from clones of one
/// allocator never hand out the same handle.
#[derive(Clone, Debug, Default)]
pub struct HandleAllocator(Arc<AtomicU32>);

impl HandleAllocator {
    pub fn new() -> HandleAllocator {
        Self::default()
    }

    fn allocate(&self) -> Handle {
        Handle(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// A ternary entry and the units it occupies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    handle: Handle,
    value: u32,
    mask: u32,

    // Fixed at creation.  Scope can only change while the table is empty, so this never
    // disagrees with the scope in effect.
    membership: BTreeSet<Unit>,
}

impl Entry {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    pub fn membership(&self) -> &BTreeSet<Unit> {
        &self.membership
    }

    /// True if `field_value` agrees with this entry's value in every bit set in its mask.
    pub fn matches(&self, field_value: u32) -> bool {
        field_value & self.mask == self.value & self.mask
    }

    pub fn occupies(&self, unit: &Unit) -> bool {
        self.membership.contains(unit)
    }

    /// True if at least one of this entry's units falls within `target`.
    pub fn overlaps(&self, target: &Target) -> bool {
        self.membership.iter().any(|unit| target.matches(unit))
    }
}

/// The entries of one device's parser value set.
///
/// An entry added at a target occupies every unit in the target's group.  Only occupancy is
/// replicated, not content: each unit can hold `capacity` entries, and an entry added with a
/// fully wildcarded target takes a slot in every unit at once.
#[derive(Clone, Debug)]
pub struct EntryStore {
    topology: Arc<Topology>,
    capacity: usize,
    handles: HandleAllocator,
    entries: BTreeMap<Handle, Entry>,
    occupancy: HashMap<Unit, usize>,
}

impl EntryStore {
    pub fn new(topology: Arc<Topology>, capacity: usize, handles: HandleAllocator) -> EntryStore {
        EntryStore {
            topology,
            capacity,
            handles,
            entries: BTreeMap::new(),
            occupancy: HashMap::new(),
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Maximum number of entries per unit.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that occupy `unit`.
    pub fn occupancy(&self, unit: &Unit) -> usize {
        self.occupancy.get(unit).copied().unwrap_or(0)
    }

    /// Validates `target` as a write target under `scope` and returns the units it names.
    pub fn resolve(&self, scope: &ScopeConfig, target: &Target) -> Result<BTreeSet<Unit>> {
        scope.validate_write_target(target)?;
        if !self.topology.contains(target) {
            return Err(PvsError::InvalidTarget(*target));
        }
        Ok(self.topology.group(target))
    }

    pub fn add(
        &mut self,
        scope: &ScopeConfig,
        target: &Target,
        value: u32,
        mask: u32,
    ) -> Result<Handle> {
        let membership = self.resolve(scope, target)?;
        if let Some(handle) = self.conflict(&membership, value, mask, None) {
            return Err(PvsError::AlreadyExists { handle, value, mask });
        }
        if let Some(&unit) = membership.iter().find(|unit| self.occupancy(unit) >= self.capacity) {
            return Err(PvsError::CapacityExceeded { unit, capacity: self.capacity });
        }

        let handle = self.handles.allocate();
        for unit in &membership {
            *self.occupancy.entry(*unit).or_insert(0) += 1;
        }
        debug!("add {} value={:#x} mask={:#x} at {} ({} units)",
               handle, value, mask, target, membership.len());
        self.entries.insert(handle, Entry { handle, value, mask, membership });
        Ok(handle)
    }

    /// Replaces the value and mask of `handle`.  The entry keeps its units.
    pub fn modify(&mut self, handle: Handle, value: u32, mask: u32) -> Result<()> {
        let entry = self.entries.get(&handle).ok_or(PvsError::UnknownHandle(handle))?;
        if let Some(other) = self.conflict(&entry.membership, value, mask, Some(handle)) {
            return Err(PvsError::AlreadyExists { handle: other, value, mask });
        }
        if let Some(entry) = self.entries.get_mut(&handle) {
            debug!("modify {} value={:#x} mask={:#x}", handle, value, mask);
            entry.value = value;
            entry.mask = mask;
        }
        Ok(())
    }

    pub fn delete(&mut self, handle: Handle) -> Result<()> {
        let entry = self.entries.remove(&handle).ok_or(PvsError::UnknownHandle(handle))?;
        for unit in &entry.membership {
            if let Some(count) = self.occupancy.get_mut(unit) {
                *count -= 1;
                if *count == 0 {
                    self.occupancy.remove(unit);
                }
            }
        }
        debug!("delete {}", handle);
        Ok(())
    }

    /// Returns the value and mask of `handle`.
    pub fn get(&self, handle: Handle) -> Result<(u32, u32)> {
        self.entry(handle)
            .map(|entry| (entry.value, entry.mask))
            .ok_or(PvsError::UnknownHandle(handle))
    }

    pub fn entry(&self, handle: Handle) -> Option<&Entry> {
        self.entries.get(&handle)
    }

    /// Finds the entry with exactly `value` and `mask` that occupies every unit `target` names.
    pub fn lookup_handle(
        &self,
        scope: &ScopeConfig,
        target: &Target,
        value: u32,
        mask: u32,
    ) -> Result<Handle> {
        let units = self.resolve(scope, target)?;
        self.entries
            .values()
            .find(|e| e.value == value && e.mask == mask && e.membership.is_superset(&units))
            .map(Entry::handle)
            .ok_or(PvsError::NotFound)
    }

    /// The parser's view of the table: true if some entry in `unit` matches `field_value`.
    pub fn evaluate(&self, unit: &Unit, field_value: u32) -> bool {
        self.entries.values().any(|e| e.occupies(unit) && e.matches(field_value))
    }

    /// Iterates over all entries in handle order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Iterates, in handle order, over the entries whose handles follow `handle`.  `handle`
    /// itself need not exist.
    pub fn entries_after(&self, handle: Handle) -> impl Iterator<Item = &Entry> {
        self.entries
            .range((Bound::Excluded(handle), Bound::Unbounded))
            .map(|(_, entry)| entry)
    }

    /// Returns an entry, other than `except`, that shares a unit with `units` and has the same
    /// value and mask.
    fn conflict(
        &self,
        units: &BTreeSet<Unit>,
        value: u32,
        mask: u32,
        except: Option<Handle>,
    ) -> Option<Handle> {
        self.entries
            .values()
            .filter(|e| Some(e.handle) != except)
            .find(|e| e.value == value && e.mask == mask && !e.membership.is_disjoint(units))
            .map(Entry::handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;
    use crate::target::{Dim, Gress};

    fn store(capacity: usize) -> EntryStore {
        let topology = Topology::new(2, 2).unwrap();
        EntryStore::new(Arc::new(topology), capacity, HandleAllocator::new())
    }

    fn single_scope() -> ScopeConfig {
        let mut scope = ScopeConfig::new();
        scope.set_pipe_scope(Dim::All, Scope::Single, 0).unwrap();
        scope.set_parser_scope(Dim::All, Scope::Single, 0).unwrap();
        scope.set_gress_scope(Scope::Single, 0).unwrap();
        scope
    }

    #[test]
    fn add_get_delete() {
        let scope = ScopeConfig::new();
        let mut store = store(4);
        let h = store.add(&scope, &Target::ALL, 0x8100, 0xffff).unwrap();
        assert_eq!(store.get(h), Ok((0x8100, 0xffff)));
        assert_eq!(store.entry(h).unwrap().membership().len(), 8);
        assert_eq!(store.occupancy(&Unit::new(Gress::Egress, 1, 1)), 1);

        store.delete(h).unwrap();
        assert_eq!(store.get(h), Err(PvsError::UnknownHandle(h)));
        assert_eq!(store.delete(h), Err(PvsError::UnknownHandle(h)));
        assert_eq!(store.occupancy(&Unit::new(Gress::Egress, 1, 1)), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn handles_are_not_reused() {
        let scope = ScopeConfig::new();
        let mut store = store(4);
        let h1 = store.add(&scope, &Target::ALL, 1, 0xff).unwrap();
        store.delete(h1).unwrap();
        let h2 = store.add(&scope, &Target::ALL, 1, 0xff).unwrap();
        assert!(h2 > h1);
    }

    #[test]
    fn capacity_is_per_unit() {
        // Under ALL scope every entry occupies every unit.
        let mut all = store(2);
        let scope = ScopeConfig::new();
        all.add(&scope, &Target::ALL, 1, 0xff).unwrap();
        all.add(&scope, &Target::ALL, 2, 0xff).unwrap();
        assert!(matches!(all.add(&scope, &Target::ALL, 3, 0xff),
                         Err(PvsError::CapacityExceeded { capacity: 2, .. })));

        // Under SINGLE scope each unit fills up on its own.
        let mut single = store(2);
        let scope = single_scope();
        let unit = Unit::new(Gress::Ingress, 0, 1);
        let target = Target::unit(unit);
        single.add(&scope, &target, 1, 0xff).unwrap();
        single.add(&scope, &target, 2, 0xff).unwrap();
        assert_eq!(single.add(&scope, &target, 3, 0xff),
                   Err(PvsError::CapacityExceeded { unit, capacity: 2 }));
        let other = Target::unit(Unit::new(Gress::Egress, 0, 1));
        single.add(&scope, &other, 3, 0xff).unwrap();
        assert_eq!(single.len(), 3);
    }

    #[test]
    fn duplicate_keys_rejected_within_a_unit() {
        let scope = single_scope();
        let mut store = store(4);
        let a = Target::unit(Unit::new(Gress::Ingress, 0, 0));
        let b = Target::unit(Unit::new(Gress::Ingress, 1, 0));
        let h = store.add(&scope, &a, 0x800, 0xfff).unwrap();
        assert_eq!(store.add(&scope, &a, 0x800, 0xfff),
                   Err(PvsError::AlreadyExists { handle: h, value: 0x800, mask: 0xfff }));
        let h2 = store.add(&scope, &a, 0x800, 0xff0).unwrap();
        store.add(&scope, &b, 0x800, 0xfff).unwrap();
        assert_eq!(store.modify(h2, 0x800, 0xfff),
                   Err(PvsError::AlreadyExists { handle: h, value: 0x800, mask: 0xfff }));
    }

    #[test]
    fn modify_keeps_membership() {
        let scope = single_scope();
        let mut store = store(1);
        let unit = Unit::new(Gress::Egress, 1, 0);
        let h = store.add(&scope, &Target::unit(unit), 0x86dd, 0xffff).unwrap();
        store.modify(h, 0x88a8, 0xffff).unwrap();
        assert_eq!(store.get(h), Ok((0x88a8, 0xffff)));
        assert_eq!(store.occupancy(&unit), 1);
        assert!(store.entry(h).unwrap().occupies(&unit));
        assert_eq!(store.modify(Handle(999), 0, 0), Err(PvsError::UnknownHandle(Handle(999))));
    }

    #[test]
    fn invalid_targets() {
        let scope = single_scope();
        let mut store = store(4);
        let missing_pipe = Target::unit(Unit::new(Gress::Ingress, 2, 0));
        assert_eq!(store.add(&scope, &missing_pipe, 1, 1),
                   Err(PvsError::InvalidTarget(missing_pipe)));
        assert_eq!(store.add(&scope, &Target::ALL, 1, 1),
                   Err(PvsError::InvalidTarget(Target::ALL)));
        assert!(store.is_empty());
    }

    #[test]
    fn lookup() {
        let mut scope = ScopeConfig::new();
        scope.set_pipe_scope(Dim::All, Scope::Single, 0).unwrap();
        let mut store = store(4);
        let pipe0 = Target::ALL.with_pipe(0);
        let pipe1 = Target::ALL.with_pipe(1);
        let h = store.add(&scope, &pipe0, 0x9100, 0xffff).unwrap();
        assert_eq!(store.lookup_handle(&scope, &pipe0, 0x9100, 0xffff), Ok(h));
        assert_eq!(store.lookup_handle(&scope, &pipe1, 0x9100, 0xffff), Err(PvsError::NotFound));
        assert_eq!(store.lookup_handle(&scope, &pipe0, 0x9100, 0xff00), Err(PvsError::NotFound));
        assert_eq!(store.lookup_handle(&scope, &Target::ALL, 0x9100, 0xffff),
                   Err(PvsError::InvalidTarget(Target::ALL)));
    }

    #[test]
    fn ternary_evaluation() {
        let scope = ScopeConfig::new();
        let mut store = store(4);
        store.add(&scope, &Target::ALL, 0x8100, 0xff00).unwrap();
        let unit = Unit::new(Gress::Ingress, 1, 1);
        assert!(store.evaluate(&unit, 0x8100));
        assert!(store.evaluate(&unit, 0x81ff));
        assert!(!store.evaluate(&unit, 0x8800));
    }

    #[test]
    fn shared_allocator() {
        let handles = HandleAllocator::new();
        let topology = Arc::new(Topology::new(1, 1).unwrap());
        let mut a = EntryStore::new(topology.clone(), 1, handles.clone());
        let mut b = EntryStore::new(topology, 1, handles);
        let scope = ScopeConfig::new();
        let ha = a.add(&scope, &Target::ALL, 1, 1).unwrap();
        let hb = b.add(&scope, &Target::ALL, 1, 1).unwrap();
        assert_ne!(ha, hb);
        assert_eq!(b.get(ha), Err(PvsError::UnknownHandle(ha)));
    }
}
