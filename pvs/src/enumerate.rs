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

//! Enumeration of parser value set entries.
//!
//! Enumeration keeps no state between calls.  A walk starts with [`Enumerator::get_first`] and
//! continues with [`Enumerator::get_next`], passing the last handle seen, until `get_next`
//! reports [`PvsError::NotFound`].  Entries are visited in handle order, which is creation order,
//! so a walk never repeats a handle and concurrent walks over different targets cannot interfere.

use crate::error::{PvsError, Result};
use crate::scope::ScopeConfig;
use crate::store::{Entry, EntryStore};
use crate::target::{Handle, Target};

pub struct Enumerator<'a> {
    store: &'a EntryStore,
    scope: &'a ScopeConfig,
}

impl<'a> Enumerator<'a> {
    pub fn new(store: &'a EntryStore, scope: &'a ScopeConfig) -> Enumerator<'a> {
        Enumerator { store, scope }
    }

    /// Counts the entries that occupy at least one unit within `target`.
    ///
    /// Unlike the other operations, this accepts any combination of wildcards regardless of
    /// scope.  It only rejects concrete ids that the device does not have.
    pub fn get_count(&self, target: &Target) -> Result<u32> {
        if !self.store.topology().contains(target) {
            return Err(PvsError::InvalidTarget(*target));
        }
        Ok(self.store.entries().filter(|e| e.overlaps(target)).count() as u32)
    }

    /// Returns the first entry within `target`, which must be a valid write target.
    pub fn get_first(&self, target: &Target) -> Result<Handle> {
        self.validate(target)?;
        self.store
            .entries()
            .find(|e| e.overlaps(target))
            .map(Entry::handle)
            .ok_or(PvsError::NotFound)
    }

    /// Returns up to `n` entries within `target` that follow `handle`, or `NotFound` if there are
    /// none.
    pub fn get_next(&self, handle: Handle, target: &Target, n: usize) -> Result<Vec<Handle>> {
        self.validate(target)?;
        let mut following = self.store.entries_after(handle).filter(|e| e.overlaps(target)).peekable();
        if following.peek().is_none() {
            return Err(PvsError::NotFound);
        }
        Ok(following.take(n).map(Entry::handle).collect())
    }

    fn validate(&self, target: &Target) -> Result<()> {
        self.scope.validate_write_target(target)?;
        if self.store.topology().contains(target) {
            Ok(())
        } else {
            Err(PvsError::InvalidTarget(*target))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Scope;
    use crate::store::HandleAllocator;
    use crate::target::{Dim, Gress};
    use crate::topology::Topology;
    use std::sync::Arc;

    #[test]
    fn single_entry_walk() {
        let scope = ScopeConfig::new();
        let mut store = EntryStore::new(Arc::new(Topology::new(4, 4).unwrap()), 4,
                                        HandleAllocator::new());
        let h0 = store.add(&scope, &Target::ALL, 0x8100, 0xffff).unwrap();

        let e = Enumerator::new(&store, &scope);
        assert_eq!(e.get_count(&Target::ALL), Ok(1));
        assert_eq!(e.get_first(&Target::ALL), Ok(h0));
        assert_eq!(e.get_next(h0, &Target::ALL, 1), Err(PvsError::NotFound));
    }

    #[test]
    fn count_is_scope_tolerant() {
        let mut scope = ScopeConfig::new();
        scope.set_gress_scope(Scope::Single, 0).unwrap();
        scope.set_pipe_scope(Dim::One(Gress::Ingress), Scope::Single, 0).unwrap();
        let mut store = EntryStore::new(Arc::new(Topology::new(2, 1).unwrap()), 4,
                                        HandleAllocator::new());
        let ingress1 = Target::ALL.with_gress(Gress::Ingress).with_pipe(1);
        let egress = Target::ALL.with_gress(Gress::Egress);
        store.add(&scope, &ingress1, 1, 1).unwrap();
        store.add(&scope, &egress, 2, 2).unwrap();

        let e = Enumerator::new(&store, &scope);
        assert_eq!(e.get_count(&Target::ALL), Ok(2));
        assert_eq!(e.get_count(&Target::ALL.with_pipe(1)), Ok(2));
        assert_eq!(e.get_count(&Target::ALL.with_pipe(0)), Ok(1));
        assert_eq!(e.get_count(&Target::ALL.with_gress(Gress::Ingress)), Ok(1));
        assert_eq!(e.get_count(&Target::ALL.with_pipe(2)),
                   Err(PvsError::InvalidTarget(Target::ALL.with_pipe(2))));

        // Walks need targets that could have been written.
        assert_eq!(e.get_first(&Target::ALL), Err(PvsError::InvalidTarget(Target::ALL)));
        assert!(e.get_first(&ingress1).is_ok());
        assert_eq!(e.get_first(&Target::ALL.with_gress(Gress::Ingress).with_pipe(0)),
                   Err(PvsError::NotFound));
    }

    #[test]
    fn next_from_deleted_handle() {
        let scope = ScopeConfig::new();
        let mut store = EntryStore::new(Arc::new(Topology::new(1, 1).unwrap()), 8,
                                        HandleAllocator::new());
        let handles: Vec<Handle> = (0..4)
            .map(|v| store.add(&scope, &Target::ALL, v, 0xf).unwrap())
            .collect();
        store.delete(handles[1]).unwrap();

        let e = Enumerator::new(&store, &scope);
        assert_eq!(e.get_next(handles[1], &Target::ALL, 8), Ok(vec![handles[2], handles[3]]));
        assert_eq!(e.get_next(handles[0], &Target::ALL, 1), Ok(vec![handles[2]]));
        assert_eq!(e.get_next(handles[3], &Target::ALL, 8), Err(PvsError::NotFound));
    }
}
