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

use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::config::Config;
use crate::enumerate::Enumerator;
use crate::error::{ConfigError, DeviceId, PvsError, Result};
use crate::scope::{Scope, ScopeConfig};
use crate::session::{Applied, Session, Update};
use crate::store::{EntryStore, HandleAllocator};
use crate::target::{Dim, Gress, Handle, Target, Unit};
use crate::topology::Topology;

/// One device's parser value set: its scope and its entries.
pub struct Device {
    device_id: DeviceId,
    table: String,
    scope: ScopeConfig,
    store: EntryStore,
}

impl Device {
    pub fn new(
        device_id: DeviceId,
        table: &str,
        topology: Arc<Topology>,
        capacity: usize,
        handles: HandleAllocator,
    ) -> Device {
        Device {
            device_id,
            table: table.into(),
            scope: ScopeConfig::new(),
            store: EntryStore::new(topology, capacity, handles),
        }
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Name of the parser value set, e.g. `pvs_ethertype`.
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn scope(&self) -> &ScopeConfig {
        &self.scope
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn enumerator(&self) -> Enumerator<'_> {
        Enumerator::new(&self.store, &self.scope)
    }

    pub fn set_gress_scope(&mut self, scope: Scope) -> Result<()> {
        self.scope.set_gress_scope(scope, self.store.len())
    }

    pub fn set_pipe_scope(&mut self, gress: Dim<Gress>, scope: Scope) -> Result<()> {
        self.scope.set_pipe_scope(gress, scope, self.store.len())
    }

    pub fn set_parser_scope(&mut self, gress: Dim<Gress>, scope: Scope) -> Result<()> {
        self.scope.set_parser_scope(gress, scope, self.store.len())
    }

    fn apply(&mut self, update: &Update) -> Result<Applied> {
        match *update {
            Update::Add { target, value, mask } =>
                self.store.add(&self.scope, &target, value, mask).map(Applied::Added),
            Update::Modify { handle, value, mask } =>
                self.store.modify(handle, value, mask).map(|()| Applied::Modified(handle)),
            Update::Delete { handle } =>
                self.store.delete(handle).map(|()| Applied::Deleted(handle)),
        }
    }
}

/// The devices of a switch, each with its own parser value set.
///
/// Cloning a `Switch` yields another reference to the same devices.  Every operation locks the
/// devices for its duration.  Entry handles come from one allocator shared by all the devices,
/// so a handle identifies an entry across the whole switch.
#[derive(Clone, Default)]
pub struct Switch {
    handles: HandleAllocator,
    devices: Arc<Mutex<HashMap<DeviceId, Device>>>,
}

impl Switch {
    pub fn new() -> Switch {
        Self::default()
    }

    pub fn from_config(config: &Config) -> std::result::Result<Switch, ConfigError> {
        let switch = Switch::new();
        for device in &config.devices {
            let topology = Topology::try_from(&device.topology)?;
            switch.add_device(device.device_id, &device.table, topology, device.capacity)?;
        }
        Ok(switch)
    }

    pub fn add_device(
        &self,
        device_id: DeviceId,
        table: &str,
        topology: Topology,
        capacity: usize,
    ) -> std::result::Result<(), ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity(device_id));
        }
        let mut devices = self.lock();
        if devices.contains_key(&device_id) {
            return Err(ConfigError::DuplicateDevice(device_id));
        }
        info!("device {}: {} with {} pipes, {} parsers per pipe, {} entries per parser",
              device_id, table, topology.num_pipes(), topology.parsers_per_pipe(), capacity);
        let device = Device::new(device_id, table, Arc::new(topology), capacity,
                                 self.handles.clone());
        devices.insert(device_id, device);
        Ok(())
    }

    /// Returns the configured device ids in increasing order.
    pub fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Starts a batch of updates to `device_id`.
    pub fn session(&self, device_id: DeviceId) -> Session {
        Session::new(self.clone(), device_id)
    }

    pub fn get_gress_scope(&self, device_id: DeviceId) -> Result<Scope> {
        self.with_device(device_id, |d| Ok(d.scope.gress_scope()))
    }

    pub fn set_gress_scope(&self, device_id: DeviceId, scope: Scope) -> Result<()> {
        self.with_device_mut(device_id, |d| d.set_gress_scope(scope))
    }

    pub fn get_pipe_scope(&self, device_id: DeviceId, gress: Dim<Gress>) -> Result<Scope> {
        self.with_device(device_id, |d| d.scope.pipe_scope(gress))
    }

    pub fn set_pipe_scope(&self, device_id: DeviceId, gress: Dim<Gress>, scope: Scope)
                          -> Result<()> {
        self.with_device_mut(device_id, |d| d.set_pipe_scope(gress, scope))
    }

    pub fn get_parser_scope(&self, device_id: DeviceId, gress: Dim<Gress>) -> Result<Scope> {
        self.with_device(device_id, |d| d.scope.parser_scope(gress))
    }

    pub fn set_parser_scope(&self, device_id: DeviceId, gress: Dim<Gress>, scope: Scope)
                            -> Result<()> {
        self.with_device_mut(device_id, |d| d.set_parser_scope(gress, scope))
    }

    pub fn get(&self, device_id: DeviceId, handle: Handle) -> Result<(u32, u32)> {
        self.with_device(device_id, |d| d.store.get(handle))
    }

    pub fn lookup_handle(&self, device_id: DeviceId, target: &Target, value: u32, mask: u32)
                         -> Result<Handle> {
        self.with_device(device_id, |d| d.store.lookup_handle(&d.scope, target, value, mask))
    }

    pub fn get_count(&self, device_id: DeviceId, target: &Target) -> Result<u32> {
        self.with_device(device_id, |d| d.enumerator().get_count(target))
    }

    pub fn get_first(&self, device_id: DeviceId, target: &Target) -> Result<Handle> {
        self.with_device(device_id, |d| d.enumerator().get_first(target))
    }

    pub fn get_next(&self, device_id: DeviceId, handle: Handle, target: &Target, n: usize)
                    -> Result<Vec<Handle>> {
        self.with_device(device_id, |d| d.enumerator().get_next(handle, target, n))
    }

    /// Number of entries in the device's table.
    pub fn len(&self, device_id: DeviceId) -> Result<usize> {
        self.with_device(device_id, |d| Ok(d.store.len()))
    }

    pub fn occupancy(&self, device_id: DeviceId, unit: &Unit) -> Result<usize> {
        self.with_device(device_id, |d| Ok(d.store.occupancy(unit)))
    }

    /// Reports whether the parser at `unit` would match `field_value`.
    pub fn evaluate(&self, device_id: DeviceId, unit: &Unit, field_value: u32) -> Result<bool> {
        self.with_device(device_id, |d| Ok(d.store.evaluate(unit, field_value)))
    }

    /// Like [`evaluate`](Self::evaluate), for the parser that serves `port` in `gress`.
    pub fn evaluate_port(&self, device_id: DeviceId, gress: Gress, port: u32, field_value: u32)
                         -> Result<bool> {
        self.with_device(device_id, |d| {
            let (pipe, parser) = d.store.topology().locate(port)
                .ok_or(PvsError::UnknownPort { device_id, port })?;
            Ok(d.store.evaluate(&Unit { gress, pipe, parser }, field_value))
        })
    }

    pub(crate) fn commit(&self, device_id: DeviceId, updates: Vec<Update>)
                         -> Result<Vec<Result<Applied>>> {
        self.with_device_mut(device_id, |device| {
            let results: Vec<Result<Applied>> = updates.iter()
                .map(|update| {
                    let result = device.apply(update);
                    if let Err(ref error) = result {
                        warn!("device {}: {} failed ({})", device_id, update, error);
                    }
                    result
                })
                .collect();
            let failures = results.iter().filter(|r| r.is_err()).count();
            info!("device {}: committed {} updates, {} failed", device_id, results.len(), failures);
            Ok(results)
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceId, Device>> {
        // Operations leave a device consistent even if a caller panics mid-call.
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_device<T, F>(&self, device_id: DeviceId, f: F) -> Result<T>
        where F: FnOnce(&Device) -> Result<T>
    {
        let devices = self.lock();
        let device = devices.get(&device_id).ok_or(PvsError::UnknownDevice(device_id))?;
        f(device)
    }

    fn with_device_mut<T, F>(&self, device_id: DeviceId, f: F) -> Result<T>
        where F: FnOnce(&mut Device) -> Result<T>
    {
        let mut devices = self.lock();
        let device = devices.get_mut(&device_id).ok_or(PvsError::UnknownDevice(device_id))?;
        f(device)
    }
}
