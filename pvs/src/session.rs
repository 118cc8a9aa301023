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

use serde::Serialize;

use std::fmt::{self, Display};

use crate::error::{DeviceId, Result};
use crate::switch::Switch;
use crate::target::{Handle, Target};

/// A mutation staged in a [`Session`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Update {
    Add { target: Target, value: u32, mask: u32 },
    Modify { handle: Handle, value: u32, mask: u32 },
    Delete { handle: Handle },
}

impl Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Add { target, value, mask } =>
                write!(f, "add {:#x}/{:#x} at {}", value, mask, target),
            Update::Modify { handle, value, mask } =>
                write!(f, "modify {} to {:#x}/{:#x}", handle, value, mask),
            Update::Delete { handle } => write!(f, "delete {}", handle),
        }
    }
}

/// The outcome of one successfully applied [`Update`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Applied {
    Added(Handle),
    Modified(Handle),
    Deleted(Handle),
}

impl Applied {
    pub fn handle(&self) -> Handle {
        match *self {
            Applied::Added(h) | Applied::Modified(h) | Applied::Deleted(h) => h,
        }
    }
}

/// A batch of updates to one device.
///
/// Staging an update has no effect on the device: readers and the parser keep seeing the table as
/// it was until [`commit`](Session::commit).  Dropping a session discards whatever it staged.
pub struct Session {
    switch: Switch,
    device_id: DeviceId,
    updates: Vec<Update>,
}

impl Session {
    pub(crate) fn new(switch: Switch, device_id: DeviceId) -> Session {
        Session { switch, device_id, updates: Vec::new() }
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Stages `update` and returns its position in the results of `commit`.
    pub fn stage(&mut self, update: Update) -> usize {
        self.updates.push(update);
        self.updates.len() - 1
    }

    pub fn add(&mut self, target: Target, value: u32, mask: u32) -> usize {
        self.stage(Update::Add { target, value, mask })
    }

    pub fn modify(&mut self, handle: Handle, value: u32, mask: u32) -> usize {
        self.stage(Update::Modify { handle, value, mask })
    }

    pub fn delete(&mut self, handle: Handle) -> usize {
        self.stage(Update::Delete { handle })
    }

    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    /// Applies the staged updates in order and returns one result per update.
    ///
    /// The batch is not atomic.  A failed update leaves the table as it was before that update,
    /// updates before it stay applied, and updates after it are still attempted.  Fails as a
    /// whole only if the device does not exist.
    pub fn commit(self) -> Result<Vec<Result<Applied>>> {
        self.switch.commit(self.device_id, self.updates)
    }
}
