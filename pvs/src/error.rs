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

use thiserror::Error;

use crate::scope::Scope;
use crate::target::{Dim, Gress, Handle, Target, Unit};

/// Identifies a switch device.
pub type DeviceId = u64;

/// Error that can arise operating on a parser value set.
///
/// None of these is fatal.  The table is unchanged by a failed operation, so the caller may
/// correct the condition and retry.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PvsError {
    /// A wildcard or concrete id in the target does not fit the current scope, or a concrete id
    /// names a pipe or parser that does not exist.
    #[error("target {0} does not fit the table's scope")]
    InvalidTarget(Target),

    /// A pipe or parser scope was addressed with a gress id inconsistent with the gress scope.
    #[error("gress {gress} cannot be used while gress scope is {gress_scope}")]
    GressMismatch { gress: Dim<Gress>, gress_scope: Scope },

    /// Gress scope cannot become `ALL` while ingress and egress are scoped differently.
    #[error("pipe and parser scopes differ between ingress and egress")]
    ScopeAsymmetry,

    /// Scope cannot change while the table holds entries.
    #[error("table holds {0} entries")]
    NonEmptyTable(usize),

    #[error("{unit} is full ({capacity} entries)")]
    CapacityExceeded { unit: Unit, capacity: usize },

    /// An entry with the same value and mask already occupies one of the units.
    #[error("value {value:#x} mask {mask:#x} already exists as entry {handle}")]
    AlreadyExists { handle: Handle, value: u32, mask: u32 },

    #[error("unknown entry {0}")]
    UnknownHandle(Handle),

    #[error("no matching entry")]
    NotFound,

    #[error("unknown device {0}")]
    UnknownDevice(DeviceId),

    #[error("device {device_id} has no port {port}")]
    UnknownPort { device_id: DeviceId, port: u32 },
}

pub type Result<T> = std::result::Result<T, PvsError>;

/// Error that can arise building a switch from its configuration.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("device {0}: capacity must be positive")]
    ZeroCapacity(DeviceId),

    #[error("topology must have at least one pipe and one parser per pipe")]
    EmptyTopology,

    #[error("port {port} maps to pipe {pipe} parser {parser}, outside the topology")]
    PortOutOfRange { port: u32, pipe: u8, parser: u8 },

    #[error("device {0} is configured more than once")]
    DuplicateDevice(DeviceId),
}
