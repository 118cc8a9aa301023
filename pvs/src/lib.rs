/*!
Parser value sets for programmable switch parsers.

A parser value set (PVS) is a small ternary match table that a packet parser consults to decide
how to interpret a header field, such as the EtherType.  The table is physically replicated in
every parser of the device, and its *scope* controls how the replicas are shared along three
dimensions:

  - gress: one table for ingress and egress together, or one per gress;
  - pipe: one table across all pipes, or one per pipe;
  - parser: one table across all parsers of a pipe, or one per parser.

Writes address the table through a [`Target`] that must have a wildcard in exactly the
dimensions scoped [`Scope::All`] and a concrete id in exactly those scoped [`Scope::Single`].  An
entry occupies one slot in every physical [`Unit`] its target names, and each unit holds a
limited number of entries.

The main entry point is [`Switch`], which holds each device's [`ScopeConfig`] and [`EntryStore`].
Mutations go through a [`Session`] and become visible only when it is committed.  The
[`script`] module and the `pvsctl` program drive a switch from JSON.
*/
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

mod config;
mod enumerate;
mod error;
mod scope;
mod session;
mod store;
mod switch;
mod target;
mod topology;

pub mod script;

pub use config::{Config, DeviceConfig, TopologyConfig};
pub use enumerate::Enumerator;
pub use error::{ConfigError, DeviceId, PvsError, Result};
pub use scope::{Scope, ScopeConfig};
pub use session::{Applied, Session, Update};
pub use store::{Entry, EntryStore, HandleAllocator};
pub use switch::{Device, Switch};
pub use target::{Dim, Gress, Handle, ParserId, PipeId, Target, Unit};
pub use topology::Topology;
