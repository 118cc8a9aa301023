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

use itertools::iproduct;

use std::collections::{BTreeMap, BTreeSet};

use crate::error::ConfigError;
use crate::target::{Dim, Gress, ParserId, PipeId, Target, Unit};

/// The device's fixed layout: how many pipes it has, how many parsers each pipe has, and which
/// pipe and parser serve each front-panel port.
///
/// A `Topology` is built once from configuration and never changes afterward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    pipes: u8,
    parsers_per_pipe: u8,
    ports: BTreeMap<u32, (PipeId, ParserId)>,
}

impl Topology {
    pub fn new(pipes: u8, parsers_per_pipe: u8) -> Result<Topology, ConfigError> {
        if pipes == 0 || parsers_per_pipe == 0 {
            return Err(ConfigError::EmptyTopology);
        }
        Ok(Topology { pipes, parsers_per_pipe, ports: BTreeMap::new() })
    }

    /// Maps `port` to `pipe` and `parser`, replacing any earlier mapping for `port`.
    pub fn with_port(mut self, port: u32, pipe: u8, parser: u8) -> Result<Topology, ConfigError> {
        if pipe >= self.pipes || parser >= self.parsers_per_pipe {
            return Err(ConfigError::PortOutOfRange { port, pipe, parser });
        }
        self.ports.insert(port, (PipeId(pipe), ParserId(parser)));
        Ok(self)
    }

    pub fn num_pipes(&self) -> u8 {
        self.pipes
    }

    pub fn parsers_per_pipe(&self) -> u8 {
        self.parsers_per_pipe
    }

    pub fn pipes(&self) -> impl Iterator<Item = PipeId> {
        (0..self.pipes).map(PipeId)
    }

    pub fn parsers(&self) -> impl Iterator<Item = ParserId> {
        (0..self.parsers_per_pipe).map(ParserId)
    }

    /// Returns the pipe and parser that serve `port`, if the port is known.
    pub fn locate(&self, port: u32) -> Option<(PipeId, ParserId)> {
        self.ports.get(&port).copied()
    }

    /// Returns the known ports served by `pipe`, in increasing order.
    pub fn ports_in_pipe(&self, pipe: PipeId) -> impl Iterator<Item = u32> + '_ {
        self.ports
            .iter()
            .filter(move |(_, (p, _))| *p == pipe)
            .map(|(&port, _)| port)
    }

    /// True if every concrete pipe and parser id in `target` exists.
    pub fn contains(&self, target: &Target) -> bool {
        let pipe_ok = match target.pipe {
            Dim::All => true,
            Dim::One(PipeId(p)) => p < self.pipes,
        };
        let parser_ok = match target.parser {
            Dim::All => true,
            Dim::One(ParserId(p)) => p < self.parsers_per_pipe,
        };
        pipe_ok && parser_ok
    }

    /// Expands `target` into the units it names.  Wildcards expand to every gress, pipe, or
    /// parser.  The caller must ensure that [`contains`](Self::contains) holds.
    pub fn group(&self, target: &Target) -> BTreeSet<Unit> {
        let gresses: Vec<Gress> = match target.gress {
            Dim::All => Gress::BOTH.to_vec(),
            Dim::One(gress) => vec![gress],
        };
        let pipes: Vec<PipeId> = match target.pipe {
            Dim::All => self.pipes().collect(),
            Dim::One(pipe) => vec![pipe],
        };
        let parsers: Vec<ParserId> = match target.parser {
            Dim::All => self.parsers().collect(),
            Dim::One(parser) => vec![parser],
        };
        iproduct!(gresses, pipes, parsers)
            .map(|(gress, pipe, parser)| Unit { gress, pipe, parser })
            .collect()
    }

    /// Every unit in the device.
    pub fn units(&self) -> BTreeSet<Unit> {
        self.group(&Target::ALL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology() -> Topology {
        Topology::new(4, 2)
            .and_then(|t| t.with_port(0, 0, 0))
            .and_then(|t| t.with_port(4, 0, 1))
            .and_then(|t| t.with_port(128, 1, 0))
            .unwrap()
    }

    #[test]
    fn group_sizes() {
        let t = topology();
        assert_eq!(t.units().len(), 2 * 4 * 2);
        assert_eq!(t.group(&Target::ALL.with_gress(Gress::Ingress)).len(), 8);
        assert_eq!(t.group(&Target::ALL.with_gress(Gress::Egress).with_pipe(3)).len(), 2);
        assert_eq!(t.group(&Target::ALL.with_parser(1)).len(), 8);

        let unit = Unit::new(Gress::Egress, 2, 1);
        assert_eq!(t.group(&Target::unit(unit)).into_iter().collect::<Vec<_>>(), vec![unit]);
    }

    #[test]
    fn ports() {
        let t = topology();
        assert_eq!(t.locate(4), Some((PipeId(0), ParserId(1))));
        assert_eq!(t.locate(5), None);
        assert_eq!(t.ports_in_pipe(PipeId(0)).collect::<Vec<_>>(), vec![0, 4]);
        assert_eq!(t.ports_in_pipe(PipeId(3)).count(), 0);
    }

    #[test]
    fn bad_topologies() {
        assert_eq!(Topology::new(0, 4), Err(ConfigError::EmptyTopology));
        assert_eq!(Topology::new(4, 0), Err(ConfigError::EmptyTopology));
        assert_eq!(
            Topology::new(2, 2).and_then(|t| t.with_port(9, 2, 0)),
            Err(ConfigError::PortOutOfRange { port: 9, pipe: 2, parser: 0 })
        );
    }

    #[test]
    fn contains() {
        let t = topology();
        assert!(t.contains(&Target::ALL));
        assert!(t.contains(&Target::ALL.with_pipe(3).with_parser(1)));
        assert!(!t.contains(&Target::ALL.with_pipe(4)));
        assert!(!t.contains(&Target::ALL.with_parser(2)));
    }
}
