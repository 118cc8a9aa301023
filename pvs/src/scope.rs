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

use serde::{Deserialize, Serialize};

use std::fmt::{self, Display};

use tracing::debug;

use crate::error::{PvsError, Result};
use crate::target::{Dim, Gress, Target};

/// Replication granularity along one dimension.
///
/// `All` shares one logical table across every value of the dimension.  `Single` gives each value
/// of the dimension an independent table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    All,
    Single,
}

impl Default for Scope {
    fn default() -> Self {
        Scope::All
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::All => write!(f, "ALL"),
            Scope::Single => write!(f, "SINGLE"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dimension {
    Pipe,
    Parser,
}

impl Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Pipe => write!(f, "pipe"),
            Dimension::Parser => write!(f, "parser"),
        }
    }
}

/// The scope of a parser value set along its three dimensions.
///
/// Pipe and parser scopes are kept per gress.  While the gress scope is `All`, the ingress and
/// egress settings are always equal, because the only way to reach `All` is from a symmetric
/// state and, under `All`, pipe and parser settings apply to both gresses at once.
///
/// Every setter takes the number of entries currently in the table and refuses to change
/// anything unless it is zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScopeConfig {
    gress: Scope,
    pipe: [Scope; 2],
    parser: [Scope; 2],
}

impl ScopeConfig {
    pub fn new() -> ScopeConfig {
        Self::default()
    }

    pub fn gress_scope(&self) -> Scope {
        self.gress
    }

    pub fn pipe_scope(&self, gress: Dim<Gress>) -> Result<Scope> {
        self.get(Dimension::Pipe, gress)
    }

    pub fn parser_scope(&self, gress: Dim<Gress>) -> Result<Scope> {
        self.get(Dimension::Parser, gress)
    }

    pub fn set_gress_scope(&mut self, scope: Scope, entries: usize) -> Result<()> {
        check_empty(entries)?;
        if scope == Scope::All
            && (self.pipe[0] != self.pipe[1] || self.parser[0] != self.parser[1])
        {
            return Err(PvsError::ScopeAsymmetry);
        }
        debug!("gress scope {} -> {}", self.gress, scope);
        self.gress = scope;
        Ok(())
    }

    pub fn set_pipe_scope(&mut self, gress: Dim<Gress>, scope: Scope, entries: usize) -> Result<()> {
        self.set(Dimension::Pipe, gress, scope, entries)
    }

    pub fn set_parser_scope(
        &mut self,
        gress: Dim<Gress>,
        scope: Scope,
        entries: usize,
    ) -> Result<()> {
        self.set(Dimension::Parser, gress, scope, entries)
    }

    /// Checks that `target` addresses the table the way writes must: with a wildcard in exactly
    /// the dimensions scoped `All` and a concrete id in exactly those scoped `Single`.  This does
    /// not check that concrete ids exist in the device.
    pub fn validate_write_target(&self, target: &Target) -> Result<()> {
        let fits = |dim_is_all: bool, scope: Scope| dim_is_all == (scope == Scope::All);

        // Under gress scope `All` the per-gress settings are symmetric, so either one will do.
        let gress = match target.gress {
            Dim::All => Gress::Ingress,
            Dim::One(gress) => gress,
        };
        if fits(target.gress.is_all(), self.gress)
            && fits(target.pipe.is_all(), self.pipe[gress.index()])
            && fits(target.parser.is_all(), self.parser[gress.index()])
        {
            Ok(())
        } else {
            Err(PvsError::InvalidTarget(*target))
        }
    }

    /// Returns the gresses that `gress` addresses for a pipe or parser setting, given the gress
    /// scope.
    fn addressed(&self, gress: Dim<Gress>) -> Result<Vec<Gress>> {
        match (self.gress, gress) {
            (Scope::All, Dim::All) => Ok(Gress::BOTH.to_vec()),
            (Scope::Single, Dim::One(gress)) => Ok(vec![gress]),
            (gress_scope, gress) => Err(PvsError::GressMismatch { gress, gress_scope }),
        }
    }

    fn slots(&mut self, dimension: Dimension) -> &mut [Scope; 2] {
        match dimension {
            Dimension::Pipe => &mut self.pipe,
            Dimension::Parser => &mut self.parser,
        }
    }

    fn get(&self, dimension: Dimension, gress: Dim<Gress>) -> Result<Scope> {
        let slots = match dimension {
            Dimension::Pipe => &self.pipe,
            Dimension::Parser => &self.parser,
        };
        match gress {
            Dim::One(gress) => Ok(slots[gress.index()]),
            Dim::All if self.gress == Scope::All => Ok(slots[Gress::Ingress.index()]),
            Dim::All => Err(PvsError::GressMismatch { gress, gress_scope: self.gress }),
        }
    }

    fn set(
        &mut self,
        dimension: Dimension,
        gress: Dim<Gress>,
        scope: Scope,
        entries: usize,
    ) -> Result<()> {
        check_empty(entries)?;
        let gresses = self.addressed(gress)?;
        let slots = self.slots(dimension);
        for g in gresses {
            debug!("{} {} scope {} -> {}", g, dimension, slots[g.index()], scope);
            slots[g.index()] = scope;
        }
        Ok(())
    }
}

fn check_empty(entries: usize) -> Result<()> {
    if entries > 0 {
        Err(PvsError::NonEmptyTable(entries))
    } else {
        Ok(())
    }
}
