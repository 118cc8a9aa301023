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

//! Coordinates used to address a parser value set: gresses, pipes, parsers, the physical units
//! they name, and the (possibly wildcarded) targets that select groups of units.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use std::fmt::{self, Display};

/// Direction of processing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gress {
    Ingress,
    Egress,
}

impl Gress {
    /// Both gresses, ingress first.
    pub const BOTH: [Gress; 2] = [Gress::Ingress, Gress::Egress];

    pub(crate) fn index(self) -> usize {
        match self {
            Gress::Ingress => 0,
            Gress::Egress => 1,
        }
    }
}

impl Display for Gress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gress::Ingress => write!(f, "ingress"),
            Gress::Egress => write!(f, "egress"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipeId(pub u8);

impl Display for PipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A parser within a pipe.  Parser ids restart from zero in every pipe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParserId(pub u8);

impl Display for ParserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A physical unit: one parser, in one pipe, in one gress.  Each unit holds its own copy of the
/// parser value set and so has its own capacity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Unit {
    pub gress: Gress,
    pub pipe: PipeId,
    pub parser: ParserId,
}

impl Unit {
    pub fn new(gress: Gress, pipe: u8, parser: u8) -> Unit {
        Unit { gress, pipe: PipeId(pipe), parser: ParserId(parser) }
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/pipe{}/parser{}", self.gress, self.pipe, self.parser)
    }
}

/// One dimension of a [`Target`]: either a wildcard or a concrete id.
///
/// In JSON, the wildcard is the string `"all"` and a concrete id is written as itself.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Dim<T> {
    All,
    One(T),
}

impl<T> Dim<T> {
    pub fn is_all(&self) -> bool {
        matches!(self, Dim::All)
    }
}

impl<T: PartialEq> Dim<T> {
    /// True if `value` falls within this dimension.
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Dim::All => true,
            Dim::One(v) => v == value,
        }
    }
}

impl<T> Default for Dim<T> {
    fn default() -> Self {
        Dim::All
    }
}

impl<T> From<T> for Dim<T> {
    fn from(value: T) -> Self {
        Dim::One(value)
    }
}

impl<T: Display> Display for Dim<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::All => write!(f, "all"),
            Dim::One(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum Wildcard {
    All,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DimRepr<T> {
    All(Wildcard),
    One(T),
}

impl<T: Serialize> Serialize for Dim<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Dim::All => serializer.serialize_str("all"),
            Dim::One(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Dim<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match DimRepr::<T>::deserialize(deserializer)? {
            DimRepr::All(Wildcard::All) => Dim::All,
            DimRepr::One(v) => Dim::One(v),
        })
    }
}

/// A query or write coordinate.  Omitted dimensions are wildcards.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Target {
    pub gress: Dim<Gress>,
    pub pipe: Dim<PipeId>,
    pub parser: Dim<ParserId>,
}

impl Target {
    /// The target that names every unit.
    pub const ALL: Target = Target { gress: Dim::All, pipe: Dim::All, parser: Dim::All };

    pub fn new(gress: Dim<Gress>, pipe: Dim<PipeId>, parser: Dim<ParserId>) -> Target {
        Target { gress, pipe, parser }
    }

    /// The target that names exactly `unit`.
    pub fn unit(unit: Unit) -> Target {
        Target {
            gress: Dim::One(unit.gress),
            pipe: Dim::One(unit.pipe),
            parser: Dim::One(unit.parser),
        }
    }

    pub fn with_gress(self, gress: Gress) -> Target {
        Target { gress: Dim::One(gress), ..self }
    }

    pub fn with_pipe(self, pipe: u8) -> Target {
        Target { pipe: Dim::One(PipeId(pipe)), ..self }
    }

    pub fn with_parser(self, parser: u8) -> Target {
        Target { parser: Dim::One(ParserId(parser)), ..self }
    }

    /// True if `unit` lies within every constrained dimension of this target.
    pub fn matches(&self, unit: &Unit) -> bool {
        self.gress.matches(&unit.gress)
            && self.pipe.matches(&unit.pipe)
            && self.parser.matches(&unit.parser)
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(gress={}, pipe={}, parser={})", self.gress, self.pipe, self.parser)
    }
}

/// Opaque identifier of a parser value set entry.  Handles are allocated in increasing order and
/// never reused, so handle order is also creation order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(pub u32);

impl Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
