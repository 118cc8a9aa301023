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

//! Switch configuration, read from JSON, e.g.:
//!
//! ```json
//! { "devices": [ { "device_id": 0, "table": "pvs_ethertype", "capacity": 4,
//!                  "topology": { "pipes": 2, "parsers_per_pipe": 2,
//!                                "ports": { "0": [0, 0], "4": [0, 1] } } } ] }
//! ```

use anyhow::{Context, Result};

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ConfigError, DeviceId};
use crate::topology::Topology;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub devices: Vec<DeviceConfig>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub device_id: DeviceId,

    /// Name of the parser value set.
    #[serde(default = "default_table")]
    pub table: String,

    /// Entries each parser can hold.
    pub capacity: usize,

    pub topology: TopologyConfig,
}

fn default_table() -> String {
    "pvs".into()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyConfig {
    pub pipes: u8,
    pub parsers_per_pipe: u8,

    /// Maps each port to its `[pipe, parser]`.
    #[serde(default)]
    pub ports: BTreeMap<u32, (u8, u8)>,
}

impl TryFrom<&TopologyConfig> for Topology {
    type Error = ConfigError;

    fn try_from(t: &TopologyConfig) -> std::result::Result<Self, ConfigError> {
        t.ports.iter().try_fold(
            Topology::new(t.pipes, t.parsers_per_pipe)?,
            |topology, (&port, &(pipe, parser))| topology.with_port(port, pipe, parser),
        )
    }
}

impl FromStr for Config {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> serde_json::Result<Config> {
        serde_json::from_str(s)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("{}: read failed", path.display()))?;
        text.parse()
            .with_context(|| format!("{}: parse failed", path.display()))
    }
}
