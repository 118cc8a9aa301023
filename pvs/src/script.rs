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

//! Scripted access to a [`Switch`].
//!
//! A script is a sequence of JSON objects, one per line, each naming an operation in its `op`
//! member.  Blank lines and lines that begin with `#` are ignored.  For example:
//!
//! ```text
//! {"op": "set_pipe_scope", "gress": "all", "scope": "single"}
//! {"op": "add", "target": {"pipe": 1}, "value": "0x8100", "mask": "0xffff"}
//! {"op": "commit"}
//! {"op": "count", "target": {}}
//! ```
//!
//! Every operation takes an optional `device`, which defaults to 0.  Values, masks, and field
//! values may be JSON numbers or strings in decimal or `0x`-prefixed hexadecimal.
//!
//! Mutations (`add`, `modify`, `delete`) are staged in a per-device [`Session`] and take effect
//! at the next `commit` for the device.

use anyhow::Context;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use serde_json::{json, Value};

use std::collections::HashMap;
use std::io::{BufRead, Write};

use tracing::warn;

use crate::error::{DeviceId, Result};
use crate::scope::Scope;
use crate::session::Session;
use crate::switch::Switch;
use crate::target::{Dim, Gress, Handle, Target, Unit};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    SetGressScope {
        #[serde(default)]
        device: DeviceId,
        scope: Scope,
    },
    SetPipeScope {
        #[serde(default)]
        device: DeviceId,
        #[serde(default)]
        gress: Dim<Gress>,
        scope: Scope,
    },
    SetParserScope {
        #[serde(default)]
        device: DeviceId,
        #[serde(default)]
        gress: Dim<Gress>,
        scope: Scope,
    },
    GetGressScope {
        #[serde(default)]
        device: DeviceId,
    },
    GetPipeScope {
        #[serde(default)]
        device: DeviceId,
        #[serde(default)]
        gress: Dim<Gress>,
    },
    GetParserScope {
        #[serde(default)]
        device: DeviceId,
        #[serde(default)]
        gress: Dim<Gress>,
    },
    Add {
        #[serde(default)]
        device: DeviceId,
        #[serde(default)]
        target: Target,
        #[serde(deserialize_with = "number")]
        value: u32,
        #[serde(deserialize_with = "number")]
        mask: u32,
    },
    Modify {
        #[serde(default)]
        device: DeviceId,
        handle: Handle,
        #[serde(deserialize_with = "number")]
        value: u32,
        #[serde(deserialize_with = "number")]
        mask: u32,
    },
    Delete {
        #[serde(default)]
        device: DeviceId,
        handle: Handle,
    },
    Commit {
        #[serde(default)]
        device: DeviceId,
    },
    Get {
        #[serde(default)]
        device: DeviceId,
        handle: Handle,
    },
    Lookup {
        #[serde(default)]
        device: DeviceId,
        #[serde(default)]
        target: Target,
        #[serde(deserialize_with = "number")]
        value: u32,
        #[serde(deserialize_with = "number")]
        mask: u32,
    },
    Count {
        #[serde(default)]
        device: DeviceId,
        #[serde(default)]
        target: Target,
    },
    First {
        #[serde(default)]
        device: DeviceId,
        #[serde(default)]
        target: Target,
    },
    Next {
        #[serde(default)]
        device: DeviceId,
        handle: Handle,
        #[serde(default)]
        target: Target,
        #[serde(default = "one")]
        n: usize,
    },
    Evaluate {
        #[serde(default)]
        device: DeviceId,
        gress: Gress,
        port: u32,
        #[serde(deserialize_with = "number")]
        value: u32,
    },
    Occupancy {
        #[serde(default)]
        device: DeviceId,
        unit: Unit,
    },
}

fn one() -> usize {
    1
}

fn parse_u32(s: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

fn number<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(u32),
        Text(String),
    }
    match Number::deserialize(deserializer)? {
        Number::Int(n) => Ok(n),
        Number::Text(s) => parse_u32(&s).map_err(|e| D::Error::custom(format!("{}: {}", s, e))),
    }
}

/// Executes [`Command`]s against a switch, keeping one pending session per device.
pub struct Interpreter {
    switch: Switch,
    sessions: HashMap<DeviceId, Session>,
}

impl Interpreter {
    pub fn new(switch: Switch) -> Interpreter {
        Interpreter { switch, sessions: HashMap::new() }
    }

    pub fn switch(&self) -> &Switch {
        &self.switch
    }

    /// Executes `command` and returns its result as JSON.
    ///
    /// A `commit` succeeds even if some of its updates fail.  Its result is an array with one
    /// element per update, either `{"added": handle}` (or `modified` or `deleted`) or
    /// `{"error": message}`.
    pub fn execute(&mut self, command: Command) -> Result<Value> {
        let switch = &self.switch;
        Ok(match command {
            Command::SetGressScope { device, scope } => {
                switch.set_gress_scope(device, scope)?;
                Value::Null
            }
            Command::SetPipeScope { device, gress, scope } => {
                switch.set_pipe_scope(device, gress, scope)?;
                Value::Null
            }
            Command::SetParserScope { device, gress, scope } => {
                switch.set_parser_scope(device, gress, scope)?;
                Value::Null
            }
            Command::GetGressScope { device } => json!(switch.get_gress_scope(device)?),
            Command::GetPipeScope { device, gress } => json!(switch.get_pipe_scope(device, gress)?),
            Command::GetParserScope { device, gress } =>
                json!(switch.get_parser_scope(device, gress)?),
            Command::Add { device, target, value, mask } =>
                json!({ "staged": self.session(device).add(target, value, mask) }),
            Command::Modify { device, handle, value, mask } =>
                json!({ "staged": self.session(device).modify(handle, value, mask) }),
            Command::Delete { device, handle } =>
                json!({ "staged": self.session(device).delete(handle) }),
            Command::Commit { device } => {
                let session = self.sessions.remove(&device)
                    .unwrap_or_else(|| switch.session(device));
                let results = session.commit()?
                    .into_iter()
                    .map(|result| match result {
                        Ok(applied) => json!(applied),
                        Err(error) => json!({ "error": error.to_string() }),
                    })
                    .collect();
                Value::Array(results)
            }
            Command::Get { device, handle } => {
                let (value, mask) = switch.get(device, handle)?;
                json!({ "value": value, "mask": mask })
            }
            Command::Lookup { device, target, value, mask } =>
                json!(switch.lookup_handle(device, &target, value, mask)?),
            Command::Count { device, target } => json!(switch.get_count(device, &target)?),
            Command::First { device, target } => json!(switch.get_first(device, &target)?),
            Command::Next { device, handle, target, n } =>
                json!(switch.get_next(device, handle, &target, n)?),
            Command::Evaluate { device, gress, port, value } =>
                json!(switch.evaluate_port(device, gress, port, value)?),
            Command::Occupancy { device, unit } => json!(switch.occupancy(device, &unit)?),
        })
    }

    fn session(&mut self, device: DeviceId) -> &mut Session {
        let switch = &self.switch;
        self.sessions.entry(device).or_insert_with(|| switch.session(device))
    }
}

/// Executes the script read from `input`, writing one line of JSON per command to `output`:
/// `{"ok": result}` or `{"error": message}`.  Returns the number of commands that failed.
///
/// With `fail_fast`, stops after the first failed command.  A line that is not a valid command
/// ends the script with an error.
pub fn run_script<R, W>(
    interpreter: &mut Interpreter,
    input: R,
    mut output: W,
    fail_fast: bool,
) -> anyhow::Result<usize>
where
    R: BufRead,
    W: Write,
{
    let mut failures = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line.context("reading script failed")?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command: Command = serde_json::from_str(line)
            .with_context(|| format!("line {}: bad command", index + 1))?;
        let reply = match interpreter.execute(command) {
            Ok(result) => json!({ "ok": result }),
            Err(error) => {
                warn!("line {}: {}", index + 1, error);
                failures += 1;
                json!({ "error": error.to_string() })
            }
        };
        writeln!(output, "{}", reply)?;
        if fail_fast && failures > 0 {
            break;
        }
    }
    Ok(failures)
}
