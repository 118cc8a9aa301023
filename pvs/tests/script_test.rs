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

use anyhow::Result;
use pvs::script::{run_script, Interpreter};
use pvs::{Config, Switch};
use serde_json::{json, Value};
use tracing_test::traced_test;

const CONFIG: &str = r#"{
    "devices": [
        {
            "device_id": 0,
            "capacity": 2,
            "topology": {
                "pipes": 2,
                "parsers_per_pipe": 2,
                "ports": { "0": [0, 0], "8": [1, 1] }
            }
        }
    ]
}"#;

/// Runs `script` against a fresh switch and returns the failure count and the replies.
fn run(script: &str, fail_fast: bool) -> Result<(usize, Vec<Value>)> {
    let config: Config = CONFIG.parse()?;
    let mut interpreter = Interpreter::new(Switch::from_config(&config)?);
    let mut output = Vec::new();
    let failures = run_script(&mut interpreter, script.as_bytes(), &mut output, fail_fast)?;
    let replies = String::from_utf8(output)?
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<Vec<Value>, _>>()?;
    Ok((failures, replies))
}

#[test]
#[traced_test]
fn vlan_script() -> Result<()> {
    let (failures, replies) = run(r#"
# Recognize 802.1Q everywhere.
{"op": "get_gress_scope"}
{"op": "add", "value": "0x8100", "mask": "0xffff"}
{"op": "count"}
{"op": "commit"}
{"op": "count"}
{"op": "first"}
{"op": "get", "handle": 0}
{"op": "lookup", "value": 33024, "mask": 65535}
{"op": "evaluate", "gress": "egress", "port": 8, "value": "0x8100"}
{"op": "evaluate", "gress": "egress", "port": 8, "value": "0x0800"}
{"op": "occupancy", "unit": {"gress": "ingress", "pipe": 1, "parser": 0}}
{"op": "next", "handle": 0}
"#, false)?;

    assert_eq!(failures, 1);
    assert_eq!(replies, vec![
        json!({"ok": "all"}),
        json!({"ok": {"staged": 0}}),
        json!({"ok": 0}),
        json!({"ok": [{"added": 0}]}),
        json!({"ok": 1}),
        json!({"ok": 0}),
        json!({"ok": {"value": 0x8100, "mask": 0xffff}}),
        json!({"ok": 0}),
        json!({"ok": true}),
        json!({"ok": false}),
        json!({"ok": 1}),
        json!({"error": "no matching entry"}),
    ]);
    Ok(())
}

#[test]
#[traced_test]
fn commit_reports_each_update() -> Result<()> {
    let (failures, replies) = run(r#"
{"op": "add", "value": 1, "mask": 1}
{"op": "add", "value": 2, "mask": 3}
{"op": "add", "value": 3, "mask": 3}
{"op": "commit"}
{"op": "set_pipe_scope", "scope": "single"}
"#, false)?;

    assert_eq!(failures, 1);
    assert_eq!(replies[3]["ok"][0], json!({"added": 0}));
    assert_eq!(replies[3]["ok"][1], json!({"added": 1}));
    assert!(replies[3]["ok"][2]["error"].is_string());
    assert!(replies[4]["error"].is_string());
    Ok(())
}

#[test]
#[traced_test]
fn scoped_writes() -> Result<()> {
    let (failures, replies) = run(r#"
{"op": "set_gress_scope", "scope": "single"}
{"op": "get_pipe_scope"}
{"op": "set_pipe_scope", "gress": "ingress", "scope": "single"}
{"op": "add", "target": {"gress": "ingress", "pipe": 1}, "value": "0x88a8", "mask": "0xffff"}
{"op": "add", "target": {"gress": "egress"}, "value": "0x88a8", "mask": "0xffff"}
{"op": "commit"}
{"op": "count", "target": {"pipe": 1}}
{"op": "count", "target": {"gress": "ingress", "pipe": 0}}
{"op": "first", "target": {"gress": "ingress"}}
"#, false)?;

    assert_eq!(failures, 2);
    assert!(replies[1]["error"].is_string());
    assert_eq!(replies[5], json!({"ok": [{"added": 0}, {"added": 1}]}));
    assert_eq!(replies[6], json!({"ok": 2}));
    assert_eq!(replies[7], json!({"ok": 0}));
    assert!(replies[8]["error"].is_string());
    Ok(())
}

#[test]
#[traced_test]
fn fail_fast_stops_early() -> Result<()> {
    let (failures, replies) = run(r#"
{"op": "get", "handle": 9}
{"op": "count"}
"#, true)?;
    assert_eq!(failures, 1);
    assert_eq!(replies.len(), 1);
    Ok(())
}

#[test]
#[traced_test]
fn bad_command_aborts() {
    let error = run("{\"op\": \"count\"}\n{\"op\": \"explode\"}\n", false).unwrap_err();
    assert!(format!("{:#}", error).contains("line 2"));
}

#[test]
#[traced_test]
fn unknown_device() -> Result<()> {
    let (failures, replies) = run(r#"
{"op": "add", "device": 3, "value": 1, "mask": 1}
{"op": "commit", "device": 3}
{"op": "count", "device": 3}
"#, false)?;
    assert_eq!(failures, 2);
    assert_eq!(replies[0], json!({"ok": {"staged": 0}}));
    assert!(replies[1]["error"].is_string());
    Ok(())
}
