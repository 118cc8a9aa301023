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

//! `pvsctl` loads a switch configuration and runs a script of parser value set operations
//! against it, printing one JSON result per operation.

use anyhow::{anyhow, Context, Result};

use clap::Parser;

use pvs::script::{run_script, Interpreter};
use pvs::{Config, Switch};

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use tracing::{info, Level};

#[derive(Parser, Debug)]
#[clap(version, about = "Runs parser value set operations from a JSON-lines script")]
struct Args {
    /// Switch configuration (JSON)
    config: PathBuf,

    /// Script to run (standard input, if omitted)
    script: Option<PathBuf>,

    /// Stop at the first failed operation and exit unsuccessfully
    #[clap(long)]
    fail_fast: bool,

    /// Log debug messages
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_writer(io::stderr).with_max_level(level).init();

    let config = Config::from_file(&args.config)?;
    let switch = Switch::from_config(&config)
        .with_context(|| format!("{}: invalid configuration", args.config.display()))?;
    info!("configured devices {:?}", switch.device_ids());

    let mut interpreter = Interpreter::new(switch);
    let stdout = io::stdout();
    let failures = match &args.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("{}: open failed", path.display()))?;
            run_script(&mut interpreter, BufReader::new(file), stdout.lock(), args.fail_fast)?
        }
        None => run_script(&mut interpreter, io::stdin().lock(), stdout.lock(), args.fail_fast)?,
    };

    if args.fail_fast && failures > 0 {
        return Err(anyhow!("stopped at first failed operation"));
    }
    Ok(())
}
