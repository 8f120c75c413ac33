/*
 * Copyright 2019 The Regents of the University of California
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 */

//!
//! Sweeps a frequency band with an SDR dongle, FFTs and averages the
//! captured baseband, and writes timestamped per-bin power readings to
//! standard output.
//!

extern crate clap;
extern crate log;
extern crate signal_hook;
extern crate simplelog;

use clap::Parser;
use rf_sweep::Args;
use rf_sweep::Manager;
use signal_hook::{flag::register, SIGINT, SIGTERM};
use simplelog::{Config, SimpleLogger, TermLogger};
use std::io;
use std::process;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

fn run() -> io::Result<()> {
    let args = Args::parse();

    let log_status = TermLogger::init(args.log_level(), Config::default())
        .or_else(|_| SimpleLogger::init(args.log_level(), Config::default()));
    if let Err(e) = log_status {
        eprintln!("failed to set up logger: {}", e);
    }

    // Notes about signals on Linux: SIGINT/SIGTERM set the stop flag but
    // do not interrupt an in-progress SDR read call.
    let stop_flag = Arc::new(AtomicBool::new(false));
    register(SIGINT, Arc::clone(&stop_flag))?;
    register(SIGTERM, Arc::clone(&stop_flag))?;

    Manager::new(args, stop_flag).run()
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("{}", e);
            process::exit(-1);
        }
    }
}
