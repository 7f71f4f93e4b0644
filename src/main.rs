//! Command line client for the transaction auditor contract
#![deny(rust_2018_idioms)]
#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]

use std::process::exit;

mod cli;

fn main() {
    let cli = cli::from_args();

    if let Err(err) = cli::exec(cli) {
        log::error!("{:#}", err);
        eprintln!("Error: {:#}", err);
        exit(1);
    }
}
