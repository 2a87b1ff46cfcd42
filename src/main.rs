use clap::Parser;
use std::process::ExitCode;
use swalign::search::{SearchArgs, search_process};

fn main() -> ExitCode {
    env_logger::init();

    let args = SearchArgs::parse();

    match search_process(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("swalign: {err}");
            ExitCode::FAILURE
        }
    }
}
