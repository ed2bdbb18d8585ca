//! cardsort - Command-line tool for analyzing card-sort co-occurrence matrices

use std::process::ExitCode;

use cardsort::cli;

fn main() -> ExitCode {
    cli::run()
}
