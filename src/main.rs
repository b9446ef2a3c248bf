use clap::Parser;

use sqlman_lib::cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = sqlman_lib::run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
