use clap::Parser;

use sotto::app;
use sotto::cli::Cli;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = app::run(cli) {
        eprintln!("{:#}", e); // pretty anyhow chain
        std::process::exit(1);
    }
}
