use clap::Parser;
use shelf::cli::commands::Cli;
use shelf::cli::handlers;
use shelf::util::logging;

fn main() {
    logging::init_logging();
    let cli = Cli::parse();

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
