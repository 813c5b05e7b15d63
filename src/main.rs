use clap::Parser;
use quantfolio::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    dotenvy::dotenv().ok();
    quantfolio::logging::init_logging();
    run(Cli::parse())
}
