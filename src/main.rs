mod args;
mod splits;

use clap::Parser;
use log::LevelFilter;

fn main() {
    let args = args::Args::parse();

    if args.verbose {
        env_logger::builder()
            .filter_level(LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    if let Err(e) = splits::run(&args) {
        eprintln!("An error occured: {}", e);
        std::process::exit(1);
    }
}
