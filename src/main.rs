use std::io::{self, Write};

use accident_explorer::app::{self, ExplorerApp};
use accident_explorer::cli::{Args, Command};
use anyhow::Result;
use clap::Parser;

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn run(args: &Args) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Command::GenerateConfig { force } = args.command {
        return app::generate_config(args, force, &mut out);
    }

    let explorer = ExplorerApp::from_args(args)?;
    explorer.run(&args.command, &mut out)?;
    out.flush()?;
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
