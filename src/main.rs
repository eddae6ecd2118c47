use std::process::ExitCode;

use clap::Parser;
use release_installer::cli::Cli;
use release_installer::{FixedAnswer, InstallerError, Installation, InteractivePrompter};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(installation) => {
            println!("{}", installation.path.display());
            if let Some(config) = installation.config {
                eprintln!("wrote default configuration to {}", config.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<Installation, InstallerError> {
    let options = cli.options()?;
    let source = cli.source();

    match cli.fixed_answer() {
        Some(answer) => release_installer::install(&source, &mut FixedAnswer(answer), &options),
        None => release_installer::install(&source, &mut InteractivePrompter, &options),
    }
}
