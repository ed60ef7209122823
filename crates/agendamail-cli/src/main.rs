//! agendamail entry point.

use std::process::ExitCode;

use clap::Parser;

use agendamail_cli::{Cli, ExitStatus};

fn main() -> ExitCode {
    // a missing .env is fine, the real environment may carry everything
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match agendamail_cli::run(cli) {
        Ok(()) => ExitStatus::Success.into(),
        Err(e) => {
            eprintln!("error: {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("hint: {}", hint);
            }
            e.exit_status().into()
        }
    }
}
