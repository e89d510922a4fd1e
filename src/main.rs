//! vcscope binary entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    match vcscope::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            vcscope::ui::output::error(vcscope::cli::describe_error(&err));
            ExitCode::from(vcscope::cli::exit_code(&err))
        }
    }
}
