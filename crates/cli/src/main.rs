use std::process::ExitCode;

fn main() -> ExitCode {
    wapprove_cli::run()
}
