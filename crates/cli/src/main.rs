use std::process::ExitCode;

fn main() -> ExitCode {
    slotpilot_cli::run()
}
