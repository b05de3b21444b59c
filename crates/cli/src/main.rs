use std::process::ExitCode;

fn main() -> ExitCode {
    eorbench_cli::run()
}
