use std::process::ExitCode;

fn main() -> ExitCode {
    match parallax_ngin::flow::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
