use std::process::ExitCode;

fn main() -> ExitCode {
    docent::init_tracing();
    docent::cli::run()
}
