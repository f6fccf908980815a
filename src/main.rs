use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    larder::telemetry::init_tracing();

    match larder::cli::run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(larder::errors::get_exit_code(&e))
        }
    }
}
