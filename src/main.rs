use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    user_api_harness::init_logging();

    match user_api_harness::run().await {
        Ok(report) if report.all_passed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}
