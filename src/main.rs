use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    casegen_lib::run().await
}
