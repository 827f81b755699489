//! `cinedaily` binary entrypoint.

#[tokio::main]
async fn main() {
    let exit_code = cinedaily_cli::run().await;
    std::process::exit(exit_code);
}
