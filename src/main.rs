use std::io;
use std::process::ExitCode;

mod app;

#[tokio::main]
async fn main() -> io::Result<ExitCode> {
    app::run().await
}
