mod cli;
mod core;
mod interfaces;
mod logging;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_main().await {
        eprintln!("backlot: {e:#}");
        std::process::exit(1);
    }
}
