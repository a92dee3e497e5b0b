use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = header_filter::cli::Cli::parse();
    if let Err(e) = header_filter::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
