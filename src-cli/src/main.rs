use clap::Parser;
use healer_cli::cli::Cli;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    healer_cli::init_tracing();

    let cli = Cli::parse();
    match healer_cli::run(cli).await {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Error: {e:#}");
            eprintln!("For help: healer-search --help");
            std::process::exit(1);
        }
    }
}
