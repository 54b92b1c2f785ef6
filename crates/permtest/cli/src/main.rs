use colored::Colorize;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = permtest_cli::run().await {
        eprintln!("{} {err}", "error:".red().bold());
        std::process::exit(err.exit_code());
    }
}
