#[tokio::main]
async fn main() {
    if let Err(e) = fortune0::start_server().await {
        eprintln!("fortune0-server: {e}");
        std::process::exit(1);
    }
}
