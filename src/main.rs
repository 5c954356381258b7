#[tokio::main]
async fn main() {
    if let Err(e) = carewatch::run().await {
        eprintln!("carewatch: {e}");
        std::process::exit(1);
    }
}
