#[tokio::main]
async fn main() {
    if let Err(error) = startuplink::web::run().await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
