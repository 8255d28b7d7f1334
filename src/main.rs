#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lab_relay_lib::run().await
}
