use crate::client::RelayMuxClient;

pub async fn run(client: &RelayMuxClient) -> anyhow::Result<()> {
    match client.health().await {
        Ok(true) => {
            println!("RelayMux server is healthy.");
            Ok(())
        }
        Ok(false) => {
            eprintln!("RelayMux server returned an unhealthy status.");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Failed to reach server: {e}");
            std::process::exit(1);
        }
    }
}
