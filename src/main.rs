use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    softlight_cli::cli::run().await
}
