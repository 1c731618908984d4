#[tokio::main]
async fn main() -> anyhow::Result<()> {
    revcrawl::cli::run().await
}
