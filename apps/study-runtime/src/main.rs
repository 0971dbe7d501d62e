#[tokio::main]
async fn main() -> anyhow::Result<()> {
    flashset_runtime::run().await
}
