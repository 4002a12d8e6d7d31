#[tokio::main]
async fn main() -> anyhow::Result<()> {
    screenbreak_lib::run().await
}
