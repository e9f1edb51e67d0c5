mod bridge;
mod completion;
mod host;
mod session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
