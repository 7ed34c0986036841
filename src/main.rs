#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = assessly::run().await {
        eprintln!("assessly fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
