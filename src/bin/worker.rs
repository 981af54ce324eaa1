#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = essay_grader::run_worker().await {
        eprintln!("essay-grader-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
