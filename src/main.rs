use anyhow::Context;
use atlas_kernel::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load settings")?;
    bookshelf_api::run(settings).await
}
