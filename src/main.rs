use anyhow::Context;
use shelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load SHELF settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    shelf_app::run(settings).await
}
