use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let config = glint::config::Config::load()?;
    config.validate()?;

    let mut app = glint::app::App::new(config)?;
    app.run().await?;

    Ok(())
}
