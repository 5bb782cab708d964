use anyhow::Result;
use std::path::Path;
use mashup_core::config::Config;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("mashup configuration\n");
    println!("{}", render(&config)?);

    // Show config file locations
    println!("Config file locations (in priority order):");
    println!("  1. Environment variables (MASHUP_*, `__` between sections, e.g. MASHUP_SMTP__HOST)");
    if let Some(p) = config_path {
        println!("  2. {} (specified)", p.display());
    }
    if let Some(path) = Config::default_path() {
        println!("  3. {}", path.display());
    }

    Ok(())
}

/// Effective configuration as TOML, secrets masked
fn render(config: &Config) -> Result<String> {
    let mut shown = config.clone();
    if shown.smtp.password.is_some() {
        shown.smtp.password = Some("********".to_string());
    }
    Ok(toml::to_string_pretty(&shown)?)
}
