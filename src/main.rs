#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use saml_registration::{
    settings::{LoggingSettings, RegistrationSettings},
    utils::logging::{apply_log_level, init_logging},
    RegistrationSummary, VERSION,
};

fn main() -> Result<()> {
    // Logger first, so reading the settings files is itself logged
    init_logging(&LoggingSettings::default().level).context("Failed to initialize logging")?;

    // Load registrations from Settings.toml and environment variables
    let settings = RegistrationSettings::load().context("Failed to load settings")?;
    apply_log_level(&settings.logging.level);

    log::info!(
        "saml-registration {VERSION}: validating {} registration(s)",
        settings.registrations.len()
    );

    let registrations = settings
        .build_registrations()
        .context("Invalid registration configuration")?;

    for registration in &registrations {
        let summary = RegistrationSummary::from(registration);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    println!("✓ {} registration(s) valid", registrations.len());
    Ok(())
}
