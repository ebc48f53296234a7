//! Repository initialization

use crate::config::Settings;

pub fn execute(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    settings.open_repository()?;
    println!(
        "Initialized concord repository (db: {}, cas: {})",
        settings.db.display(),
        settings.cas.display()
    );
    Ok(())
}
