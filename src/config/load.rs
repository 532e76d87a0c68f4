use super::{default_settings_path, ConfigError, Settings};

/// A missing settings file is not an error; the defaults are a complete
/// configuration.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let path = default_settings_path()?;
    let settings = if path.exists() {
        Settings::from_path(&path)?
    } else {
        Settings::default()
    };
    settings.validate()?;
    Ok(settings)
}
