pub mod error;
pub mod load;
pub mod paths;
pub mod settings;

pub use error::ConfigError;
pub use load::load_settings;
pub use paths::{default_settings_path, default_state_root, SETTINGS_FILE_NAME, STATE_DIR};
pub use settings::Settings;
