//! Where the free-text job preferences come from

use crate::config::{optional_env, PreferencesConfig};
use crate::error::{JobPilotError, Result};
use crate::input::file_detector::FileType;
use crate::input::text_extractor::{MarkdownExtractor, PlainTextExtractor, TextExtractor};
use log::info;
use std::path::{Path, PathBuf};

pub const PREFERENCES_ENV: &str = "USER_PREFERENCES";

/// Resolves the preference text: the environment first, then a preferences
/// file, then inline config text.
pub struct PreferenceStore {
    env_value: Option<String>,
    file: Option<PathBuf>,
    inline: Option<String>,
}

impl PreferenceStore {
    pub fn from_config(config: &PreferencesConfig) -> Self {
        Self {
            env_value: optional_env(PREFERENCES_ENV),
            file: config.file.clone(),
            inline: config.text.clone(),
        }
    }

    pub fn new(env_value: Option<String>, file: Option<PathBuf>, inline: Option<String>) -> Self {
        Self {
            env_value,
            file,
            inline,
        }
    }

    pub async fn load(&self) -> Result<String> {
        if let Some(text) = non_blank(self.env_value.as_deref()) {
            info!("Using preferences from {}", PREFERENCES_ENV);
            return Ok(text);
        }
        if let Some(path) = &self.file {
            let text = extract_file(path).await?;
            return non_blank(Some(&text)).ok_or_else(|| {
                JobPilotError::Configuration(format!("Preferences file is empty: {}", path.display()))
            });
        }
        if let Some(text) = non_blank(self.inline.as_deref()) {
            return Ok(text);
        }
        Err(JobPilotError::Configuration(format!(
            "{} environment variable is not set and no preferences are configured",
            PREFERENCES_ENV
        )))
    }
}

async fn extract_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(JobPilotError::InvalidInput(format!(
            "Preferences file does not exist: {}",
            path.display()
        )));
    }
    let extension = path.extension().and_then(|ext| ext.to_str()).ok_or_else(|| {
        JobPilotError::InvalidInput(format!("File has no extension: {}", path.display()))
    })?;

    match FileType::from_extension(extension) {
        FileType::Text => {
            info!("Reading preferences from {}", path.display());
            PlainTextExtractor.extract(path).await
        }
        FileType::Markdown => {
            info!("Reading markdown preferences from {}", path.display());
            MarkdownExtractor.extract(path).await
        }
        FileType::Unknown => Err(JobPilotError::UnsupportedFormat(format!(
            "Unsupported preferences file: {}",
            path.display()
        ))),
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
