use anyhow::Context;
use log::info;
use serde::Deserialize;
use std::{fs::File, path::PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    /// OpenWeatherMap API key. Required, there is no usable default
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Language for the condition description returned by the service
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_settings_file")]
    pub settings_file: PathBuf,
}

impl Config {
    const PATH: &'static str = "./config.json";

    /// Load config from the working directory
    pub fn load() -> anyhow::Result<Self> {
        info!("Loading config from `{}`", Self::PATH);
        let file = File::open(Self::PATH).with_context(|| {
            format!("Error opening config file {}", Self::PATH)
        })?;
        serde_json::from_reader(file)
            .context(format!("Error parsing config file {}", Self::PATH))
    }
}

fn default_api_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".into()
}

fn default_language() -> String {
    "en".into()
}

fn default_settings_file() -> PathBuf {
    "./settings.json".into()
}
