//! The weather widget itself: query state, the latest fetch result, and the
//! user's settings. Rendering is left to the UI, which asks for a [View].

use crate::{
    settings::{Settings, SettingsChange, SettingsStore},
    util::{format_local_time, round_half_up, Color},
    weather::{location_query, WeatherReading, WeatherSource},
};
use log::{error, info, warn};
use std::{
    sync::{Arc, RwLock},
    thread::{self, JoinHandle},
};

/// Shown for every failed fetch, regardless of the cause
pub const FETCH_FAILURE: &str = "City not found";

/// Called from the fetch thread after it deposits a result
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Result of the most recent fetch. A reading and an error can never coexist.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FetchState {
    #[default]
    Empty,
    Loaded(WeatherReading),
    Failed(String),
}

pub struct WeatherWidget {
    source: Arc<dyn WeatherSource>,
    store: Box<dyn SettingsStore>,
    settings: Settings,
    /// Written by fetch threads. Whichever fetch finishes last wins
    state: Arc<RwLock<FetchState>>,
    listener: Option<Listener>,
}

impl WeatherWidget {
    /// Load settings from the store, falling back to defaults if there's
    /// nothing there or it can't be read. The loaded settings are written
    /// back immediately, same as any other settings change.
    pub fn new(
        source: Arc<dyn WeatherSource>,
        store: Box<dyn SettingsStore>,
    ) -> Self {
        let settings = match store.load() {
            Ok(settings) => settings.unwrap_or_default(),
            Err(err) => {
                error!("Error loading settings: {err:?}");
                Settings::default()
            }
        };
        let widget = Self {
            source,
            store,
            settings,
            state: Default::default(),
            listener: None,
        };
        widget.on_settings_changed();
        widget
    }

    /// Register a callback to be invoked whenever a fetch completes
    pub fn set_listener(&mut self, listener: Listener) {
        self.listener = Some(listener);
    }

    /// Look up the favorite city, if there is one and nothing is loaded yet
    pub fn start(&self) -> Option<JoinHandle<()>> {
        if self.settings.fav_city.is_empty() || self.reading().is_some() {
            return None;
        }
        info!("Loading favorite city `{}`", self.settings.fav_city);
        self.fetch_weather(&self.settings.fav_city, "")
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reading(&self) -> Option<WeatherReading> {
        match &*self.read_state() {
            FetchState::Loaded(reading) => Some(reading.clone()),
            _ => None,
        }
    }

    /// Spawn a background fetch for the given city (and optional country
    /// code). Does nothing and returns `None` for an empty city. Otherwise
    /// any previous error is cleared right away, and the result replaces the
    /// state once the request finishes.
    pub fn fetch_weather(
        &self,
        city: &str,
        country: &str,
    ) -> Option<JoinHandle<()>> {
        let city = city.trim();
        if city.is_empty() {
            return None;
        }
        let query = location_query(city, country.trim());

        {
            let mut state = self.write_state();
            if matches!(*state, FetchState::Failed(_)) {
                *state = FetchState::Empty;
            }
        }

        let source = Arc::clone(&self.source);
        let lock = Arc::clone(&self.state);
        let listener = self.listener.clone();
        Some(thread::spawn(move || {
            let next = match source.current(&query) {
                Ok(reading) => {
                    info!("Loaded weather for `{query}`");
                    FetchState::Loaded(reading)
                }
                Err(err) => {
                    error!("Error fetching weather for `{query}`: {err:?}");
                    FetchState::Failed(FETCH_FAILURE.into())
                }
            };
            match lock.write() {
                Ok(mut state) => *state = next,
                Err(err) => error!("Error saving weather: {err}"),
            }
            if let Some(listener) = listener {
                listener();
            }
        }))
    }

    /// Merge a partial change into the settings, then persist
    pub fn update_settings(&mut self, change: SettingsChange) {
        self.settings.apply(change);
        self.on_settings_changed();
    }

    /// Is `now` (Unix seconds) strictly between sunrise and sunset? With
    /// nothing loaded, it's always day.
    pub fn is_daytime(&self, now: i64) -> bool {
        match self.reading() {
            None => true,
            Some(reading) => {
                reading.sunrise_unix < now && now < reading.sunset_unix
            }
        }
    }

    /// Everything the UI needs to draw one frame. Recomputed on every call,
    /// so the theme can lag behind sunrise/sunset until the next render.
    pub fn view(&self, now: i64) -> View {
        let daytime = self.is_daytime(now);
        let (error, card) = match &*self.read_state() {
            FetchState::Empty => (None, None),
            FetchState::Loaded(reading) => {
                (None, Some(Card::new(reading, daytime)))
            }
            FetchState::Failed(message) => (Some(message.clone()), None),
        };
        View {
            theme: if daytime { Theme::Light } else { Theme::Dark },
            text_color: self.settings.text_color,
            bg_color: self.settings.bg_color,
            error,
            card,
        }
    }

    /// Persistence hook, run after every settings mutation. Failures are
    /// logged and dropped; there is no retry.
    fn on_settings_changed(&self) {
        if let Err(err) = self.store.save(&self.settings) {
            error!("Error persisting settings: {err:?}");
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, FetchState> {
        // State is a plain value, so a poisoned lock is still readable
        self.state.read().unwrap_or_else(|poisoned| {
            warn!("Fetch state lock was poisoned");
            poisoned.into_inner()
        })
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, FetchState> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("Fetch state lock was poisoned");
            poisoned.into_inner()
        })
    }
}

/// Two mutually exclusive looks, picked by day/night
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Light => "☀️",
            Self::Dark => "🌙",
        }
    }
}

/// Display model for one frame
#[derive(Clone, Debug, PartialEq)]
pub struct View {
    pub theme: Theme,
    pub text_color: Color,
    pub bg_color: Color,
    pub error: Option<String>,
    pub card: Option<Card>,
}

/// The weather card, with everything pre-formatted
#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    /// `Name, CC`
    pub title: String,
    pub icon: &'static str,
    pub temperature: String,
    pub feels_like: String,
    pub description: String,
    pub sunrise: String,
    pub sunset: String,
}

impl Card {
    fn new(reading: &WeatherReading, daytime: bool) -> Self {
        let theme = if daytime { Theme::Light } else { Theme::Dark };
        Self {
            title: format!(
                "{}, {}",
                reading.location_name, reading.country_code
            ),
            icon: theme.icon(),
            temperature: format!("{}°C", round_half_up(reading.temperature_c)),
            feels_like: format!("{}°C", round_half_up(reading.feels_like_c)),
            description: reading.description.clone(),
            sunrise: format_local_time(reading.sunrise_unix),
            sunset: format_local_time(reading.sunset_unix),
        }
    }
}
