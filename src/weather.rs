use crate::config::Config;
use anyhow::Context;
use log::info;
use serde::Deserialize;
use std::time::Duration;

/// Current conditions for one location, as reported by the weather service
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherReading {
    pub location_name: String,
    pub country_code: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub description: String,
    pub sunrise_unix: i64,
    pub sunset_unix: i64,
}

/// Something that can look up current weather by location query. The query
/// is either `city` or `city,country`.
pub trait WeatherSource: Send + Sync {
    fn current(&self, query: &str) -> anyhow::Result<WeatherReading>;
}

/// Build the location query for the service
pub fn location_query(city: &str, country: &str) -> String {
    if country.is_empty() {
        city.to_owned()
    } else {
        format!("{city},{country}")
    }
}

/// Client for the OpenWeatherMap current weather endpoint. Queries are by
/// place name, results are always metric
#[derive(Debug)]
pub struct OpenWeather {
    agent: ureq::Agent,
    url: String,
    api_key: String,
    language: String,
}

impl OpenWeather {
    const TIMEOUT: Duration = Duration::from_secs(10);
    const UNITS: &'static str = "metric";

    pub fn new(config: &Config) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Self::TIMEOUT)
                .user_agent(concat!(
                    "weather-widget/",
                    env!("CARGO_PKG_VERSION")
                ))
                .build(),
            url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        }
    }
}

impl WeatherSource for OpenWeather {
    fn current(&self, query: &str) -> anyhow::Result<WeatherReading> {
        info!("Fetching current weather for `{query}`");
        // Non-2xx statuses come back as Err(ureq::Error::Status)
        let response = self
            .agent
            .get(&self.url)
            .query("q", query)
            .query("appid", &self.api_key)
            .query("units", Self::UNITS)
            .query("lang", &self.language)
            .call()
            .with_context(|| format!("Error fetching weather for `{query}`"))?;
        let body: CurrentWeather = response
            .into_json()
            .context("Error parsing weather as JSON")?;
        Ok(body.into())
    }
}

/// https://openweathermap.org/current#current_JSON
#[derive(Debug, Deserialize)]
struct CurrentWeather {
    name: String,
    sys: Sys,
    main: Main,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Debug, Deserialize)]
struct Sys {
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: String,
}

impl From<CurrentWeather> for WeatherReading {
    fn from(body: CurrentWeather) -> Self {
        Self {
            location_name: body.name,
            country_code: body.sys.country,
            temperature_c: body.main.temp,
            feels_like_c: body.main.feels_like,
            // Only the primary condition is shown
            description: body
                .weather
                .into_iter()
                .next()
                .map(|condition| condition.description)
                .unwrap_or_default(),
            sunrise_unix: body.sys.sunrise,
            sunset_unix: body.sys.sunset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use wiremock::{
        matchers::{method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };

    const KYIV: &str = r#"{
        "coord": {"lon": 30.52, "lat": 50.45},
        "weather": [
            {"id": 800, "main": "Clear", "description": "clear sky"}
        ],
        "main": {"temp": 5.6, "feels_like": 3.2, "humidity": 70},
        "sys": {"type": 2, "country": "UA", "sunrise": 1700, "sunset": 1750},
        "timezone": 7200,
        "name": "Kyiv",
        "cod": 200
    }"#;

    fn client(server: &MockServer) -> OpenWeather {
        OpenWeather::new(&Config {
            api_key: "key".into(),
            api_url: format!("{}/data/2.5/weather", server.uri()),
            language: "uk".into(),
            settings_file: PathBuf::new(),
        })
    }

    /// Run the blocking client off the runtime thread, so the mock server
    /// can keep answering
    async fn fetch(
        server: &MockServer,
        query: &'static str,
    ) -> anyhow::Result<WeatherReading> {
        let client = client(server);
        tokio::task::spawn_blocking(move || client.current(query))
            .await
            .unwrap()
    }

    #[test]
    fn test_location_query() {
        assert_eq!(location_query("Kyiv", ""), "Kyiv");
        assert_eq!(location_query("Kyiv", "UA"), "Kyiv,UA");
    }

    #[test]
    fn test_parse_reading() {
        let body: CurrentWeather = serde_json::from_str(KYIV).unwrap();
        assert_eq!(
            WeatherReading::from(body),
            WeatherReading {
                location_name: "Kyiv".into(),
                country_code: "UA".into(),
                temperature_c: 5.6,
                feels_like_c: 3.2,
                description: "clear sky".into(),
                sunrise_unix: 1700,
                sunset_unix: 1750,
            }
        );
    }

    #[test]
    fn test_parse_no_conditions() {
        let body: CurrentWeather = serde_json::from_str(
            r#"{"name": "X", "sys": {"country": "", "sunrise": 0, "sunset": 0},
            "main": {"temp": 0, "feels_like": 0}, "weather": []}"#,
        )
        .unwrap();
        assert_eq!(WeatherReading::from(body).description, "");
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Kyiv,UA"))
            .and(query_param("appid", "key"))
            .and(query_param("units", "metric"))
            .and(query_param("lang", "uk"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(KYIV, "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let reading = fetch(&server, "Kyiv,UA").await.unwrap();
        assert_eq!(reading.location_name, "Kyiv");
        assert_eq!(reading.country_code, "UA");
        assert_eq!(reading.description, "clear sky");
    }

    #[tokio::test]
    async fn test_fetch_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "Nonexistentville"))
            .respond_with(ResponseTemplate::new(404).set_body_json(
                serde_json::json!({"cod": "404", "message": "city not found"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        assert!(fetch(&server, "Nonexistentville").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_unexpected_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"cod": 200})),
            )
            .mount(&server)
            .await;

        assert!(fetch(&server, "Kyiv").await.is_err());
    }
}
