//! Line-oriented terminal front end. Everything happens on one event loop:
//! stdin lines, fetch completions and Ctrl-C all arrive as [Event]s.

use crate::{
    settings::SettingsChange,
    util::Color,
    widget::{Theme, View, WeatherWidget},
};
use anyhow::bail;
use chrono::Utc;
use crossterm::{
    queue,
    style::{self, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use log::{info, trace};
use std::{io::Write, str::FromStr, sync::mpsc::Receiver};

#[derive(Debug)]
pub enum Event {
    /// A line typed by the user
    Input(String),
    /// A fetch finished, state may have changed
    Refresh,
    Quit,
}

/// The two text inputs. Not persisted
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryInput {
    pub city: String,
    pub country: String,
}

#[derive(Debug, PartialEq)]
enum Command {
    City(String),
    Country(String),
    /// Submit the query, optionally replacing both inputs first
    Search(Option<QueryInput>),
    TextColor(Color),
    BgColor(Color),
    FavCity(String),
    Show,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, arg) = match s.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (s, ""),
        };
        let command = match name {
            "" | "show" => Self::Show,
            "city" => Self::City(arg.into()),
            "country" => Self::Country(arg.into()),
            "search" if arg.is_empty() => Self::Search(None),
            "search" => {
                let (city, country) = arg.split_once(',').unwrap_or((arg, ""));
                Self::Search(Some(QueryInput {
                    city: city.trim().into(),
                    country: country.trim().into(),
                }))
            }
            "text-color" => Self::TextColor(arg.parse()?),
            "bg-color" => Self::BgColor(arg.parse()?),
            "fav" => Self::FavCity(arg.into()),
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => bail!("Unknown command `{name}`, try `help`"),
        };
        Ok(command)
    }
}

/// One line of output. The kind decides the color
#[derive(Clone, Debug, PartialEq)]
enum Line {
    Header(String),
    Text(String),
    Error(String),
}

const HELP: &[&str] = &[
    "city <name>          set the city",
    "country <code>       set the country code, e.g. UA",
    "search [city[, cc]]  look up the weather",
    "text-color #rrggbb   set the text color",
    "bg-color #rrggbb     set the background color",
    "fav [city]           set (or clear) the favorite city",
    "show                 redraw",
    "quit",
];

pub struct Ui<W> {
    widget: WeatherWidget,
    input: QueryInput,
    out: W,
    /// What's currently on screen, so refreshes can skip identical frames
    screen: Vec<Line>,
}

impl<W: Write> Ui<W> {
    pub fn new(widget: WeatherWidget, out: W) -> Self {
        Self {
            widget,
            input: QueryInput::default(),
            out,
            screen: Vec::new(),
        }
    }

    /// Run until the user quits or input runs out
    pub fn run(mut self, events: Receiver<Event>) -> anyhow::Result<()> {
        self.draw(true)?;
        self.widget.start();
        for event in events {
            match event {
                Event::Input(line) => {
                    if !self.handle_line(&line)? {
                        break;
                    }
                }
                Event::Refresh => self.draw(false)?,
                Event::Quit => break,
            }
        }
        info!("Exiting");
        Ok(())
    }

    /// Handle one line of input. Returns `false` when it's time to quit
    fn handle_line(&mut self, line: &str) -> anyhow::Result<bool> {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                self.message(&err.to_string())?;
                return Ok(true);
            }
        };
        match command {
            Command::City(city) => self.input.city = city,
            Command::Country(country) => self.input.country = country,
            Command::Search(inline) => {
                if let Some(input) = inline {
                    self.input = input;
                }
                self.widget
                    .fetch_weather(&self.input.city, &self.input.country);
            }
            Command::TextColor(color) => {
                self.widget.update_settings(SettingsChange::text_color(color))
            }
            Command::BgColor(color) => {
                self.widget.update_settings(SettingsChange::bg_color(color))
            }
            Command::FavCity(city) => {
                self.widget.update_settings(SettingsChange::fav_city(city))
            }
            Command::Show => {}
            Command::Help => {
                for line in HELP {
                    self.message(line)?;
                }
                return Ok(true);
            }
            Command::Quit => return Ok(false),
        }
        self.draw(true)?;
        Ok(true)
    }

    /// Render the current view. Unless forced, nothing is written when the
    /// frame is identical to what's already on screen.
    fn draw(&mut self, force: bool) -> anyhow::Result<()> {
        let view = self.widget.view(Utc::now().timestamp());
        let lines = render(&view, &self.input, &self.widget);
        if !force && lines == self.screen {
            trace!("Frame unchanged, skipping draw");
            return Ok(());
        }
        trace!("Drawing frame: {lines:?}");

        let text_color = term_color(view.text_color);
        queue!(self.out, SetBackgroundColor(term_color(view.bg_color)))?;
        for line in &lines {
            let (color, text) = match line {
                Line::Header(text) => (accent(view.theme), text),
                Line::Text(text) => (text_color, text),
                Line::Error(text) => (ERROR_COLOR, text),
            };
            queue!(
                self.out,
                SetForegroundColor(color),
                Print(text),
                // Fill the rest of the row with the background color
                Clear(ClearType::UntilNewLine),
                Print("\n"),
            )?;
        }
        queue!(self.out, ResetColor, Print("> "))?;
        self.out.flush()?;
        self.screen = lines;
        Ok(())
    }

    /// Print an uncolored line outside the widget
    fn message(&mut self, text: &str) -> anyhow::Result<()> {
        writeln!(self.out, "{text}")?;
        Ok(())
    }
}

const ERROR_COLOR: style::Color = style::Color::Rgb {
    r: 0xd0,
    g: 0x30,
    b: 0x30,
};

fn accent(theme: Theme) -> style::Color {
    match theme {
        Theme::Light => style::Color::Rgb {
            r: 0xe6,
            g: 0x9b,
            b: 0x00,
        },
        Theme::Dark => style::Color::Rgb {
            r: 0x5b,
            g: 0x7c,
            b: 0xd6,
        },
    }
}

fn term_color(color: Color) -> style::Color {
    style::Color::Rgb {
        r: color.red,
        g: color.green,
        b: color.blue,
    }
}

fn render(
    view: &View,
    input: &QueryInput,
    widget: &WeatherWidget,
) -> Vec<Line> {
    let mut lines = vec![
        Line::Header("Weather".into()),
        Line::Text(format!(
            "City: {}    Country: {}",
            input.city, input.country
        )),
    ];

    if let Some(error) = &view.error {
        lines.push(Line::Error(error.clone()));
    }

    if let Some(card) = &view.card {
        lines.extend([
            Line::Header(card.title.clone()),
            Line::Text(format!("{} {}", card.icon, card.temperature)),
            Line::Text(format!("Feels like: {}", card.feels_like)),
            Line::Text(format!("Description: {}", card.description)),
            Line::Text(format!("🌅 Sunrise: {}", card.sunrise)),
            Line::Text(format!("🌇 Sunset: {}", card.sunset)),
        ]);
    }

    let settings = widget.settings();
    lines.extend([
        Line::Header("Settings".into()),
        Line::Text(format!("Text color: {}", settings.text_color)),
        Line::Text(format!("Background color: {}", settings.bg_color)),
        Line::Text(format!("Favorite city: {}", settings.fav_city)),
    ]);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        settings::{Settings, SettingsStore},
        weather::{WeatherReading, WeatherSource},
    };
    use anyhow::bail;
    use std::sync::{mpsc, Arc};

    struct Unreachable;

    impl WeatherSource for Unreachable {
        fn current(&self, _: &str) -> anyhow::Result<WeatherReading> {
            bail!("no network in tests")
        }
    }

    struct NullStore;

    impl SettingsStore for NullStore {
        fn load(&self) -> anyhow::Result<Option<Settings>> {
            Ok(None)
        }

        fn save(&self, _: &Settings) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn ui() -> Ui<Vec<u8>> {
        let widget =
            WeatherWidget::new(Arc::new(Unreachable), Box::new(NullStore));
        Ui::new(widget, Vec::new())
    }

    fn output(ui: &Ui<Vec<u8>>) -> String {
        String::from_utf8_lossy(&ui.out).into_owned()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!("".parse::<Command>().unwrap(), Command::Show);
        assert_eq!(
            "city  New York ".parse::<Command>().unwrap(),
            Command::City("New York".into())
        );
        assert_eq!("search".parse::<Command>().unwrap(), Command::Search(None));
        assert_eq!(
            "search Kyiv, UA".parse::<Command>().unwrap(),
            Command::Search(Some(QueryInput {
                city: "Kyiv".into(),
                country: "UA".into(),
            }))
        );
        assert_eq!(
            "search Kyiv".parse::<Command>().unwrap(),
            Command::Search(Some(QueryInput {
                city: "Kyiv".into(),
                country: "".into(),
            }))
        );
        assert_eq!(
            "text-color #ff0000".parse::<Command>().unwrap(),
            Command::TextColor(Color::rgb(255, 0, 0))
        );
        assert_eq!(
            "fav".parse::<Command>().unwrap(),
            Command::FavCity("".into())
        );
        assert_eq!("exit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert!("bg-color red".parse::<Command>().is_err());
        assert!("weather Kyiv".parse::<Command>().is_err());
    }

    #[test]
    fn test_inputs_and_settings() {
        let mut ui = ui();
        assert!(ui.handle_line("city Kyiv").unwrap());
        assert!(ui.handle_line("country UA").unwrap());
        assert_eq!(
            ui.input,
            QueryInput {
                city: "Kyiv".into(),
                country: "UA".into(),
            }
        );

        assert!(ui.handle_line("bg-color #101010").unwrap());
        assert!(ui.handle_line("fav Lviv").unwrap());
        assert_eq!(
            ui.widget.settings(),
            &Settings {
                text_color: Color::BLACK,
                bg_color: Color::rgb(0x10, 0x10, 0x10),
                fav_city: "Lviv".into(),
            }
        );
        assert!(!ui.handle_line("quit").unwrap());
    }

    #[test]
    fn test_bad_input_keeps_state() {
        let mut ui = ui();
        assert!(ui.handle_line("text-color blue").unwrap());
        assert_eq!(ui.widget.settings(), &Settings::default());
        assert!(output(&ui).contains("Invalid color"));
    }

    #[test]
    fn test_render_without_reading() {
        let ui = ui();
        let view = ui.widget.view(0);
        let lines = render(&view, &ui.input, &ui.widget);
        assert_eq!(lines[0], Line::Header("Weather".into()));
        assert!(lines.contains(&Line::Text("Favorite city: ".into())));
        assert!(!lines.iter().any(|line| matches!(line, Line::Error(_))));
    }

    #[test]
    fn test_refresh_skips_unchanged_frame() {
        let mut ui = ui();
        ui.draw(true).unwrap();
        let drawn = ui.out.len();
        ui.draw(false).unwrap();
        assert_eq!(ui.out.len(), drawn);
        ui.draw(true).unwrap();
        assert!(ui.out.len() > drawn);
    }

    #[test]
    fn test_failed_search_shows_error() {
        let mut ui = ui();
        ui.handle_line("search Nonexistentville").unwrap();
        assert_eq!(ui.input.city, "Nonexistentville");
        // Both fetches fail, so the state is settled once this one is joined
        ui.widget
            .fetch_weather(&ui.input.city, &ui.input.country)
            .unwrap()
            .join()
            .unwrap();

        let view = ui.widget.view(0);
        assert_eq!(view.card, None);
        let lines = render(&view, &ui.input, &ui.widget);
        let has_error = lines.iter().any(|line| {
            matches!(line, Line::Error(message) if !message.is_empty())
        });
        assert!(has_error);
    }

    #[test]
    fn test_run_until_quit() {
        let (tx, rx) = mpsc::channel();
        tx.send(Event::Input("city Kyiv".into())).unwrap();
        tx.send(Event::Refresh).unwrap();
        tx.send(Event::Quit).unwrap();
        tx.send(Event::Input("never handled".into())).unwrap();
        let mut out = Vec::new();
        let widget =
            WeatherWidget::new(Arc::new(Unreachable), Box::new(NullStore));
        Ui::new(widget, &mut out).run(rx).unwrap();
        assert!(String::from_utf8_lossy(&out).contains("City: Kyiv"));
    }
}
