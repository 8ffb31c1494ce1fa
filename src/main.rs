mod config;
mod settings;
mod ui;
mod util;
mod weather;
mod widget;

use crate::{
    config::Config,
    settings::SettingsFile,
    ui::{Event, Ui},
    weather::OpenWeather,
    widget::WeatherWidget,
};
use anyhow::Context;
use log::{error, LevelFilter};
use std::{
    io,
    sync::{mpsc, Arc},
    thread,
};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("weather_widget", LevelFilter::Warn)
        .parse_default_env()
        .init();

    let config = Config::load()?;
    let (sender, events) = mpsc::channel();

    let mut widget = WeatherWidget::new(
        Arc::new(OpenWeather::new(&config)),
        Box::new(SettingsFile::new(&config.settings_file)),
    );
    let refresh = sender.clone();
    widget.set_listener(Arc::new(move || {
        // Receiver is only gone during shutdown
        let _ = refresh.send(Event::Refresh);
    }));

    let quit = sender.clone();
    ctrlc::set_handler(move || {
        let _ = quit.send(Event::Quit);
    })
    .context("Error setting Ctrl-C handler")?;

    thread::spawn(move || {
        for line in io::stdin().lines() {
            match line {
                Ok(line) => {
                    if sender.send(Event::Input(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    error!("Error reading input: {err}");
                    break;
                }
            }
        }
        // EOF
        let _ = sender.send(Event::Quit);
    });

    Ui::new(widget, io::stdout()).run(events)
}
