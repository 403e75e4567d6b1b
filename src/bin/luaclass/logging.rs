//! Subscriber setup for the CLI.

use std::{io, str::FromStr};

use clap::ValueEnum;
use luaclass::LogSettings;
use tracing::Level;
use tracing_subscriber::{Layer, filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Colored, multi-line
    Pretty,
    Compact,
    /// One JSON object per event
    Json,
}

fn level(name: &str) -> Level {
    Level::from_str(name).unwrap_or(Level::INFO)
}

pub fn init(settings: &LogSettings, format: LogFormat) {
    let targets = Targets::new()
        .with_default(level(&settings.global))
        .with_target("luaclass::lua::class", level(settings.level_for("class")))
        .with_target("luaclass::lua::object", level(settings.level_for("class")))
        .with_target("luaclass::lua::table", level(settings.level_for("table")))
        .with_target("luaclass::lua", level(settings.level_for("engine")));

    let layer = format_layer(format, io::stderr).with_filter(targets);
    tracing_subscriber::registry().with(layer).init();
}

fn format_layer<W, F>(format: LogFormat, make_writer: F) -> impl Layer<tracing_subscriber::Registry>
where
    W: io::Write + Send + Sync + 'static,
    F: Fn() -> W + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(make_writer)
            .boxed(),
    }
}
