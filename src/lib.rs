pub mod activation;
pub mod aggregate;
pub mod config;
pub mod detail;
pub mod models;
pub mod source;
mod utils;
pub mod views;

use std::fs;

use anyhow::{anyhow, Context};
use chrono_tz::Tz;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use activation::PageSlot;
use aggregate::{Aggregator, LoadState, SiteData};
use config::SiteConfig;
use models::EventDetail;
use source::memory::MemorySource;
use source::rest::RestSource;
use source::DataSource;
use views::{EventsView, HomeView, StatusFilter};

/// Which page the binary renders.
#[derive(Debug, Clone, PartialEq)]
pub enum Page {
    Home,
    Events(StatusFilter),
    Event(Option<String>),
}

impl Page {
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Self> {
        let mut args = args.into_iter();
        match args.next().as_deref() {
            None | Some("home") => Ok(Page::Home),
            Some("events") => {
                let filter = match args.next() {
                    Some(raw) => raw.parse::<StatusFilter>().map_err(|err| anyhow!(err))?,
                    None => StatusFilter::default(),
                };
                Ok(Page::Events(filter))
            }
            Some("event") => Ok(Page::Event(args.next())),
            Some(other) => Err(anyhow!(
                "unknown page {other}; expected home, events [all|upcoming|past] or event <id>"
            )),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Rendered {
    Home(LoadState<HomeView>),
    Events(LoadState<EventsView>),
    Event(LoadState<EventDetail>),
}

fn map_state<T, U>(state: LoadState<T>, f: impl FnOnce(T) -> U) -> LoadState<U> {
    match state {
        LoadState::Loading => LoadState::Loading,
        LoadState::Ready(value) => LoadState::Ready(f(value)),
        LoadState::Failed(message) => LoadState::Failed(message),
    }
}

fn render_site(state: LoadState<SiteData>, page: &Page, tz: Tz) -> Rendered {
    match page {
        Page::Events(filter) => Rendered::Events(map_state(state, |data| {
            EventsView::build(&data.events, *filter, tz)
        })),
        _ => Rendered::Home(map_state(state, |data| {
            HomeView::build(&data.events, data.club_settings, tz)
        })),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Logs go to stderr so stdout carries only the rendered page.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn render_with<S: DataSource>(page: &Page, source: S, tz: Tz) -> Rendered {
    match page {
        Page::Event(id) => {
            let slot: PageSlot<EventDetail> = PageSlot::new();
            activation::activate_detail(&slot, &source, id.as_deref()).await;
            Rendered::Event(slot.state())
        }
        _ => {
            let slot: PageSlot<SiteData> = PageSlot::new();
            let aggregator = Aggregator::new(source);
            activation::activate_site(&slot, &aggregator).await;
            render_site(slot.state(), page, tz)
        }
    }
}

async fn render(page: Page, config: &SiteConfig) -> anyhow::Result<Rendered> {
    let tz = config.timezone()?;

    if let Some(path) = config.fixture_path.as_deref() {
        tracing::info!(path, "serving pages from fixture");
        let body = fs::read_to_string(path)
            .with_context(|| format!("failed to read fixture {path}"))?;
        let source = MemorySource::from_json(&body)
            .with_context(|| format!("failed to parse fixture {path}"))?;
        return Ok(render_with(&page, source, tz).await);
    }

    let remote = config.remote()?;
    let source = RestSource::new(&remote.project_url, &remote.anon_key, remote.timeout)
        .context("failed to build data source")?;
    Ok(render_with(&page, source, tz).await)
}

pub fn run() -> anyhow::Result<()> {
    init_logging();
    let page = Page::from_args(std::env::args().skip(1))?;
    let config = SiteConfig::load()?;
    tracing::info!(?page, "rendering page");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let rendered = runtime.block_on(render(page, &config))?;

    if let Rendered::Home(LoadState::Failed(message))
    | Rendered::Events(LoadState::Failed(message))
    | Rendered::Event(LoadState::Failed(message)) = &rendered
    {
        tracing::warn!(error = %message, "page rendered in error state");
    }
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}
