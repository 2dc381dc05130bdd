//! `museum-chat`: book museum tickets from the terminal.
//!
//! Talks to the services named in the environment, or to the in-memory
//! backend when `MUSEUM_OFFLINE` is set.

use anyhow::Context;
use museum_tickets::chat::Chat;
use museum_tickets::config::Config;
use museum_tickets::http::HttpBackend;
use museum_tickets::mock::InMemoryBackend;
use museum_tickets::services::{BookingService, CalendarService, PricingService, StatusService};
use museum_tickets::session::{BookingSession, SessionEnvironment};
use museum_tickets::{CalendarAggregator, StatusLookup};
use museum_tickets_core::environment::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    // Logs go to stderr so they do not interleave with the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "museum_tickets=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        backend_url = %config.backend_url,
        gateway_url = %config.gateway_url,
        timeout_secs = config.request_timeout.as_secs(),
        offline = config.offline,
        "Configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut chat = if config.offline {
        build_chat(Arc::new(InMemoryBackend::new()), clock, &config)
    } else {
        let backend = HttpBackend::new(&config).context("failed to build HTTP client")?;
        build_chat(Arc::new(backend), clock, &config)
    };

    print_lines(&Chat::greeting());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut results = chat.subscribe();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break;
                };
                let reply = chat.handle(&line).await?;
                print_lines(&reply.lines);
                if reply.quit {
                    break;
                }
            },
            result = results.recv() => match result {
                Ok(_) | Err(RecvError::Lagged(_)) => print_lines(&chat.updates().await),
                Err(RecvError::Closed) => break,
            },
        }
    }

    chat.session()
        .shutdown(SHUTDOWN_TIMEOUT)
        .await
        .context("in-flight requests did not finish")?;
    info!("Session closed");
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn build_chat<B>(backend: Arc<B>, clock: Arc<dyn Clock>, config: &Config) -> Chat
where
    B: PricingService + CalendarService + BookingService + StatusService + 'static,
{
    let session = BookingSession::new(SessionEnvironment::with_backend(clock.clone(), backend.clone()));
    let calendar = CalendarAggregator::new(backend.clone(), config.calendar_policy());
    let status = StatusLookup::new(backend);
    Chat::new(session, calendar, status, clock)
}
