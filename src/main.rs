// src/main.rs
use anyhow::Result;
use poll_client::{config::Config, handlers::App, poll::tally};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::load()?;
    let mut app = App::from_config(&config)?;

    match app.session().identity() {
        Some(identity) => info!("Signed in as {identity}"),
        None => info!("Not signed in"),
    }
    let identity = app.session().identity().map(str::to_string);

    let polls = app.refresh().await?;
    println!("Fetched {} polls:", polls.len());
    for poll in polls {
        println!("{} (by {}, {})", poll.question, poll.created_by, poll.created_at.format("%Y-%m-%d %H:%M"));
        let mine = identity.as_deref().and_then(|i| poll.vote_of(i));
        for (index, row) in tally(poll).iter().enumerate() {
            let marker = if mine == Some(index) { "*" } else { " " };
            println!("  {marker} {row} ({} votes)", row.votes);
        }
    }

    Ok(())
}
