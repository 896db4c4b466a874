use anyhow::{Result, bail};
use clap::Parser;
use tokio_stream::StreamExt;

/// Prints events from a running relay's stream.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Poll interval to request, in milliseconds.
    #[arg(long)]
    interval: Option<u64>,

    /// Session cookie value (`pulse.sid`), if streaming a logged in session.
    #[arg(long)]
    session: Option<String>,

    /// Stop after this many events.
    #[arg(long, default_value_t = 3)]
    events: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut url = format!("{}/api/stream", args.url.trim_end_matches('/'));
    if let Some(interval) = args.interval {
        url.push_str(&format!("?interval={interval}"));
    }

    let mut request = reqwest::Client::new().get(&url);
    if let Some(session) = &args.session {
        request = request.header("Cookie", format!("pulse.sid={session}"));
    }

    let response = request.send().await?;
    println!("Status: {}\n", response.status());
    if !response.status().is_success() {
        bail!("stream request failed");
    }

    let mut body = std::pin::pin!(response.bytes_stream());
    let mut buffer = String::new();
    let mut seen = 0;

    while let Some(chunk) = body.next().await {
        buffer.push_str(&String::from_utf8_lossy(&chunk?));

        while let Some(end) = buffer.find("\n\n") {
            let event: String = buffer.drain(..end + 2).collect();
            if event.starts_with(':') {
                continue;
            }

            println!("{}", event.trim_end());
            println!();

            seen += 1;
            if seen >= args.events {
                return Ok(());
            }
        }
    }

    println!("Stream ended after {seen} events");

    Ok(())
}
