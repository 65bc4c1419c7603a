use clap::Parser;
use client::{Category, ClientConfig, Connection, Event};
use log::{error, info, warn};
use shared::Record;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON-lines file of decoded server records (stdin if omitted)
    #[arg(short = 'i', long)]
    input: Option<String>,

    /// Do not ask for the seek list again after one of the user's games ends
    #[arg(long)]
    no_seek_refresh: bool,

    /// Capacity of the inbound record queue (at least 1)
    #[arg(short = 'b', long, default_value = "1000")]
    record_buffer: usize,
}

const CATEGORIES: [Category; 8] = [
    Category::Game,
    Category::Move,
    Category::Clock,
    Category::BoardFlip,
    Category::Offer,
    Category::Seek,
    Category::Chat,
    Category::PlainText,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ClientConfig {
        record_buffer: args.record_buffer,
        refresh_seeks_after_game: !args.no_seek_refresh,
        ..ClientConfig::default()
    };

    let (records_tx, records_rx) = config.record_channel();
    let (transport_tx, mut transport_rx) = mpsc::unbounded_channel();

    let handle = Connection::spawn(config, records_rx, transport_tx);

    for category in CATEGORIES {
        handle.subscribe(category, move |event: &Event| {
            println!("[{:?}] {}", category, describe(event));
        });
    }

    let outbound = tokio::spawn(async move {
        while let Some(command) = transport_rx.recv().await {
            println!("> {}", command);
        }
    });

    let reader: Box<dyn AsyncRead + Unpin + Send> = match &args.input {
        Some(path) => {
            info!("Replaying records from {}", path);
            Box::new(tokio::fs::File::open(path).await?)
        }
        None => {
            info!("Replaying records from stdin");
            Box::new(tokio::io::stdin())
        }
    };

    let mut lines = BufReader::new(reader).lines();
    let mut line_number = 0usize;
    let mut replayed = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<Record>(&line) {
            Ok(record) => {
                if records_tx.send(record).await.is_err() {
                    error!("Connection stopped accepting records");
                    break;
                }
                replayed += 1;
            }
            Err(e) => warn!("Line {}: not a record: {}", line_number, e),
        }
    }

    drop(records_tx);
    handle.join().await;
    handle.flush().await?;

    // The handle keeps the transport open; dropping it ends the printer.
    drop(handle);
    outbound.await?;

    info!("Replayed {} records", replayed);
    Ok(())
}

fn describe(event: &Event) -> String {
    match event {
        Event::GameStarted(game) => format!(
            "game {} started: {} vs {} ({})",
            game.id, game.white_name, game.black_name, game.category
        ),
        Event::GameEnded { game, result } => format!("game {} ended: {:?}", game.id, result),
        Event::MoveMade { game_id, mv, san } => match san {
            Some(san) => format!("game {}: {} ({})", game_id, mv, san),
            None => format!("game {}: {}", game_id, mv),
        },
        Event::SeekAdded(seek) => format!(
            "seek {} added: {}{} {} {} {}+{}",
            seek.id,
            seek.handle,
            seek.titles,
            seek.rating,
            seek.match_type,
            seek.time_ms / 60_000,
            seek.increment_ms / 1000
        ),
        Event::SeekRemoved(seek) => format!("seek {} removed", seek.id),
        Event::PlainText(line) => line.clone(),
        other => format!("{:?}", other),
    }
}
