pub mod config;
pub mod error;
pub mod service;
pub mod state;
pub mod storage;
pub mod store;

use anyhow::{bail, Context};
use chrono::Utc;
use flashset_core::{CardFace, FaceSide, Rating};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::RuntimeConfig;
use crate::service::{SessionStart, StudyService};
use crate::storage::{SqliteStorage, Storage};

const USAGE: &str = "usage: flashset <command>

commands:
  sets                              list sets
  create-set <name>                 create an empty set
  add-card <set-id> <front> <back>  append a card
  overview <set-id>                 show study counts
  study <set-id>                    study from the terminal";

pub async fn run() -> anyhow::Result<()> {
    let config = RuntimeConfig::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    tracing::info!("Opening database at {}", config.database_path.display());
    let storage = SqliteStorage::open(&config.database_path)?;
    let service = StudyService::new(storage, config.study);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["sets"] => {
            for set in service.list_sets().await? {
                println!("{}  {} ({} cards)", set.id, set.name, set.card_count);
            }
        }
        ["create-set", name] => {
            let set_id = service.create_set(name).await?;
            println!("{}", set_id);
        }
        ["add-card", set_id, front, back] => {
            service.open_set(set_id).await?;
            let card_id = service.add_card(set_id).await?;
            service
                .save_card_face(set_id, &card_id, FaceSide::Front, CardFace::rich_text(*front))
                .await?;
            service
                .save_card_face(set_id, &card_id, FaceSide::Back, CardFace::rich_text(*back))
                .await?;
            println!("{}", card_id);
        }
        ["overview", set_id] => {
            service.open_set(set_id).await?;
            let overview = service.overview(set_id, Utc::now()).await?;
            println!("{}", serde_json::to_string_pretty(&overview)?);
        }
        ["study", set_id] => study(&service, set_id).await?,
        _ => bail!(USAGE),
    }

    Ok(())
}

/// Terminal study loop: show the front, wait, show the back, read a grade.
async fn study<S: Storage>(service: &StudyService<S>, set_id: &str) -> anyhow::Result<()> {
    service.open_set(set_id).await?;

    let mut session = match service.start_study_session(set_id, Utc::now()).await? {
        SessionStart::Empty(overview) if overview.is_empty_set() => {
            println!("This set contains no cards.");
            return Ok(());
        }
        SessionStart::Empty(_) => {
            println!("Nothing to study right now.");
            return Ok(());
        }
        SessionStart::Started { session, overview } => {
            println!(
                "Studying {} new and {} known cards.",
                overview.new_cards_in_study, overview.known_cards_in_study
            );
            session
        }
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(card) = service.next_card(&mut session, Utc::now()).await? {
        println!("\n{}", card.front.content.as_deref().unwrap_or(""));
        println!("(press enter to flip)");
        if lines.next_line().await?.is_none() {
            return Ok(());
        }

        println!("{}", card.back.content.as_deref().unwrap_or(""));
        let rating = loop {
            println!("grade: 1 again, 2 hard, 3 good, 4 easy");
            let Some(line) = lines.next_line().await? else {
                return Ok(());
            };
            match line.trim().parse().ok().and_then(Rating::from_value) {
                Some(rating) => break rating,
                None => println!("'{}' is not a grade", line.trim()),
            }
        };

        service
            .grade_card(&mut session, &card.id, rating, Utc::now())
            .await?;
    }

    println!("\nDone: {} cards graded.", session.graded());
    Ok(())
}
