//! # Paddock: library usage example
//!
//! Shows three ways of driving edit sessions from Rust:
//!
//! 1. **Offline draft**: start a draft in memory and edit it section by section
//! 2. **Observing a session**: watch the status channel while editing photos
//! 3. **Against the API**: load a listing from a configured server and save
//!
//! Run offline:
//!   cargo run --example edit_as_lib
//!
//! Run against a server (needs a config file and a listing id):
//!   cargo run --example edit_as_lib -- paddock.toml <listing-id>

use std::sync::Arc;

use anyhow::Result;
use paddock::domain::agistment::Photo;
use paddock::domain::field_group::{ContactInfo, Header, PaddockGroup, PhotoGroup};
use paddock::presentation::notifier::TracingNotifier;
use paddock::{
    edit_session, Agistment, AppConfig, DraftRepository, DraftService, DraftStore, EntityId,
    EntityRepository, EntityView, MemoryDraftStore, PerfReport, SaveOutcome,
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match (args.get(1), args.get(2)) {
        (Some(path), Some(id)) => against_api(path, id).await,
        _ => {
            offline_draft().await?;
            observe_photos().await
        }
    }
}

/// Drafts kept in memory. A second in-memory store plays the server.
fn offline_drafts() -> (Arc<dyn DraftStore<Agistment>>, DraftService<Agistment>) {
    let store: Arc<dyn DraftStore<Agistment>> = Arc::new(MemoryDraftStore::new());
    let server = DraftRepository::new(Arc::new(MemoryDraftStore::<Agistment>::new()));
    let drafts = DraftService::new(Arc::clone(&store), Arc::new(server));
    (store, drafts)
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern 1: a draft that never leaves the machine
// ─────────────────────────────────────────────────────────────────────────────
async fn offline_draft() -> Result<()> {
    println!("=== Pattern 1: offline draft ===\n");

    let (_, drafts) = offline_drafts();
    let draft = drafts.start_from_scratch().await?;
    let repo: Arc<dyn EntityRepository<Agistment>> = Arc::new(drafts.repository());
    let view = EntityView::new(draft);

    // Each section gets its own controller; they share the same view.
    let mut header =
        edit_session::<Header>(view.clone(), repo.clone(), Arc::new(TracingNotifier));
    header.open()?;
    header.edit("name", json!("ab"))?;
    if let SaveOutcome::Invalid(errors) = header.save().await {
        for (field, message) in errors.iter() {
            println!("  {field}: {message}");
        }
    }
    header.edit("name", json!("Willow Creek"))?;
    header.edit("propertySize", json!(40))?;
    println!("header saved: {}", header.save().await.is_saved());

    let mut paddocks =
        edit_session::<PaddockGroup>(view.clone(), repo, Arc::new(TracingNotifier));
    paddocks.open()?;
    paddocks.edit_with(|p| {
        p.0.private_paddocks.total_paddocks = 6;
        p.0.private_paddocks.available = 2;
        p.0.private_paddocks.weekly_price = 90;
    })?;
    for change in paddocks.changes() {
        println!("  {} : {} -> {}", change.field, change.before, change.after);
    }
    println!("paddocks saved: {}", paddocks.save().await.is_saved());

    let listing = view.get();
    println!(
        "\n{} ({} acres), stored drafts: {:?}\n",
        listing.basic_info.name,
        listing.basic_info.property_size,
        drafts.list().await?
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern 2: follow a session's status while reordering photos
// ─────────────────────────────────────────────────────────────────────────────
async fn observe_photos() -> Result<()> {
    println!("=== Pattern 2: observing a photo session ===\n");

    let (store, drafts) = offline_drafts();
    let mut draft = drafts.start_from_scratch().await?;
    draft.photos = ["front.jpg", "arena.jpg", "stables.jpg"]
        .into_iter()
        .map(|link| Photo {
            link: link.into(),
            comment: None,
        })
        .collect();
    store.put(&draft.id, &draft).await?;

    let view = EntityView::new(draft);
    let mut photos = edit_session::<PhotoGroup>(
        view.clone(),
        Arc::new(drafts.repository()),
        Arc::new(TracingNotifier),
    );
    let mut status = photos.subscribe();
    let watcher = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let s = status.borrow().clone();
            println!(
                "  status: {:?} dirty={} can_save={}",
                s.state, s.dirty, s.can_save
            );
        }
    });

    photos.open()?;
    photos.edit_with(|g| g.move_photo(2, 0))?;
    photos.save().await;
    drop(photos);
    watcher.await?;

    let order: Vec<String> = view.get().photos.into_iter().map(|p| p.link).collect();
    println!("photo order: {order:?}\n");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Pattern 3: a real listing on the configured server
// ─────────────────────────────────────────────────────────────────────────────
async fn against_api(path: &str, id: &str) -> Result<()> {
    println!("=== Pattern 3: editing {id} via {path} ===\n");

    let cfg = AppConfig::load(path)?;
    let report = PerfReport::new();
    let server = paddock::connect_listings(&cfg, Arc::clone(&report))?;

    let id = EntityId::new(id);
    let view = EntityView::new(server.get(&id).await?);
    let mut contact = edit_session::<ContactInfo>(view, server, Arc::new(TracingNotifier));
    contact.open()?;
    contact.edit("number", json!("0412 345 678"))?;

    match contact.save().await {
        SaveOutcome::Saved {
            external_changes, ..
        } => println!("saved; {} field(s) changed elsewhere", external_changes.len()),
        other => println!("not saved: {other:?}"),
    }

    if let Ok(perf) = report.lock() {
        for t in &perf.timings {
            println!("  {} {} {}ms", t.operation, t.entity_id, t.duration_ms);
        }
    }
    Ok(())
}
