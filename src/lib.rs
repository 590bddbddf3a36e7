use anyhow::Result;
use std::sync::{Arc, Mutex};

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// ─── Log level ────────────────────────────────────────────────────────────────

/// Controls the verbosity of paddock's internal tracing output.
///
/// | Variant | `tracing` level | When to use                          |
/// |---------|-----------------|--------------------------------------|
/// | `Error` | `error`         | `--quiet` / scripting                |
/// | `Info`  | `info`          | Default, shows API timings and saves |
/// | `Debug` | `debug`         | `--verbose`, shows every edit too    |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    #[default]
    Info,
    Debug,
}

/// Initialise the global `tracing` subscriber.
///
/// Respects `RUST_LOG` when set, falling back to `level` otherwise. Library
/// consumers who manage their own subscriber should skip this.
///
/// Only available with the `cli` feature (pulls in `tracing-subscriber`).
#[cfg(feature = "cli")]
pub fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;

    let default_filter = match level {
        LogLevel::Error => "paddock=error",
        LogLevel::Info => "paddock=info",
        LogLevel::Debug => "paddock=debug",
    };

    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

// ─── Public API Facade ───

pub use application::drafts::{new_draft_id, DraftRepository, DraftService};
pub use application::monitoring::PerfReport;
pub use application::session::EditSessionController;
pub use application::validation::GroupRules;
pub use domain::agistment::Agistment;
pub use domain::changes::FieldChange;
pub use domain::drafts::MemoryDraftStore;
pub use domain::entity::{Entity, EntityView};
pub use domain::error::EditError;
pub use domain::field_group::FieldGroup;
pub use domain::fingerprint::fingerprint;
pub use domain::ports::{DraftStore, EntityRepository, Notifier, TokenProvider, Validator};
pub use domain::session::{Rejection, SaveOutcome, SessionState, SessionStatus};
pub use domain::value_objects::{EntityId, FieldErrors, Fingerprint};
pub use infrastructure::config::{ApiConfig, AppConfig, DraftConfig};

use crate::application::monitoring::MonitoringRepository;
use crate::application::validation::group_rules;

// ─── Public entry points ───

/// Authenticated listings API, wrapped in the timing decorator.
///
/// The shared `report` accumulates timings from every call made through the
/// returned repository.
pub fn connect_listings(
    cfg: &AppConfig,
    report: Arc<Mutex<PerfReport>>,
) -> Result<Arc<dyn EntityRepository<Agistment>>> {
    let repo = Arc::new(infrastructure::http::listings::connect::<Agistment>(&cfg.api)?);
    Ok(Arc::new(MonitoringRepository::new(repo, report)))
}

/// Open the local draft store described in `cfg.drafts`.
pub async fn open_drafts(cfg: &AppConfig) -> Result<Arc<dyn DraftStore<Agistment>>> {
    let store = infrastructure::db::draft_store::connect::<Agistment>(&cfg.drafts).await?;
    Ok(Arc::new(store))
}

/// Draft lifecycle over the configured draft store, publishing to `server`.
///
/// Pass the repository returned by [`connect_listings`] so drafts and edits
/// share one client and one token.
pub async fn draft_service(
    cfg: &AppConfig,
    server: Arc<dyn EntityRepository<Agistment>>,
) -> Result<DraftService<Agistment>> {
    let store = open_drafts(cfg).await?;
    Ok(DraftService::new(store, server))
}

/// Repository to edit `id` through: the draft store for draft ids, the
/// server otherwise.
pub fn repository_for<E: Entity>(
    id: &EntityId,
    drafts: &DraftService<E>,
    server: Arc<dyn EntityRepository<E>>,
) -> Arc<dyn EntityRepository<E>> {
    if !id.is_draft() {
        return server;
    }
    Arc::new(drafts.repository())
}

/// Edit-session controller for `G` with the group's built-in validation.
pub fn edit_session<G: GroupRules>(
    view: EntityView<G::Entity>,
    repo: Arc<dyn EntityRepository<G::Entity>>,
    notifier: Arc<dyn Notifier>,
) -> EditSessionController<G> {
    EditSessionController::new(view, repo, notifier).with_validator(group_rules::<G>)
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct CountingServer {
        creates: AtomicUsize,
    }

    #[async_trait]
    impl EntityRepository<Agistment> for CountingServer {
        async fn get(&self, id: &EntityId) -> Result<Agistment> {
            anyhow::bail!("no listing {}", id)
        }

        async fn create(&self, entity: &Agistment) -> Result<Agistment> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            let mut created = entity.clone();
            created.id = EntityId::new("srv-1");
            Ok(created)
        }

        async fn update(
            &self,
            id: &EntityId,
            _partial: &Value,
            _cancel: &CancellationToken,
        ) -> Result<Agistment> {
            anyhow::bail!("no listing {}", id)
        }
    }

    fn config() -> AppConfig {
        AppConfig {
            api: ApiConfig {
                base_url: "http://127.0.0.1:9".into(),
                token: "t0".into(),
                refresh_url: None,
                timeout_secs: 1,
            },
            drafts: DraftConfig {
                url: Some("sqlite::memory:".into()),
            },
        }
    }

    #[tokio::test]
    async fn drafts_publish_through_the_given_server() {
        let server = Arc::new(CountingServer::default());
        let drafts = draft_service(&config(), server.clone()).await.unwrap();

        let draft = drafts.start_from_scratch().await.unwrap();
        let published = drafts.publish(&draft.id).await.unwrap();

        assert_eq!(published.id, EntityId::new("srv-1"));
        assert_eq!(server.creates.load(Ordering::SeqCst), 1);
        assert!(drafts.list().await.unwrap().is_empty());
    }
}
