use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use paddock::domain::field_group::{
    CareGroup, ContactInfo, Description, FacilityGroup, Header, LocationInfo, PaddockGroup,
    PhotoGroup, RidingGroup, ServiceGroup, GROUP_NAMES,
};
use paddock::presentation::cli_summary::{
    print_changes, print_drafts, print_listing, print_outcome, print_perf_summary,
};
use paddock::presentation::notifier::ConsoleNotifier;
use paddock::{
    AppConfig, DraftService, EntityId, EntityRepository, EntityView, GroupRules, LogLevel,
    PerfReport,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(
    name = "paddock",
    about = "Paddock: edit agistment listings from the terminal."
)]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Show every edit and API call.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a listing.
    Show { id: String },

    /// Change fields of one group and save them.
    Edit {
        id: String,

        /// Field group to edit, e.g. `contact` or `paddocks`.
        #[arg(short, long)]
        group: String,

        /// `field=value`; the value is parsed as JSON, falling back to a string.
        #[arg(short, long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, Value)>,

        /// Show the pending changes without saving.
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage listings that have not been published yet.
    #[command(subcommand)]
    Draft(DraftCommand),
}

#[derive(Subcommand, Debug)]
enum DraftCommand {
    /// Start a new draft listing.
    New,
    List,
    /// Send a draft to the server.
    Publish { id: String },
    Discard { id: String },
}

fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got `{raw}`"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in `{raw}`"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((field.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    paddock::init_tracing(if cli.verbose {
        LogLevel::Debug
    } else if cli.quiet {
        LogLevel::Error
    } else {
        LogLevel::Info
    });

    let cfg = AppConfig::load(&cli.config)?;
    let report = PerfReport::new();
    let server = paddock::connect_listings(&cfg, Arc::clone(&report))?;
    let drafts = paddock::draft_service(&cfg, Arc::clone(&server)).await?;

    let result = match cli.command {
        Command::Show { id } => {
            let id = EntityId::new(id);
            let repo = paddock::repository_for(&id, &drafts, server);
            let listing = repo.get(&id).await?;
            print_listing(&listing);
            Ok(())
        }
        Command::Edit {
            id,
            group,
            set,
            dry_run,
        } => {
            let id = EntityId::new(id);
            let repo = paddock::repository_for(&id, &drafts, server);
            edit(&group, repo, &id, set, dry_run).await
        }
        Command::Draft(cmd) => draft(cmd, &drafts).await,
    };

    if let Ok(perf) = report.lock() {
        if cli.verbose {
            print_perf_summary(&perf);
        }
    }
    result
}

async fn edit(
    group: &str,
    repo: Arc<dyn EntityRepository<paddock::Agistment>>,
    id: &EntityId,
    set: Vec<(String, Value)>,
    dry_run: bool,
) -> Result<()> {
    match group {
        "header" => edit_group::<Header>(repo, id, set, dry_run).await,
        "description" => edit_group::<Description>(repo, id, set, dry_run).await,
        "contact" => edit_group::<ContactInfo>(repo, id, set, dry_run).await,
        "location" => edit_group::<LocationInfo>(repo, id, set, dry_run).await,
        "paddocks" => edit_group::<PaddockGroup>(repo, id, set, dry_run).await,
        "facilities" => edit_group::<FacilityGroup>(repo, id, set, dry_run).await,
        "ridingFacilities" => edit_group::<RidingGroup>(repo, id, set, dry_run).await,
        "care" => edit_group::<CareGroup>(repo, id, set, dry_run).await,
        "services" => edit_group::<ServiceGroup>(repo, id, set, dry_run).await,
        "photos" => edit_group::<PhotoGroup>(repo, id, set, dry_run).await,
        other => bail!(
            "Unknown group `{}` (expected one of: {})",
            other,
            GROUP_NAMES.join(", ")
        ),
    }
}

async fn edit_group<G>(
    repo: Arc<dyn EntityRepository<paddock::Agistment>>,
    id: &EntityId,
    set: Vec<(String, Value)>,
    dry_run: bool,
) -> Result<()>
where
    G: GroupRules<Entity = paddock::Agistment>,
{
    if set.is_empty() {
        bail!("Nothing to change: pass at least one --set FIELD=VALUE");
    }

    let listing = repo.get(id).await?;
    let view = EntityView::new(listing);
    let mut session = paddock::edit_session::<G>(view, repo, Arc::new(ConsoleNotifier));

    session.open()?;
    for (field, value) in set {
        session.edit(&field, value)?;
    }
    print_changes(G::LABEL, &session.changes());

    if dry_run {
        session.cancel();
        return Ok(());
    }

    if let Some(token) = session.cancel_handle() {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, abandoning save");
                token.cancel();
            }
        });
    }

    let outcome = session.save().await;
    if print_outcome(&outcome) {
        Ok(())
    } else {
        Err(anyhow!("{} were not saved", G::LABEL))
    }
}

async fn draft(cmd: DraftCommand, drafts: &DraftService<paddock::Agistment>) -> Result<()> {
    match cmd {
        DraftCommand::New => {
            let draft = drafts.start_from_scratch().await?;
            println!("Created draft {}", draft.id);
        }
        DraftCommand::List => {
            let ids = drafts.list().await?;
            print_drafts(&ids);
        }
        DraftCommand::Publish { id } => {
            let published = drafts
                .publish(&EntityId::new(id))
                .await
                .context("Publishing failed; the draft was kept")?;
            print_listing(&published);
        }
        DraftCommand::Discard { id } => {
            let id = EntityId::new(id);
            drafts.discard(&id).await?;
            println!("Discarded draft {id}");
        }
    }
    Ok(())
}
