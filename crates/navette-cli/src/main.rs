//! `navette`: inspect and edit the school-transport record files.
//!
//! # Usage
//!
//! ```text
//! navette notifications --data data/notifications.json list --sort priority
//! navette absences --data data/absences.json list --search jacq --from 2024-09-01
//! navette --dry-run documents --data data/documents.json delete doc-4
//! ```
//!
//! Store settings come from `navette.toml` (or the path given with
//! `--config`) and `NAVETTE_*` environment variables.

mod backend;
mod render;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use backend::Backend;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use navette_core::{
  Entity, FilterSpec, RecordId,
  entity::{Absence, Document, Notification, Trip},
  filter::DateRange,
};
use navette_store::{RecordStore, StoreConfig};
use render::Summary;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

type Store<E> = RecordStore<E, Backend<E>>;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "navette", version, about = "School-transport record stores")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "navette.toml")]
  config: PathBuf,

  /// Run against an in-memory copy of the data file; nothing is written back.
  #[arg(long, global = true)]
  dry_run: bool,

  #[command(subcommand)]
  entity: EntityCommand,
}

#[derive(Args, Debug)]
struct Source {
  /// JSON file holding the records. A missing file is an empty store.
  #[arg(short, long, value_name = "FILE")]
  data: PathBuf,
}

#[derive(Subcommand, Debug)]
enum EntityCommand {
  Absences {
    #[command(flatten)]
    source:  Source,
    #[command(subcommand)]
    command: Command,
  },
  Documents {
    #[command(flatten)]
    source:  Source,
    #[command(subcommand)]
    command: Command,
  },
  Notifications {
    #[command(flatten)]
    source:  Source,
    #[command(subcommand)]
    command: NotificationCommand,
  },
  Trips {
    #[command(flatten)]
    source:  Source,
    #[command(subcommand)]
    command: Command,
  },
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the filtered, sorted view.
  List(ListArgs),
  /// Print per-category counts over all records.
  Counts {
    #[arg(long)]
    json: bool,
  },
  /// Print one record as JSON.
  Show { id: String },
  /// Delete one record. Deleting an unknown id succeeds.
  Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum NotificationCommand {
  #[command(flatten)]
  Common(Command),
  /// Mark one notification as read.
  Read { id: String },
  /// Mark every notification as read.
  ReadAll,
  /// Pin or unpin one notification.
  Pin { id: String },
}

#[derive(Args, Debug)]
struct ListArgs {
  /// Case-insensitive text search.
  #[arg(short, long)]
  search: Option<String>,

  /// Sort key, e.g. `date-asc` or `name-desc`.
  #[arg(long)]
  sort: Option<String>,

  /// Earliest date, inclusive (`YYYY-MM-DD` or RFC 3339).
  #[arg(long, value_parser = parse_from)]
  from: Option<DateTime<Utc>>,

  /// Latest date, inclusive (`YYYY-MM-DD` or RFC 3339).
  #[arg(long, value_parser = parse_to)]
  to: Option<DateTime<Utc>>,

  /// Print the view as a JSON array.
  #[arg(long)]
  json: bool,
}

// ─── Date arguments ───────────────────────────────────────────────────────────

fn parse_bound(value: &str, day_time: NaiveTime) -> Result<DateTime<Utc>, String> {
  if let Ok(at) = DateTime::parse_from_rfc3339(value) {
    return Ok(at.with_timezone(&Utc));
  }
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .map(|d| d.and_time(day_time).and_utc())
    .map_err(|_| format!("`{value}` is neither YYYY-MM-DD nor an RFC 3339 timestamp"))
}

/// A bare date starts at midnight.
fn parse_from(value: &str) -> Result<DateTime<Utc>, String> {
  parse_bound(value, NaiveTime::MIN)
}

/// A bare date covers the whole day.
fn parse_to(value: &str) -> Result<DateTime<Utc>, String> {
  let end = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
  parse_bound(value, end)
}

// ─── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("NAVETTE"))
    .build()
    .context("failed to read config file")?;

  let store_cfg: StoreConfig = settings
    .try_deserialize()
    .context("failed to deserialise StoreConfig")?;

  tracing::debug!(?store_cfg, dry_run = cli.dry_run, "configuration loaded");

  match cli.entity {
    EntityCommand::Absences { source, command } => {
      let store = open::<Absence>(&source, cli.dry_run, &store_cfg).await?;
      run(&store, command).await
    }
    EntityCommand::Documents { source, command } => {
      let store = open::<Document>(&source, cli.dry_run, &store_cfg).await?;
      run(&store, command).await
    }
    EntityCommand::Trips { source, command } => {
      let store = open::<Trip>(&source, cli.dry_run, &store_cfg).await?;
      run(&store, command).await
    }
    EntityCommand::Notifications { source, command } => {
      let store = open::<Notification>(&source, cli.dry_run, &store_cfg).await?;
      run_notifications(&store, command).await
    }
  }
}

/// Open a store over the data file and load it.
async fn open<E: Entity>(
  source: &Source,
  dry_run: bool,
  config: &StoreConfig,
) -> Result<Store<E>> {
  let backend = Backend::open(&source.data, dry_run, config)
    .await
    .with_context(|| format!("failed to open {}", source.data.display()))?;
  let store = RecordStore::with_config(backend, config);
  let loaded = store
    .fetch()
    .await
    .with_context(|| format!("failed to load {}s", E::KIND))?;
  tracing::info!(kind = E::KIND, loaded, "store ready");
  Ok(store)
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn run<E: Entity + Summary>(store: &Store<E>, command: Command) -> Result<()> {
  match command {
    Command::List(args) => list(store, args)?,
    Command::Counts { json } => {
      let counts = store.counts();
      if json {
        println!("{}", serde_json::to_string_pretty(&*counts)?);
      } else {
        println!("{}", render::counts(&counts));
      }
    }
    Command::Show { id } => {
      let Some(record) = store.get_by_id(&RecordId::from(id.as_str())) else {
        bail!("{} not found: {id}", E::KIND);
      };
      println!("{}", serde_json::to_string_pretty(&record)?);
    }
    Command::Delete { id } => {
      store
        .delete(&RecordId::from(id))
        .await
        .with_context(|| format!("failed to delete {}", E::KIND))?;
      println!("{} {}s remaining", store.records().len(), E::KIND);
    }
  }
  Ok(())
}

fn list<E: Entity + Summary>(store: &Store<E>, args: ListArgs) -> Result<()> {
  if let Some(key) = &args.sort {
    store.set_sort(E::parse_sort(key)?);
  }
  let range = DateRange::new(args.from, args.to);
  store.set_filters(|filter| {
    filter.set_search(args.search);
    filter.set_dates(range);
  });

  let view = store.view();
  if args.json {
    println!("{}", serde_json::to_string_pretty(&*view)?);
    return Ok(());
  }
  for record in view.iter() {
    println!("{}", record.summary());
  }
  tracing::debug!(shown = view.len(), total = store.records().len(), "listed");
  Ok(())
}

async fn run_notifications(
  store: &Store<Notification>,
  command: NotificationCommand,
) -> Result<()> {
  match command {
    NotificationCommand::Common(command) => run(store, command).await?,
    NotificationCommand::Read { id } => {
      let n = store
        .mark_read(&RecordId::from(id))
        .await
        .context("failed to mark notification as read")?;
      println!("{}", n.summary());
    }
    NotificationCommand::ReadAll => {
      let changed = store
        .mark_all_read()
        .await
        .context("failed to mark notifications as read")?;
      println!("{changed} marked as read");
    }
    NotificationCommand::Pin { id } => {
      let n = store
        .toggle_pin(&RecordId::from(id))
        .await
        .context("failed to toggle pin")?;
      println!("{}", n.summary());
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn cli_definition_is_consistent() { Cli::command().debug_assert(); }

  #[test]
  fn bare_dates_cover_whole_days() {
    let from = parse_from("2024-09-02").unwrap();
    let to = parse_to("2024-09-02").unwrap();
    assert_eq!(from.to_rfc3339(), "2024-09-02T00:00:00+00:00");
    assert_eq!(to.format("%H:%M:%S").to_string(), "23:59:59");
    assert!(parse_from("2024-09-02T07:30:00+02:00").is_ok());
    assert!(parse_from("next tuesday").is_err());
  }

  #[test]
  fn notification_subcommands_include_common_ones() {
    let cli = Cli::try_parse_from([
      "navette",
      "notifications",
      "--data",
      "n.json",
      "list",
      "--sort",
      "priority",
    ])
    .unwrap();
    let EntityCommand::Notifications { command, .. } = cli.entity else {
      panic!("expected notifications");
    };
    assert!(matches!(
      command,
      NotificationCommand::Common(Command::List(ListArgs { sort: Some(ref s), .. })) if s == "priority"
    ));

    let cli =
      Cli::try_parse_from(["navette", "notifications", "-d", "n.json", "read-all"]).unwrap();
    assert!(matches!(cli.entity, EntityCommand::Notifications {
      command: NotificationCommand::ReadAll,
      ..
    }));
  }

  #[test]
  fn data_file_is_required() {
    assert!(Cli::try_parse_from(["navette", "trips", "list"]).is_err());
  }

  #[tokio::test]
  async fn dry_run_leaves_the_data_file_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("documents.json");
    std::fs::write(
      &path,
      r#"[{"id":"doc-1","name":"Contrat","category":"Actif","kind":"contract",
           "sizeBytes":10,"createdAt":"2024-06-01T12:00:00Z","updatedAt":"2024-06-01T12:00:00Z"}]"#,
    )
    .unwrap();
    let before = std::fs::read(&path).unwrap();

    let config = StoreConfig { latency_ms: 0, timeout_ms: None };
    let source = Source { data: path.clone() };
    let store = open::<Document>(&source, true, &config).await.unwrap();
    assert_eq!(store.records().len(), 1);
    run(&store, Command::Delete { id: "doc-1".into() }).await.unwrap();
    assert!(store.records().is_empty());

    assert_eq!(std::fs::read(&path).unwrap(), before);
  }

  #[tokio::test]
  async fn show_fails_for_unknown_id() {
    let dir = tempfile::tempdir().unwrap();
    let source = Source { data: dir.path().join("trips.json") };
    let config = StoreConfig::default();
    let store = open::<Trip>(&source, false, &config).await.unwrap();
    let err = run(&store, Command::Show { id: "trp-9".into() }).await.unwrap_err();
    assert_eq!(err.to_string(), "trip not found: trp-9");
  }
}
