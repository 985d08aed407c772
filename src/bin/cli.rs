use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use working_days::access::{Actor, ExecutionContext, ProjectMembership};
use working_days::calendar::{DateOverride, WeekdaySet};
use working_days::persistence::{
    ProjectSnapshot, SqliteStore, load_entities_from_csv, load_relations_from_csv,
    load_snapshot_from_json, save_snapshot_to_json,
};
use working_days::{
    Engine, EngineConfig, NoteFormat, ScheduleStore, ScheduledEntity, WorkCalendar,
};

#[derive(Parser)]
#[command(name = "cli", about = "Reschedule work items when working days change")]
struct Cli {
    /// SQLite database holding the project.
    #[arg(long, global = true, default_value = "working_days.db")]
    db: PathBuf,
    /// Engine settings in TOML.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replace the project with a JSON snapshot or a pair of CSV files.
    Import(ImportArgs),
    /// Write the project to a JSON snapshot.
    Export { path: PathBuf },
    /// Print entities in schedule order.
    Show,
    /// Print the working calendar.
    Calendar,
    /// Save a new working calendar and reschedule affected entities.
    SetCalendar(SetCalendarArgs),
    /// Render journal notes for a viewer.
    Journal(JournalArgs),
}

#[derive(Args)]
struct ImportArgs {
    #[arg(long, conflicts_with_all = ["entities", "relations"])]
    json: Option<PathBuf>,
    #[arg(long, requires = "relations")]
    entities: Option<PathBuf>,
    #[arg(long, requires = "entities")]
    relations: Option<PathBuf>,
}

#[derive(Args)]
struct SetCalendarArgs {
    /// Working weekdays, e.g. `mon,tue,thu,fri`.
    #[arg(long)]
    weekdays: WeekdaySet,
    /// Dates that are non-working regardless of weekday.
    #[arg(long = "non-working", value_delimiter = ',')]
    non_working: Vec<NaiveDate>,
    /// Dates that are working regardless of weekday.
    #[arg(long = "working", value_delimiter = ',')]
    working: Vec<NaiveDate>,
    /// Login recorded as the actor the change runs on behalf of.
    #[arg(long, default_value = "admin")]
    actor: String,
}

#[derive(Args)]
struct JournalArgs {
    #[arg(long, default_value_t = 1)]
    viewer_id: u32,
    #[arg(long, default_value = "admin")]
    viewer_login: String,
    /// Render as an administrator who sees every entity.
    #[arg(long)]
    admin: bool,
    /// Projects the viewer is a member of.
    #[arg(long = "project", value_delimiter = ',')]
    projects: Vec<String>,
    #[arg(long)]
    locale: Option<String>,
    #[arg(long)]
    html: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut store = SqliteStore::new(&cli.db)?;

    match cli.command {
        Command::Import(args) => {
            let snapshot = match (args.json, args.entities, args.relations) {
                (Some(json), _, _) => load_snapshot_from_json(json)?,
                (None, Some(entities), Some(relations)) => ProjectSnapshot {
                    calendar: None,
                    entities: load_entities_from_csv(entities)?,
                    relations: load_relations_from_csv(relations)?,
                },
                _ => return Err("import needs --json or --entities with --relations".into()),
            };
            store.replace_project(&snapshot)?;
            println!(
                "Imported {} entities and {} relations",
                snapshot.entities.len(),
                snapshot.relations.len()
            );
        }
        Command::Export { path } => {
            let snapshot = ProjectSnapshot {
                calendar: store.load_calendar()?,
                entities: store.load_entities()?,
                relations: store.load_relations()?,
            };
            save_snapshot_to_json(&snapshot, &path)?;
            println!("Exported {} entities to {}", snapshot.entities.len(), path.display());
        }
        Command::Show => {
            print!("{}", render_entities_as_text_table(&store.load_entities()?));
        }
        Command::Calendar => {
            let engine = Engine::new(store, config);
            let calendar = engine.current_calendar()?;
            println!("Working weekdays: {}", calendar.weekdays());
            for (date, working) in calendar.overrides() {
                let status = if *working { "working" } else { "non-working" };
                println!("{date}: {status}");
            }
        }
        Command::SetCalendar(args) => {
            let overrides = args
                .non_working
                .iter()
                .map(|&date| DateOverride {
                    date,
                    working: false,
                })
                .chain(args.working.iter().map(|&date| DateOverride {
                    date,
                    working: true,
                }));
            let next = WorkCalendar::custom(args.weekdays.iter(), overrides)?;
            let mut engine = Engine::new(store, config);
            let ctx = ExecutionContext::system(Actor::admin(0, args.actor));
            let report = engine.apply_calendar(&ctx, &next)?;
            println!(
                "Changed: {}, skipped: {}",
                report.changed_count(),
                report.skipped_count()
            );
            for err in &report.skipped {
                println!("  skipped: {err}");
            }
        }
        Command::Journal(args) => {
            let locale = args.locale.unwrap_or_else(|| config.locale.clone());
            let format = if args.html {
                NoteFormat::Html
            } else {
                config.note_format
            };
            let viewer = if args.admin {
                Actor::admin(args.viewer_id, args.viewer_login)
            } else {
                Actor::new(args.viewer_id, args.viewer_login)
            };
            let access = args
                .projects
                .into_iter()
                .fold(ProjectMembership::new(), |access, project| {
                    access.with_member(viewer.id, project)
                });
            let engine = Engine::new(store, config).with_access(access);
            for note in engine.render_journal(&viewer, &locale, format)? {
                println!(
                    "#{} [{}] {}",
                    note.entity_id,
                    note.recorded_at.format("%Y-%m-%d %H:%M"),
                    note.note
                );
            }
        }
    }
    Ok(())
}

fn render_entities_as_text_table(entities: &[ScheduledEntity]) -> String {
    let header = ["id", "subject", "project", "start", "due", "duration", "ignore_nwd"];
    let rows: Vec<[String; 7]> = entities
        .iter()
        .map(|entity| {
            [
                entity.id.to_string(),
                entity.subject.clone(),
                entity.project.clone().unwrap_or_default(),
                entity.start_date.map(|d| d.to_string()).unwrap_or_default(),
                entity.due_date.map(|d| d.to_string()).unwrap_or_default(),
                entity.duration.map(|d| d.to_string()).unwrap_or_default(),
                entity.ignore_non_working_days.to_string(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|name| name.len()).collect();
    for row in &rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&format_row(header.iter().copied(), &widths));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &rows {
        out.push_str(&format_row(row.iter().map(String::as_str), &widths));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.zip(widths) {
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(width.saturating_sub(cell.len())));
        line.push_str(" |");
    }
    line
}
