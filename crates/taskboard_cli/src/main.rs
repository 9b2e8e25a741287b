//! `taskboard` command line host.
//!
//! # Responsibility
//! - Drive the board against the local SQLite task store.
//! - Keep output deterministic so it can be diffed in scripts.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskboard_core::db::open_db;
use taskboard_core::{
    BoardConfig, BoardService, BucketKey, DropOutcome, DropTarget, PatchSettled, SqliteTaskStore,
    Task, TaskId, TaskPriority, TaskStatus,
};

#[derive(Parser, Debug)]
#[command(name = "taskboard", version, about = "CRM task board")]
struct Cli {
    /// SQLite file; overrides TASKBOARD_DB_PATH.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Reference date (yyyy-mm-dd); defaults to the local calendar date.
    #[arg(long, global = true, value_parser = parse_date)]
    today: Option<NaiveDate>,

    /// Absolute directory for rolling log files; logging stays off when unset.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Checks core linkage.
    Ping,
    /// Prints every bucket.
    Show {
        /// Emit the board snapshot as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Creates a task.
    Add {
        title: String,
        #[arg(long, value_parser = parse_date)]
        due: Option<NaiveDate>,
        #[arg(long, default_value = "medium", value_parser = parse_priority)]
        priority: TaskPriority,
        #[arg(long)]
        completed: bool,
    },
    /// Drags a task into a bucket (`none` drops it outside the board).
    Move {
        id: String,
        bucket: String,
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = BoardConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }
    if let Some(log_dir) = cli.log_dir.as_deref() {
        taskboard_core::init_logging(&config.log_level, log_dir)?;
    }

    if let Command::Ping = cli.command {
        println!("taskboard_core ping={}", taskboard_core::ping());
        println!("taskboard_core version={}", taskboard_core::core_version());
        return Ok(());
    }

    let today = cli.today.unwrap_or_else(|| Local::now().date_naive());
    let conn = open_db(&config.db_path)
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let store = SqliteTaskStore::try_new(&conn)?;
    let mut service = BoardService::load(store, today, config.sync)?;

    match cli.command {
        Command::Ping => {}
        Command::Show { json } => {
            let snapshot = service.synchronizer().snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_board(&service);
            }
        }
        Command::Add {
            title,
            due,
            priority,
            completed,
        } => {
            let mut task = Task::new(TaskId::generate(), title).with_priority(priority);
            if let Some(due) = due {
                task = task.with_due_date(due);
            }
            if completed {
                task = task.with_status(TaskStatus::Completed);
            }
            let id = service.add_task(&task)?;
            let bucket = service
                .synchronizer()
                .board()
                .locate(&id)
                .map(|(bucket, _)| bucket.label())
                .unwrap_or("?");
            println!("added {id} -> {bucket}");
        }
        Command::Move { id, bucket, index } => {
            let target = if bucket.eq_ignore_ascii_case("none") {
                None
            } else {
                let key = BucketKey::parse(&bucket)
                    .ok_or_else(|| anyhow!("unknown bucket `{bucket}`"))?;
                Some(DropTarget::new(key, index))
            };
            let report = service.move_task(&TaskId::from(id.as_str()), target)?;
            match report.outcome {
                DropOutcome::Cancelled => println!("cancelled"),
                DropOutcome::Rejected { reason } => bail!("rejected: {reason}"),
                DropOutcome::Reordered { bucket, from, to } => {
                    println!("reordered {bucket} {from} -> {to}")
                }
                DropOutcome::Moved { from, to, .. } => println!("moved {from} -> {to}"),
            }
            if let Some(settled) = report.settled {
                match settled {
                    PatchSettled::Confirmed { .. } => println!("saved"),
                    PatchSettled::Superseded { .. } => println!("superseded"),
                    PatchSettled::Failed {
                        error, rolled_back, ..
                    } => bail!("save failed (rolled_back={rolled_back}): {error}"),
                }
            }
        }
    }
    Ok(())
}

fn print_board(service: &BoardService<SqliteTaskStore<'_>>) {
    let sync = service.synchronizer();
    println!("today={}", sync.today());
    for view in sync.board().views() {
        println!("== {} ({})", view.label, view.count);
        for task in &view.tasks {
            let due = task
                .due_date
                .map(|date| date.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {} [{}] due={} {}",
                task.id,
                task.priority.as_str(),
                due,
                task.title
            );
        }
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| err.to_string())
}

fn parse_priority(raw: &str) -> Result<TaskPriority, String> {
    TaskPriority::parse(raw).ok_or_else(|| format!("unknown priority `{raw}`"))
}
