//! SQLite-backed Task Store.
//!
//! # Invariants
//! - Write paths call `Task::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Listing order is insertion order.

use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::time::Instant;

use crate::db::migrations::latest_version;
use crate::model::patch::TaskPatch;
use crate::model::task::{
    format_due_date, parse_due_date, RelationSummary, Task, TaskId, TaskPriority, TaskRelations,
    TaskStatus,
};
use crate::store::{StoreError, StoreResult, TaskStore};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    status,
    due_date,
    priority,
    opportunity_id,
    opportunity_name,
    contact_id,
    contact_name,
    assignee_id,
    assignee_name
FROM tasks";

/// Task store over a migrated SQLite connection.
pub struct SqliteTaskStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskStore<'conn> {
    /// Creates the store after checking the connection is migrated.
    ///
    /// # Errors
    /// - `InvalidData` when schema version or `tasks` table do not match.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TaskStore for SqliteTaskStore<'_> {
    fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} ORDER BY rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn get_task(&self, id: &TaskId) -> StoreResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_task_row(row)?)),
            None => Ok(None),
        }
    }

    fn create_task(&self, task: &Task) -> StoreResult<TaskId> {
        task.validate()?;
        let relations = &task.relations;

        self.conn.execute(
            "INSERT INTO tasks (
                id,
                title,
                status,
                due_date,
                priority,
                opportunity_id,
                opportunity_name,
                contact_id,
                contact_name,
                assignee_id,
                assignee_name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                task.id.as_str(),
                task.title.as_str(),
                task.status.as_str(),
                task.due_date.map(format_due_date),
                task.priority.as_str(),
                relation_id(relations.opportunity.as_ref()),
                relation_name(relations.opportunity.as_ref()),
                relation_id(relations.contact.as_ref()),
                relation_name(relations.contact.as_ref()),
                relation_id(relations.assignee.as_ref()),
                relation_name(relations.assignee.as_ref()),
            ],
        )?;

        Ok(task.id.clone())
    }

    fn patch_task(&self, id: &TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        let started_at = Instant::now();
        if patch.is_empty() {
            return Err(StoreError::Rejected(format!("empty patch for task {id}")));
        }

        let changed = self.conn.execute(
            "UPDATE tasks
             SET
                status = COALESCE(?2, status),
                due_date = COALESCE(?3, due_date),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.as_str(),
                patch.status.map(TaskStatus::as_str),
                patch.due_date.map(format_due_date),
            ],
        );
        let changed = match changed {
            Ok(changed) => changed,
            Err(err) => {
                error!(
                    "event=task_patch module=store status=error task_id={} duration_ms={} error={}",
                    id,
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        if changed == 0 {
            return Err(StoreError::NotFound(id.clone()));
        }

        let canonical = self
            .get_task(id)?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        info!(
            "event=task_patch module=store status=ok task_id={} duration_ms={}",
            id,
            started_at.elapsed().as_millis()
        );
        Ok(canonical)
    }
}

fn parse_task_row(row: &Row<'_>) -> StoreResult<Task> {
    let id: String = row.get("id")?;

    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid status `{status_text}` in tasks.status"))
    })?;

    let priority_text: String = row.get("priority")?;
    let priority = TaskPriority::parse(&priority_text).ok_or_else(|| {
        StoreError::InvalidData(format!(
            "invalid priority `{priority_text}` in tasks.priority"
        ))
    })?;

    let due_date = match row.get::<_, Option<String>>("due_date")? {
        Some(value) => Some(parse_due_date(&value).ok_or_else(|| {
            StoreError::InvalidData(format!("invalid date `{value}` in tasks.due_date"))
        })?),
        None => None,
    };

    let task = Task {
        id: TaskId::from(id),
        title: row.get("title")?,
        status,
        due_date,
        priority,
        relations: TaskRelations {
            opportunity: parse_relation(row, "opportunity_id", "opportunity_name")?,
            contact: parse_relation(row, "contact_id", "contact_name")?,
            assignee: parse_relation(row, "assignee_id", "assignee_name")?,
        },
        defects: Vec::new(),
    };
    task.validate()?;
    Ok(task)
}

fn parse_relation(
    row: &Row<'_>,
    id_column: &str,
    name_column: &str,
) -> StoreResult<Option<RelationSummary>> {
    let id: Option<String> = row.get(id_column)?;
    let name: Option<String> = row.get(name_column)?;
    if id.is_none() && name.is_none() {
        return Ok(None);
    }
    Ok(Some(RelationSummary {
        id,
        name: name.unwrap_or_default(),
    }))
}

fn relation_id(relation: Option<&RelationSummary>) -> Option<&str> {
    relation.and_then(|value| value.id.as_deref())
}

fn relation_name(relation: Option<&RelationSummary>) -> Option<&str> {
    relation.map(|value| value.name.as_str())
}

fn ensure_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::InvalidData(format!(
            "connection schema version {actual_version} does not match expected {expected_version}"
        )));
    }

    let table: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'tasks';",
            [],
            |row| row.get(0),
        )
        .optional()?;
    if table.is_none() {
        return Err(StoreError::InvalidData(
            "required table `tasks` is missing".to_string(),
        ));
    }

    Ok(())
}
