use anyhow::Result;
use rusqlite::{Row, params};

use super::ProjectStore;
use super::types::{NewWorkflow, NewWorkflowTask, WorkflowRecord, WorkflowTaskRecord};

fn workflow_from_row(row: &Row<'_>) -> rusqlite::Result<WorkflowRecord> {
    let metadata: String = row.get(9)?;
    Ok(WorkflowRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        project_id: row.get(2)?,
        name: row.get(3)?,
        kind: row.get(4)?,
        status: row.get(5)?,
        summary: row.get(6)?,
        total_tasks: row.get(7)?,
        completed_tasks: row.get(8)?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<WorkflowTaskRecord> {
    let metadata: String = row.get(9)?;
    Ok(WorkflowTaskRecord {
        id: row.get(0)?,
        workflow_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        worker: row.get(4)?,
        status: row.get(5)?,
        position: row.get(6)?,
        depends_on: row.get(7)?,
        due_date: row.get(8)?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        started_at: row.get(10)?,
        completed_at: row.get(11)?,
        error_message: row.get(12)?,
        created_at: row.get(13)?,
    })
}

const WORKFLOW_COLUMNS: &str = "id, owner_id, project_id, name, kind, status, summary, \
     total_tasks, completed_tasks, metadata, created_at, updated_at";

const TASK_COLUMNS: &str = "id, workflow_id, title, description, worker, status, position, \
     depends_on, due_date, metadata, started_at, completed_at, error_message, created_at";

impl ProjectStore {
    pub async fn create_workflow(&self, new: &NewWorkflow<'_>) -> Result<WorkflowRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let db = self.db().lock().await;
        db.execute(
            "INSERT INTO workflows (id, owner_id, project_id, name, kind, status, summary, total_tasks, completed_tasks, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6, ?7, 0, ?8)",
            params![
                id,
                new.owner_id,
                new.project_id,
                new.name,
                new.kind,
                new.summary,
                new.total_tasks,
                new.metadata.to_string(),
            ],
        )?;
        let rec = db.query_row(
            &format!("SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = ?1"),
            params![id],
            workflow_from_row,
        )?;
        Ok(rec)
    }

    pub async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM workflows WHERE id = ?1 LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(workflow_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_workflows_by_owner(
        &self,
        owner_id: &str,
        project_id: Option<&str>,
    ) -> Result<Vec<WorkflowRecord>> {
        let db = self.db().lock().await;
        let mut out = Vec::new();
        match project_id {
            Some(project) => {
                let mut stmt = db.prepare(&format!(
                    "SELECT {WORKFLOW_COLUMNS} FROM workflows
                     WHERE owner_id = ?1 AND project_id = ?2 ORDER BY created_at DESC"
                ))?;
                let rows = stmt.query_map(params![owner_id, project], workflow_from_row)?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let mut stmt = db.prepare(&format!(
                    "SELECT {WORKFLOW_COLUMNS} FROM workflows
                     WHERE owner_id = ?1 ORDER BY created_at DESC"
                ))?;
                let rows = stmt.query_map(params![owner_id], workflow_from_row)?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }

    /// Delete a workflow row. Only used to compensate a failed task insert
    /// during translation so a workflow with zero tasks is never observable.
    pub async fn delete_workflow(&self, id: &str) -> Result<bool> {
        let db = self.db().lock().await;
        let rows = db.execute("DELETE FROM workflows WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub async fn update_workflow_status(&self, id: &str, status: &str) -> Result<bool> {
        let db = self.db().lock().await;
        let rows = db.execute(
            "UPDATE workflows SET status = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![status, id],
        )?;
        Ok(rows > 0)
    }

    /// Increment the completion counter and return (completed, total) so the
    /// caller can decide whether to flip the workflow terminal.
    pub async fn increment_completed_tasks(&self, id: &str) -> Result<(i64, i64)> {
        let db = self.db().lock().await;
        db.execute(
            "UPDATE workflows SET completed_tasks = completed_tasks + 1, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1 AND completed_tasks < total_tasks",
            params![id],
        )?;
        let counts = db.query_row(
            "SELECT completed_tasks, total_tasks FROM workflows WHERE id = ?1",
            params![id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;
        Ok(counts)
    }

    /// Insert all tasks of a workflow in one transaction: either the whole
    /// batch lands or none of it does.
    pub async fn create_tasks(
        &self,
        workflow_id: &str,
        tasks: &[NewWorkflowTask],
    ) -> Result<Vec<WorkflowTaskRecord>> {
        let mut ids = Vec::with_capacity(tasks.len());
        {
            let mut db = self.db().lock().await;
            let tx = db.transaction()?;
            for task in tasks {
                let id = uuid::Uuid::new_v4().to_string();
                tx.execute(
                    "INSERT INTO workflow_tasks (id, workflow_id, title, description, worker, status, position, depends_on, due_date, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?9)",
                    params![
                        id,
                        workflow_id,
                        task.title,
                        task.description,
                        task.worker,
                        task.position,
                        task.depends_on,
                        task.due_date,
                        task.metadata.to_string(),
                    ],
                )?;
                ids.push(id);
            }
            tx.commit()?;
        }

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(task) = self.get_task(&id).await? {
                out.push(task);
            }
        }
        Ok(out)
    }

    pub async fn get_task(&self, id: &str) -> Result<Option<WorkflowTaskRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM workflow_tasks WHERE id = ?1 LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(task_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_tasks(&self, workflow_id: &str) -> Result<Vec<WorkflowTaskRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM workflow_tasks WHERE workflow_id = ?1 ORDER BY position ASC"
        ))?;
        let rows = stmt.query_map(params![workflow_id], task_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Pending tasks for one worker across all active workflows, ordered by
    /// position with due date as tie-break (then insert order).
    pub async fn list_pending_tasks_for_worker(
        &self,
        worker: &str,
        limit: usize,
    ) -> Result<Vec<WorkflowTaskRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(
            "SELECT t.id, t.workflow_id, t.title, t.description, t.worker, t.status, t.position,
                    t.depends_on, t.due_date, t.metadata, t.started_at, t.completed_at,
                    t.error_message, t.created_at
             FROM workflow_tasks t
             JOIN workflows w ON w.id = t.workflow_id
             WHERE w.status = 'active' AND t.status = 'pending' AND t.worker = ?1
             ORDER BY t.position ASC, t.due_date ASC NULLS LAST, t.rowid ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![worker, limit as i64], task_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Atomically claim a task: the conditional `status = 'pending'` guard is
    /// what prevents two pollers from double-claiming. Returns false when the
    /// task was not claimable.
    pub async fn claim_task(&self, id: &str) -> Result<bool> {
        let db = self.db().lock().await;
        let rows = db.execute(
            "UPDATE workflow_tasks
             SET status = 'in_progress', started_at = CURRENT_TIMESTAMP
             WHERE id = ?1 AND status = 'pending'",
            params![id],
        )?;
        Ok(rows > 0)
    }

    /// Mark a claimed task completed and merge the worker's result payload
    /// into its metadata under `results`.
    pub async fn complete_task(&self, id: &str, results: &serde_json::Value) -> Result<bool> {
        let db = self.db().lock().await;
        let metadata: Option<String> = db
            .query_row(
                "SELECT metadata FROM workflow_tasks WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .ok();
        let mut merged = metadata
            .and_then(|m| serde_json::from_str::<serde_json::Value>(&m).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        if let Some(map) = merged.as_object_mut() {
            map.insert("results".to_string(), results.clone());
        }

        let rows = db.execute(
            "UPDATE workflow_tasks
             SET status = 'completed', completed_at = CURRENT_TIMESTAMP, metadata = ?1
             WHERE id = ?2 AND status = 'in_progress'",
            params![merged.to_string(), id],
        )?;
        Ok(rows > 0)
    }

    pub async fn fail_task(&self, id: &str, error: &str) -> Result<bool> {
        let db = self.db().lock().await;
        let rows = db.execute(
            "UPDATE workflow_tasks
             SET status = 'failed', completed_at = CURRENT_TIMESTAMP, error_message = ?1
             WHERE id = ?2 AND status = 'in_progress'",
            params![error, id],
        )?;
        Ok(rows > 0)
    }
}
