//! Durable records for the orchestration engine: workflows, their tasks,
//! video jobs, batch clips, and the per-owner render quota.
//!
//! Pure data access; no business logic lives here. The store is
//! constructor-injected everywhere (never a global), so engine components
//! stay testable against a throwaway database. All writes are scoped to a
//! single row by id; the one contended write, the task claim, is a
//! conditional update (see [`ProjectStore::claim_task`]).

pub mod types;
mod video;
mod workflows;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use rusqlite::Connection;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

pub use types::{
    NewVideoClip, NewVideoJob, NewWorkflow, NewWorkflowTask, VideoClipRecord, VideoJobRecord,
    WorkflowRecord, WorkflowTaskRecord,
};

pub struct ProjectStore {
    db: Arc<Mutex<Connection>>,
}

impl ProjectStore {
    /// Open (or create) the engine database inside `data_dir`.
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).await?;
        }

        let db_path = data_dir.join("backlot.db");
        let db = Connection::open(&db_path)?;
        init_schema(&db)?;

        info!("Project store opened at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    pub(crate) fn db(&self) -> &Arc<Mutex<Connection>> {
        &self.db
    }
}

fn init_schema(db: &Connection) -> Result<()> {
    db.execute(
        "CREATE TABLE IF NOT EXISTS workflows (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            project_id TEXT,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            status TEXT NOT NULL,
            summary TEXT,
            total_tasks INTEGER NOT NULL DEFAULT 0,
            completed_tasks INTEGER NOT NULL DEFAULT 0,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS workflow_tasks (
            id TEXT PRIMARY KEY,
            workflow_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            worker TEXT NOT NULL,
            status TEXT NOT NULL,
            position INTEGER NOT NULL,
            depends_on TEXT,
            due_date TEXT,
            metadata TEXT NOT NULL DEFAULT '{}',
            started_at DATETIME,
            completed_at DATETIME,
            error_message TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS video_jobs (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            client_request_id TEXT,
            source_image_url TEXT NOT NULL,
            provider TEXT NOT NULL,
            provider_job_id TEXT,
            status TEXT NOT NULL,
            output_location TEXT,
            error_message TEXT,
            options TEXT NOT NULL DEFAULT '{}',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS video_clips (
            id TEXT PRIMARY KEY,
            shot_list_id TEXT NOT NULL,
            project_id TEXT NOT NULL,
            clip_number INTEGER NOT NULL,
            status TEXT NOT NULL,
            provider TEXT NOT NULL,
            video_url TEXT,
            duration_sec REAL,
            error_message TEXT,
            metadata TEXT NOT NULL DEFAULT '{}',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    db.execute(
        "CREATE TABLE IF NOT EXISTS video_quota (
            owner_id TEXT NOT NULL,
            day TEXT NOT NULL,
            used INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (owner_id, day)
        )",
        [],
    )?;

    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_workflows_status_owner ON workflows(status, owner_id)",
        [],
    )?;
    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_workflow_tasks_workflow ON workflow_tasks(workflow_id)",
        [],
    )?;
    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_workflow_tasks_worker_status ON workflow_tasks(worker, status)",
        [],
    )?;
    db.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_video_jobs_client_request
         ON video_jobs(owner_id, client_request_id)
         WHERE client_request_id IS NOT NULL",
        [],
    )?;
    db.execute(
        "CREATE INDEX IF NOT EXISTS idx_video_clips_shot_list ON video_clips(shot_list_id)",
        [],
    )?;

    Ok(())
}
