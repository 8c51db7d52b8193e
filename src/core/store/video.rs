use anyhow::Result;
use rusqlite::{Row, params};

use super::ProjectStore;
use super::types::{NewVideoClip, NewVideoJob, VideoClipRecord, VideoJobRecord};

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<VideoJobRecord> {
    let options: String = row.get(9)?;
    Ok(VideoJobRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        client_request_id: row.get(2)?,
        source_image_url: row.get(3)?,
        provider: row.get(4)?,
        provider_job_id: row.get(5)?,
        status: row.get(6)?,
        output_location: row.get(7)?,
        error_message: row.get(8)?,
        options: serde_json::from_str(&options).unwrap_or(serde_json::Value::Null),
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn clip_from_row(row: &Row<'_>) -> rusqlite::Result<VideoClipRecord> {
    let metadata: String = row.get(9)?;
    Ok(VideoClipRecord {
        id: row.get(0)?,
        shot_list_id: row.get(1)?,
        project_id: row.get(2)?,
        clip_number: row.get(3)?,
        status: row.get(4)?,
        provider: row.get(5)?,
        video_url: row.get(6)?,
        duration_sec: row.get(7)?,
        error_message: row.get(8)?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const JOB_COLUMNS: &str = "id, owner_id, client_request_id, source_image_url, provider, \
     provider_job_id, status, output_location, error_message, options, created_at, updated_at";

const CLIP_COLUMNS: &str = "id, shot_list_id, project_id, clip_number, status, provider, \
     video_url, duration_sec, error_message, metadata, created_at, updated_at";

impl ProjectStore {
    pub async fn create_video_job(&self, new: &NewVideoJob<'_>) -> Result<VideoJobRecord> {
        let id = uuid::Uuid::new_v4().to_string();
        let db = self.db().lock().await;
        db.execute(
            "INSERT INTO video_jobs (id, owner_id, client_request_id, source_image_url, provider, status, options)
             VALUES (?1, ?2, ?3, ?4, ?5, 'queued', ?6)",
            params![
                id,
                new.owner_id,
                new.client_request_id,
                new.source_image_url,
                new.provider,
                new.options.to_string(),
            ],
        )?;
        let rec = db.query_row(
            &format!("SELECT {JOB_COLUMNS} FROM video_jobs WHERE id = ?1"),
            params![id],
            job_from_row,
        )?;
        Ok(rec)
    }

    /// Fetch a job scoped to its owner, so one tenant can never poll
    /// another's job into completion.
    pub async fn get_video_job(&self, id: &str, owner_id: &str) -> Result<Option<VideoJobRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM video_jobs WHERE id = ?1 AND owner_id = ?2 LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![id, owner_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(job_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// Idempotent-create lookup: the job previously created for this
    /// caller-supplied request id, if any.
    pub async fn get_video_job_by_client_request(
        &self,
        owner_id: &str,
        client_request_id: &str,
    ) -> Result<Option<VideoJobRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {JOB_COLUMNS} FROM video_jobs
             WHERE owner_id = ?1 AND client_request_id = ?2 LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![owner_id, client_request_id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(job_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn mark_job_running(
        &self,
        id: &str,
        provider: &str,
        provider_job_id: &str,
    ) -> Result<bool> {
        let db = self.db().lock().await;
        let rows = db.execute(
            "UPDATE video_jobs
             SET provider = ?1, provider_job_id = ?2, status = 'running', updated_at = CURRENT_TIMESTAMP
             WHERE id = ?3 AND status = 'queued'",
            params![provider, provider_job_id, id],
        )?;
        Ok(rows > 0)
    }

    pub async fn mark_job_failed(&self, id: &str, error: &str) -> Result<bool> {
        let db = self.db().lock().await;
        let rows = db.execute(
            "UPDATE video_jobs
             SET status = 'failed', error_message = ?1, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?2 AND status IN ('queued', 'running')",
            params![error, id],
        )?;
        Ok(rows > 0)
    }

    /// Terminal success. `output_location` is write-once: the COALESCE keeps
    /// the first stored pointer even if this is ever re-run.
    pub async fn mark_job_succeeded(&self, id: &str, output_location: &str) -> Result<bool> {
        let db = self.db().lock().await;
        let rows = db.execute(
            "UPDATE video_jobs
             SET status = 'succeeded',
                 output_location = COALESCE(output_location, ?1),
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = ?2 AND status = 'running'",
            params![output_location, id],
        )?;
        Ok(rows > 0)
    }

    pub async fn quota_used_today(&self, owner_id: &str) -> Result<i64> {
        let db = self.db().lock().await;
        let mut stmt =
            db.prepare("SELECT used FROM video_quota WHERE owner_id = ?1 AND day = date('now')")?;
        let mut rows = stmt.query(params![owner_id])?;
        let used = if let Some(row) = rows.next()? {
            row.get(0)?
        } else {
            0
        };
        Ok(used)
    }

    /// Atomic daily-usage increment via UPSERT, safe under concurrent create
    /// calls for the same owner.
    pub async fn increment_quota(&self, owner_id: &str) -> Result<()> {
        let db = self.db().lock().await;
        db.execute(
            "INSERT INTO video_quota (owner_id, day, used) VALUES (?1, date('now'), 1)
             ON CONFLICT(owner_id, day) DO UPDATE SET used = used + 1",
            params![owner_id],
        )?;
        Ok(())
    }

    pub async fn create_video_clips(
        &self,
        clips: &[NewVideoClip<'_>],
    ) -> Result<Vec<VideoClipRecord>> {
        let mut ids = Vec::with_capacity(clips.len());
        {
            let mut db = self.db().lock().await;
            let tx = db.transaction()?;
            for clip in clips {
                let id = uuid::Uuid::new_v4().to_string();
                tx.execute(
                    "INSERT INTO video_clips (id, shot_list_id, project_id, clip_number, status, provider, metadata)
                     VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6)",
                    params![
                        id,
                        clip.shot_list_id,
                        clip.project_id,
                        clip.clip_number,
                        clip.provider,
                        clip.metadata.to_string(),
                    ],
                )?;
                ids.push(id);
            }
            tx.commit()?;
        }

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(clip) = self.get_clip(&id).await? {
                out.push(clip);
            }
        }
        Ok(out)
    }

    pub async fn get_clip(&self, id: &str) -> Result<Option<VideoClipRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {CLIP_COLUMNS} FROM video_clips WHERE id = ?1 LIMIT 1"
        ))?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(clip_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list_clips_by_shot_list(
        &self,
        shot_list_id: &str,
    ) -> Result<Vec<VideoClipRecord>> {
        let db = self.db().lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {CLIP_COLUMNS} FROM video_clips
             WHERE shot_list_id = ?1 ORDER BY clip_number ASC"
        ))?;
        let rows = stmt.query_map(params![shot_list_id], clip_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub async fn mark_clip_generating(&self, id: &str) -> Result<bool> {
        let db = self.db().lock().await;
        let rows = db.execute(
            "UPDATE video_clips
             SET status = 'generating', error_message = NULL, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?1 AND status IN ('pending', 'failed')",
            params![id],
        )?;
        Ok(rows > 0)
    }

    pub async fn complete_clip(
        &self,
        id: &str,
        video_url: &str,
        duration_sec: Option<f64>,
    ) -> Result<bool> {
        let db = self.db().lock().await;
        let rows = db.execute(
            "UPDATE video_clips
             SET status = 'completed', video_url = ?1, duration_sec = ?2, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?3",
            params![video_url, duration_sec, id],
        )?;
        Ok(rows > 0)
    }

    pub async fn fail_clip(&self, id: &str, error: &str) -> Result<bool> {
        let db = self.db().lock().await;
        let rows = db.execute(
            "UPDATE video_clips
             SET status = 'failed', error_message = ?1, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?2",
            params![error, id],
        )?;
        Ok(rows > 0)
    }
}
