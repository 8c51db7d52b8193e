use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRecord {
    pub id: String,
    pub owner_id: String,
    pub project_id: Option<String>,
    pub name: String,
    pub kind: String,
    pub status: String,
    pub summary: Option<String>,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub metadata: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowTaskRecord {
    pub id: String,
    pub workflow_id: String,
    pub title: String,
    pub description: Option<String>,
    pub worker: String,
    pub status: String,
    pub position: i64,
    pub depends_on: Option<String>,
    pub due_date: Option<String>,
    pub metadata: serde_json::Value,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewWorkflow<'a> {
    pub owner_id: &'a str,
    pub project_id: Option<&'a str>,
    pub name: &'a str,
    pub kind: &'a str,
    pub summary: Option<&'a str>,
    pub total_tasks: i64,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct NewWorkflowTask {
    pub title: String,
    pub description: Option<String>,
    pub worker: String,
    pub position: i64,
    pub depends_on: Option<String>,
    pub due_date: Option<String>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoJobRecord {
    pub id: String,
    pub owner_id: String,
    pub client_request_id: Option<String>,
    pub source_image_url: String,
    pub provider: String,
    pub provider_job_id: Option<String>,
    pub status: String,
    pub output_location: Option<String>,
    pub error_message: Option<String>,
    pub options: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewVideoJob<'a> {
    pub owner_id: &'a str,
    pub client_request_id: Option<&'a str>,
    pub source_image_url: &'a str,
    pub provider: &'a str,
    pub options: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoClipRecord {
    pub id: String,
    pub shot_list_id: String,
    pub project_id: String,
    pub clip_number: i64,
    pub status: String,
    pub provider: String,
    pub video_url: Option<String>,
    pub duration_sec: Option<f64>,
    pub error_message: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewVideoClip<'a> {
    pub shot_list_id: &'a str,
    pub project_id: &'a str,
    pub clip_number: i64,
    pub provider: &'a str,
    pub metadata: serde_json::Value,
}
