// ABOUTME: HTTP client for the Hill control plane
// ABOUTME: Used by the daemon for claim/fetch/report and by the CLI operator commands

use hill_core::{Job, JobStatus, NewJob};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Control plane unreachable: {0}")]
    Transport(String),
    #[error("Control plane returned {status} {code}: {message}")]
    ControlPlane {
        status: u16,
        code: String,
        message: String,
    },
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, ClientError::ControlPlane { code, .. } if code == "INVALID_TRANSITION")
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::ControlPlane { status: 404, .. })
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Client for one control plane; the base URL is fixed at construction
#[derive(Clone, Debug)]
pub struct ControlPlaneClient {
    http_client: Client,
    base_url: String,
}

impl ControlPlaneClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Claim the next job for `robot_id`, `None` when the queue is idle
    pub async fn claim(&self, robot_id: &str) -> ClientResult<Option<Job>> {
        let response = self
            .http_client
            .post(self.url(&format!("/pop/{robot_id}")))
            .send()
            .await?;
        envelope_data(response).await
    }

    pub async fn get_job(&self, id: &str) -> ClientResult<Job> {
        let response = self
            .http_client
            .get(self.url(&format!("/job/{id}")))
            .send()
            .await?;
        required(envelope_data(response).await?)
    }

    pub async fn list_queue(&self, robot_id: Option<&str>) -> ClientResult<Vec<Job>> {
        let path = match robot_id {
            Some(robot) => format!("/queue/{robot}"),
            None => "/queue".to_string(),
        };
        let response = self.http_client.get(self.url(&path)).send().await?;
        Ok(envelope_data(response).await?.unwrap_or_default())
    }

    pub async fn list_history(&self, robot_id: Option<&str>) -> ClientResult<Vec<Job>> {
        let path = match robot_id {
            Some(robot) => format!("/history/{robot}"),
            None => "/history".to_string(),
        };
        let response = self.http_client.get(self.url(&path)).send().await?;
        Ok(envelope_data(response).await?.unwrap_or_default())
    }

    pub async fn active_robots(&self, window_seconds: i64) -> ClientResult<Vec<String>> {
        let response = self
            .http_client
            .get(self.url("/activity"))
            .query(&[("seconds_since_last_ping", window_seconds)])
            .send()
            .await?;
        Ok(envelope_data(response).await?.unwrap_or_default())
    }

    pub async fn submit(&self, job: &NewJob, code_archive: Vec<u8>) -> ClientResult<Job> {
        let form = Form::new()
            .text("container", job.container_image.clone())
            .text("run_command", job.run_command.clone())
            .text("mount", job.mount_path.clone())
            .text("robot", job.robot_id.clone())
            .part("code_zip", archive_part(code_archive, "code.tar.gz")?);

        let response = self
            .http_client
            .post(self.url("/job"))
            .multipart(form)
            .send()
            .await?;
        required(envelope_data(response).await?)
    }

    /// Move a running job to `status`, optionally attaching the output archive
    pub async fn report(
        &self,
        id: &str,
        status: JobStatus,
        logs: &str,
        output_archive: Option<Vec<u8>>,
    ) -> ClientResult<Job> {
        let mut form = Form::new()
            .text("status", status.as_str())
            .text("logs", logs.to_string());
        if let Some(bytes) = output_archive {
            form = form.part("output_zip", archive_part(bytes, "output.tar.gz")?);
        }

        let response = self
            .http_client
            .put(self.url(&format!("/job/{id}")))
            .multipart(form)
            .send()
            .await?;
        required(envelope_data(response).await?)
    }

    pub async fn cancel(&self, id: &str) -> ClientResult<Job> {
        self.report(id, JobStatus::Cancelled, "", None).await
    }

    pub async fn delete_job(&self, id: &str) -> ClientResult<Job> {
        let response = self
            .http_client
            .delete(self.url(&format!("/job/{id}")))
            .send()
            .await?;
        required(envelope_data(response).await?)
    }

    pub async fn download_code(&self, id: &str) -> ClientResult<Vec<u8>> {
        self.download(&format!("/code/{id}")).await
    }

    pub async fn download_output(&self, id: &str) -> ClientResult<Vec<u8>> {
        self.download(&format!("/output/{id}")).await
    }

    async fn download(&self, path: &str) -> ClientResult<Vec<u8>> {
        let response = self.http_client.get(self.url(path)).send().await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

fn archive_part(bytes: Vec<u8>, file_name: &'static str) -> ClientResult<Part> {
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("application/gzip")
        .map_err(|e| ClientError::Transport(e.to_string()))
}

fn required<T>(data: Option<T>) -> ClientResult<T> {
    data.ok_or_else(|| ClientError::Decode("response carried no data".to_string()))
}

/// Turn a non-2xx response into `ClientError::ControlPlane`
async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => ("HTTP_ERROR".to_string(), text),
    };

    Err(ClientError::ControlPlane {
        status: status.as_u16(),
        code,
        message,
    })
}

async fn envelope_data<T: DeserializeOwned>(response: Response) -> ClientResult<Option<T>> {
    let response = check_status(response).await?;
    let envelope: Envelope<T> = response.json().await?;

    if !envelope.success {
        return Err(ClientError::Decode(
            "control plane reported failure with a success status".to_string(),
        ));
    }
    Ok(envelope.data)
}
