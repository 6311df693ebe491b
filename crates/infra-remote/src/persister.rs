// HTTP Persister - forwards finished artifacts to the external store

use async_trait::async_trait;
use reqwest::multipart;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use resona_core::port::{PersistError, Persister};

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Persister client
///
/// Uploads `POST {endpoint}/save/audio` as a multipart form with a `file`
/// part (binary, named by task id) and a `user_id` field. Any non-2xx
/// response is a persister failure. The local artifact is left in place;
/// the reaper owns its deletion.
pub struct HttpPersister {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPersister {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Persister for HttpPersister {
    async fn store(&self, task_id: &str, artifact: &Path) -> Result<(), PersistError> {
        let bytes = tokio::fs::read(artifact)
            .await
            .map_err(|e| PersistError::IoError(e.to_string()))?;

        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("{}.wav", task_id));

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/wav")
            .map_err(|e| PersistError::Transport(e.to_string()))?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("user_id", task_id.to_string());

        info!(task_id = %task_id, "Forwarding artifact to persister");
        let response = self
            .client
            .post(format!("{}/save/audio", self.endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PersistError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PersistError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn artifact(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let p = dir.path().join("u1.wav");
        tokio::fs::write(&p, b"RIFF....WAVE").await.unwrap();
        p
    }

    #[tokio::test]
    async fn uploads_multipart_to_save_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/save/audio"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let artifact = artifact(&dir).await;

        let persister = HttpPersister::new(server.uri());
        persister.store("u1", &artifact).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body).into_owned();
        assert!(body.contains("name=\"user_id\""));
        assert!(body.contains("u1"));
        assert!(body.contains("filename=\"u1.wav\""));

        // Retained-until-TTL policy: the upload must not remove the local copy
        assert!(artifact.exists());
    }

    #[tokio::test]
    async fn non_2xx_is_a_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/save/audio"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let artifact = artifact(&dir).await;

        let persister = HttpPersister::new(server.uri());
        let err = persister.store("u1", &artifact).await.unwrap_err();
        assert!(matches!(err, PersistError::Rejected(503)));
    }

    #[tokio::test]
    async fn unreadable_artifact_is_an_io_error() {
        let persister = HttpPersister::new("http://localhost:1");
        let err = persister
            .store("u1", Path::new("/nonexistent/u1.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistError::IoError(_)));
    }
}
