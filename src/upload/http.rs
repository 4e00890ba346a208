use std::time::Duration;

use async_trait::async_trait;
use log::trace;
use reqwest::{
    multipart::{Form, Part},
    Body, Client,
};
use serde_json::Value;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::{
    config::UploadFields,
    error::Result,
    format::format_path,
    job::JobItem,
};

use super::{Outcome, UploadError, Uploader};

/// Form field that carries the file contents.
pub const FILE_FIELD: &str = "file";

/// Posts each file as `multipart/form-data` to a fixed URL.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: Client,
    url: String,
}

impl HttpUploader {
    pub fn new(url: String, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build()?;
        Ok(HttpUploader { client, url })
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload(&self, item: &JobItem, fields: &UploadFields) -> Outcome {
        let file = File::open(&item.path).await?;
        let size = file.metadata().await?.len();
        let file_name = item
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let contents = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(contents, size).file_name(file_name);
        let mut form = Form::new().part(FILE_FIELD, part);
        for (key, value) in fields.iter() {
            form = form.text(key.to_owned(), value.to_owned());
        }

        trace!("posting {} to {}", format_path(&item.path), self.url);
        let response = self.client.post(&self.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        if response_accepted(&body) {
            Ok(size)
        } else {
            Err(UploadError::Rejected)
        }
    }
}

/// Checks the application-level result in a response body.
///
/// JSON objects carrying `data.success` are judged by that flag; any other
/// body is accepted, since the request itself already succeeded. A body that
/// looks like JSON but does not parse is rejected.
pub fn response_accepted(body: &str) -> bool {
    let body = body.trim_start();
    if !body.starts_with('{') {
        return true;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => value.pointer("/data/success").map_or(true, is_truthy),
        Err(_) => false,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use tempfile::tempdir;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    use crate::{config::UploadFields, job::JobItem, upload::UploadError};

    use super::{response_accepted, HttpUploader, Uploader};

    const CONTENTS: &[u8] = b"8 bytes!";

    /// Answers a single request and hands back the raw request text.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/upload", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });

        (url, handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&request).into_owned();
            let Some(end) = text.find("\r\n\r\n") else {
                continue;
            };
            let head = text[..end].to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok());
            let done = match length {
                Some(length) => request.len() >= end + 4 + length,
                None => text.ends_with("--\r\n") || text.ends_with("0\r\n\r\n"),
            };
            if done {
                break;
            }
        }
        String::from_utf8_lossy(&request).into_owned()
    }

    fn photo(dir: &Path) -> JobItem {
        let path = dir.join("photo.jpg");
        fs::write(&path, CONTENTS).unwrap();
        JobItem::new(1, path)
    }

    #[tokio::test]
    async fn posts_file_and_extra_fields() {
        let dir = tempdir().unwrap();
        let item = photo(dir.path());
        let fields: UploadFields = "album=trip,owner=me".parse().unwrap();
        let (url, server) = serve_once("200 OK", r#"{"data":{"success":true}}"#).await;

        let uploader = HttpUploader::new(url, None).unwrap();
        let sent = uploader.upload(&item, &fields).await.unwrap();
        assert_eq!(sent, CONTENTS.len() as u64);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /upload "));
        assert!(request.to_ascii_lowercase().contains("multipart/form-data; boundary="));
        assert!(request.contains(r#"name="file"; filename="photo.jpg""#));
        assert!(request.contains("8 bytes!"));
        assert!(request.contains(r#"name="album""#));
        assert!(request.contains("trip"));
        assert!(request.contains(r#"name="owner""#));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let dir = tempdir().unwrap();
        let item = photo(dir.path());
        let (url, server) = serve_once("500 Internal Server Error", "").await;

        let uploader = HttpUploader::new(url, None).unwrap();
        let err = uploader.upload(&item, &UploadFields::default()).await.unwrap_err();
        assert!(matches!(err, UploadError::Status(500)), "{err:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unsuccessful_body_is_rejected() {
        let dir = tempdir().unwrap();
        let item = photo(dir.path());
        let (url, server) = serve_once("200 OK", r#"{"data":{"success":false}}"#).await;

        let uploader = HttpUploader::new(url, None).unwrap();
        let err = uploader.upload(&item, &UploadFields::default()).await.unwrap_err();
        assert!(matches!(err, UploadError::Rejected), "{err:?}");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_fails_before_sending() {
        let dir = tempdir().unwrap();
        let item = JobItem::new(1, dir.path().join("gone.jpg"));

        let uploader = HttpUploader::new("http://127.0.0.1:9/upload".to_owned(), None).unwrap();
        let err = uploader.upload(&item, &UploadFields::default()).await.unwrap_err();
        assert!(matches!(err, UploadError::Read(_)), "{err:?}");
    }

    #[test]
    fn success_flag_is_respected() {
        assert!(response_accepted(r#"{"data":{"success":true}}"#));
        assert!(!response_accepted(r#"{"data":{"success":false}}"#));
        assert!(!response_accepted(r#"{"data":{"success":0}}"#));
        assert!(response_accepted(r#"{"data":{"success":1,"id":7}}"#));
    }

    #[test]
    fn missing_flag_falls_back_to_transport() {
        assert!(response_accepted(r#"{"code":0}"#));
        assert!(response_accepted("OK"));
        assert!(response_accepted(""));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(!response_accepted(r#"{"data":"#));
    }
}
