//! Inbound multipart parsing.
//!
//! # Responsibilities
//! - Parse a multipart/form-data request body into a `DecodedForm`
//! - Classify parts: non-empty filename → file part, otherwise value part
//! - Spool file parts past the threshold to a temp file
//!
//! # Design Decisions
//! - `decode` takes the request by value; a body can only be parsed once
//! - No size limits here; the HTTP layer's body limit applies while reading
//! - Any malformed input surfaces as `PipelineError::Parse`

use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{multipart::Field, FromRequest, Multipart},
    http::Request,
};
use bytes::{Bytes, BytesMut};
use tokio::io::AsyncWriteExt;

use crate::pipeline::error::PipelineError;
use crate::pipeline::form::{DecodedForm, FileContent, FilePart, SpooledFile};

/// Parses inbound multipart bodies.
#[derive(Debug, Clone)]
pub struct FormDecoder {
    spool_threshold: usize,
    spool_dir: PathBuf,
}

impl FormDecoder {
    /// File parts larger than `spool_threshold` bytes go to the OS temp dir.
    pub fn new(spool_threshold: usize) -> Self {
        Self {
            spool_threshold,
            spool_dir: std::env::temp_dir(),
        }
    }

    pub fn with_spool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spool_dir = dir.into();
        self
    }

    /// Consume the request and decode its body.
    pub async fn decode(&self, request: Request<Body>) -> Result<DecodedForm, PipelineError> {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| PipelineError::Parse(e.body_text()))?;

        let mut form = DecodedForm::default();
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|e| PipelineError::Parse(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().filter(|f| !f.is_empty()).map(unescape_file_name) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let content = self.collect_file(&mut field).await?;
                    form.push_file(
                        name,
                        FilePart {
                            file_name,
                            content_type,
                            content,
                        },
                    );
                }
                None => {
                    // Raw bytes: a value in a legacy charset is forwarded untouched.
                    let value = field
                        .bytes()
                        .await
                        .map_err(|e| PipelineError::Parse(e.body_text()))?;
                    form.push_value(name, value);
                }
            }
        }

        tracing::debug!(
            files = form.file_count(),
            values = form.value_count(),
            "Form decoded"
        );
        Ok(form)
    }

    async fn collect_file(&self, field: &mut Field<'_>) -> Result<FileContent, PipelineError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = next_chunk(field).await? {
            if buffer.len() + chunk.len() > self.spool_threshold {
                return self.spool(buffer.freeze(), chunk, field).await;
            }
            buffer.extend_from_slice(&chunk);
        }
        Ok(FileContent::Memory(buffer.freeze()))
    }

    /// Move an oversized part to disk: what was buffered so far, the chunk
    /// that crossed the threshold, then the rest of the field.
    async fn spool(
        &self,
        head: Bytes,
        next: Bytes,
        field: &mut Field<'_>,
    ) -> Result<FileContent, PipelineError> {
        // Reserved before creation so the file is removed on every exit path.
        let mut spooled = SpooledFile::reserve(&self.spool_dir);
        let spool_err =
            |e: std::io::Error| PipelineError::Encode(format!("spooling upload: {}", e));

        let mut file = tokio::fs::File::create(spooled.path())
            .await
            .map_err(spool_err)?;
        file.write_all(&head).await.map_err(spool_err)?;
        file.write_all(&next).await.map_err(spool_err)?;
        let mut written = (head.len() + next.len()) as u64;

        while let Some(chunk) = next_chunk(field).await? {
            file.write_all(&chunk).await.map_err(spool_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(spool_err)?;
        drop(file);

        spooled.set_len(written);
        tracing::debug!(path = ?spooled.path(), bytes = written, "File part spooled to disk");
        Ok(FileContent::Spooled(spooled))
    }
}

/// Undo the quoted-pair escaping that RFC 7578 writers (reqwest, curl, Go)
/// apply to backslashes in filenames. A lone backslash, as browsers send
/// it, is kept.
fn unescape_file_name(raw: &str) -> String {
    raw.replace("\\\\", "\\")
}

async fn next_chunk(field: &mut Field<'_>) -> Result<Option<Bytes>, PipelineError> {
    field
        .chunk()
        .await
        .map_err(|e| PipelineError::Parse(e.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use tokio::io::AsyncReadExt;

    const BOUNDARY: &str = "X-TEST-BOUNDARY";

    fn request(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/summarize")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(body.into())
            .unwrap()
    }

    fn sample_body() -> String {
        format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"dataset\"; filename=\"data.csv\"\r\n\
             Content-Type: text/csv\r\n\r\n\
             a,b\n1,2\n\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"options\"\r\n\r\n\
             {{\"scale\":\"minmax\"}}\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"dataset\"; filename=\"more.csv\"\r\n\r\n\
             c\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"empty\"; filename=\"\"\r\n\r\n\
             \r\n\
             --{b}--\r\n",
            b = BOUNDARY
        )
    }

    async fn read_part(part: &FilePart) -> Vec<u8> {
        let mut out = Vec::new();
        part.open().await.unwrap().read_to_end(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn test_classifies_files_and_values() {
        let form = FormDecoder::new(1024)
            .decode(request(sample_body()))
            .await
            .unwrap();

        assert_eq!(form.file_count(), 2);
        let datasets = &form.files["dataset"];
        assert_eq!(datasets[0].file_name, "data.csv");
        assert_eq!(datasets[0].content_type.as_deref(), Some("text/csv"));
        assert_eq!(read_part(&datasets[0]).await, b"a,b\n1,2\n");
        assert_eq!(datasets[1].file_name, "more.csv");
        assert_eq!(read_part(&datasets[1]).await, b"c");

        assert_eq!(form.values["options"], vec![r#"{"scale":"minmax"}"#]);
        // An empty filename is a value part, as browsers send for an empty file input.
        assert_eq!(form.values["empty"], vec![""]);
    }

    #[tokio::test]
    async fn test_large_part_is_spooled() {
        let dir = std::env::temp_dir();
        let form = FormDecoder::new(4)
            .with_spool_dir(&dir)
            .decode(request(sample_body()))
            .await
            .unwrap();

        let datasets = &form.files["dataset"];
        assert!(datasets[0].is_spooled());
        assert_eq!(datasets[0].len(), 8);
        assert_eq!(read_part(&datasets[0]).await, b"a,b\n1,2\n");
        assert!(!datasets[1].is_spooled());

        let path = match &datasets[0].content {
            FileContent::Spooled(file) => file.path().to_path_buf(),
            FileContent::Memory(_) => unreachable!(),
        };
        drop(form);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_missing_boundary_delimiters() {
        let err = FormDecoder::new(1024)
            .decode(request("just some bytes with no delimiters"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[tokio::test]
    async fn test_not_multipart() {
        let req = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let err = FormDecoder::new(1024).decode(req).await.unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[tokio::test]
    async fn test_missing_boundary_parameter() {
        let req = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, "multipart/form-data")
            .body(Body::from(sample_body()))
            .unwrap();
        let err = FormDecoder::new(1024).decode(req).await.unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
    }

    #[tokio::test]
    async fn test_zero_parts() {
        let form = FormDecoder::new(1024)
            .decode(request(format!("--{}--\r\n", BOUNDARY)))
            .await
            .unwrap();
        assert!(form.is_empty());
    }

    #[tokio::test]
    async fn test_non_utf8_value_kept_verbatim() {
        let mut body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"city\"\r\n\r\n",
            b = BOUNDARY
        )
        .into_bytes();
        body.extend_from_slice(b"caf\xE9");
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        let form = FormDecoder::new(1024).decode(request(body)).await.unwrap();
        assert_eq!(form.values["city"], vec![Bytes::from_static(b"caf\xE9")]);
    }

    #[tokio::test]
    async fn test_escaped_backslash_in_filename() {
        let body = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"a\"; filename=\"C:\\\\in\\\\q1.csv\"\r\n\r\n\
             x\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"b\"; filename=\"raw\\name.csv\"\r\n\r\n\
             y\r\n\
             --{b}--\r\n",
            b = BOUNDARY
        );
        let form = FormDecoder::new(1024).decode(request(body)).await.unwrap();
        assert_eq!(form.files["a"][0].file_name, r"C:\in\q1.csv");
        assert_eq!(form.files["b"][0].file_name, r"raw\name.csv");
    }
}
