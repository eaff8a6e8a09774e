//! Outbound multipart serialization.
//!
//! # Responsibilities
//! - Build a `reqwest` multipart form with a fresh boundary per payload
//! - Carry each file part's field name, filename, content type and bytes
//! - Carry each value part's field name and exact bytes
//! - Buffer the form into one body closed by the terminating boundary
//!
//! # Design Decisions
//! - Files first, then values; field names in map order, parts within a
//!   field in inbound order
//! - Spooled files are streamed from disk; each handle is owned by its
//!   part's body and closed once that part has been read
//! - A file that cannot be read fails the whole payload (no skipping)

use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use reqwest::multipart::{Form, Part};

use crate::pipeline::error::PipelineError;
use crate::pipeline::form::{DecodedForm, FilePart, PartReader};

const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// A re-encoded multipart body ready to dispatch.
#[derive(Debug, Clone)]
pub struct OutboundPayload {
    boundary: String,
    content_type: String,
    body: Bytes,
}

impl OutboundPayload {
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the outbound `Content-Type` header.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Encode a form into a new multipart payload. Consumes the form so any
/// spooled files are deleted as soon as encoding finishes.
pub async fn encode(form: DecodedForm) -> Result<OutboundPayload, PipelineError> {
    let mut outbound = Form::new().percent_encode_noop();
    let mut parts = 0usize;

    for (name, files) in &form.files {
        for file in files {
            outbound = outbound.part(header_safe(name), file_part(name, file).await?);
            parts += 1;
        }
    }

    for (name, values) in &form.values {
        for value in values {
            outbound = outbound.part(header_safe(name), Part::bytes(value.to_vec()));
            parts += 1;
        }
    }

    let payload = collect(outbound, parts).await?;
    tracing::debug!(
        parts,
        bytes = payload.len(),
        boundary = %payload.boundary(),
        "Payload encoded"
    );
    Ok(payload)
}

async fn file_part(name: &str, file: &FilePart) -> Result<Part, PipelineError> {
    let encode_err = |e: std::io::Error| {
        PipelineError::Encode(format!("field '{}' file '{}': {}", name, file.file_name, e))
    };

    let part = match file.open().await.map_err(encode_err)? {
        PartReader::Memory(cursor) => Part::bytes(cursor.into_inner().to_vec()),
        PartReader::File(handle) => {
            let on_disk = handle.metadata().await.map_err(encode_err)?.len();
            if on_disk != file.len() {
                return Err(PipelineError::Encode(format!(
                    "field '{}' file '{}': expected {} bytes, found {}",
                    name,
                    file.file_name,
                    file.len(),
                    on_disk
                )));
            }
            Part::stream_with_length(handle, on_disk)
        }
    };

    let content_type = file
        .content_type
        .as_deref()
        .unwrap_or(DEFAULT_FILE_CONTENT_TYPE);
    part.file_name(header_safe(&file.file_name))
        .mime_str(content_type)
        .map_err(|e| {
            PipelineError::Encode(format!(
                "field '{}' file '{}': content type '{}': {}",
                name, file.file_name, content_type, e
            ))
        })
}

/// Drain the form into a single buffer. A form without parts still gets
/// its closing delimiter so the body stays parseable.
async fn collect(form: Form, parts: usize) -> Result<OutboundPayload, PipelineError> {
    let boundary = form.boundary().to_string();
    let content_type = format!("multipart/form-data; boundary={}", boundary);

    if parts == 0 {
        return Ok(OutboundPayload {
            body: Bytes::from(format!("--{}--\r\n", boundary)),
            content_type,
            boundary,
        });
    }

    let mut stream = Box::pin(form.into_stream());
    let mut body = BytesMut::new();
    while let Some(chunk) = stream
        .try_next()
        .await
        .map_err(|e| PipelineError::Encode(format!("reading part content: {}", e)))?
    {
        body.extend_from_slice(&chunk);
    }

    Ok(OutboundPayload {
        boundary,
        content_type,
        body: body.freeze(),
    })
}

/// Percent-encode the characters that would close a quoted header
/// parameter or the header line. Everything else, backslashes included,
/// is passed through; reqwest applies quoted-pair escaping to filenames.
fn header_safe(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
