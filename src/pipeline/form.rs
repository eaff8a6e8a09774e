//! Decoded form data model.
//!
//! A `DecodedForm` lives for a single request. File contents are held in
//! memory or, past the spool threshold, in a temp file owned by the part;
//! dropping the form deletes any spooled files.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use tokio::io::{AsyncRead, ReadBuf};

/// Content of an uploaded file part.
#[derive(Debug)]
pub enum FileContent {
    Memory(Bytes),
    Spooled(SpooledFile),
}

/// A temp file holding one part's bytes. Deleted on drop.
#[derive(Debug)]
pub struct SpooledFile {
    path: PathBuf,
    len: u64,
}

impl SpooledFile {
    /// Reserve a uniquely named file under `dir`. The file is not created
    /// here, but it is removed on drop once something has created it.
    pub(crate) fn reserve(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("upload-gateway-{}.part", uuid::Uuid::new_v4())),
            len: 0,
        }
    }

    pub(crate) fn set_len(&mut self, len: u64) {
        self.len = len;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for SpooledFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "Failed to remove spooled upload");
            }
        }
    }
}

/// A part that declared a filename.
#[derive(Debug)]
pub struct FilePart {
    pub file_name: String,
    /// Content type declared by the part, if any.
    pub content_type: Option<String>,
    pub content: FileContent,
}

impl FilePart {
    pub fn in_memory(
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            content: FileContent::Memory(bytes.into()),
        }
    }

    pub fn len(&self) -> u64 {
        match &self.content {
            FileContent::Memory(bytes) => bytes.len() as u64,
            FileContent::Spooled(file) => file.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_spooled(&self) -> bool {
        matches!(self.content, FileContent::Spooled(_))
    }

    /// Open a read handle on the content. The handle is released when the
    /// returned reader is dropped.
    pub async fn open(&self) -> io::Result<PartReader> {
        match &self.content {
            FileContent::Memory(bytes) => Ok(PartReader::Memory(io::Cursor::new(bytes.clone()))),
            FileContent::Spooled(file) => {
                let handle = tokio::fs::File::open(file.path()).await?;
                Ok(PartReader::File(handle))
            }
        }
    }
}

/// Read handle over a file part's content.
#[derive(Debug)]
pub enum PartReader {
    Memory(io::Cursor<Bytes>),
    File(tokio::fs::File),
}

impl AsyncRead for PartReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            PartReader::Memory(cursor) => Pin::new(cursor).poll_read(cx, buf),
            PartReader::File(file) => Pin::new(file).poll_read(cx, buf),
        }
    }
}

/// Files and values of one multipart body, grouped by field name.
///
/// Order within a field name follows the inbound body; order across field
/// names is not preserved. Values are kept as the raw bytes of the part,
/// whatever their charset.
#[derive(Debug, Default)]
pub struct DecodedForm {
    pub files: BTreeMap<String, Vec<FilePart>>,
    pub values: BTreeMap<String, Vec<Bytes>>,
}

impl DecodedForm {
    pub fn push_file(&mut self, name: impl Into<String>, part: FilePart) {
        self.files.entry(name.into()).or_default().push(part);
    }

    pub fn push_value(&mut self, name: impl Into<String>, value: impl Into<Bytes>) {
        self.values.entry(name.into()).or_default().push(value.into());
    }

    pub fn file_count(&self) -> usize {
        self.files.values().map(Vec::len).sum()
    }

    pub fn value_count(&self) -> usize {
        self.values.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.file_count() == 0 && self.value_count() == 0
    }
}
