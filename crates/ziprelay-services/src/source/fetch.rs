use futures::TryStreamExt;
use reqwest::{Client, Url};
use std::io;

use ziprelay_storage::{ByteStream, StorageError};

/// Start downloading `url` and hand back its body as a byte stream.
///
/// Errors before the first byte (connect failure, any non-2xx final status)
/// and errors mid-body both count as source failures. A redirect the client
/// refused to follow ends here as a 3xx and is rejected like an error status.
pub async fn open_source_stream(client: &Client, url: Url) -> Result<ByteStream, StorageError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| StorageError::SourceRead(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(StorageError::SourceRead(format!(
            "source answered {} for {}",
            status,
            response.url()
        )));
    }

    if let Some(length) = response.content_length() {
        tracing::debug!(size_bytes = length, "Source advertised content length");
    }

    let stream = response.bytes_stream().map_err(io::Error::other);
    Ok(Box::pin(stream))
}
