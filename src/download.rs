use std::path::Path;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::VerifyError;

/// Streams the resource at `url` into `dest` chunk by chunk, so large videos
/// never sit in memory whole. A non-success status counts as a failed
/// download.
pub async fn download_to_file(
    http: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<(), VerifyError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| VerifyError::Download(e.to_string()))?;

    if !response.status().is_success() {
        return Err(VerifyError::Download(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }

    let mut file = File::create(dest).await?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| VerifyError::Download(e.to_string()))?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    Ok(())
}
