use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use reqwest::{redirect, Client, StatusCode, Url};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::ResolveError;
use crate::progress::ProgressStack;

const USER_AGENT: &str = "ltex-bootstrap";
const MAX_REDIRECTS: usize = 10;
const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// Streams `url` to `dest`, following up to [`MAX_REDIRECTS`] redirects.
///
/// Progress updates are delivered through the current frame of `progress`
/// at most every 500 ms. On any failure the partial destination file is
/// removed before the error is returned.
pub async fn download(
    url: &str,
    dest: &Path,
    progress: &mut ProgressStack,
) -> Result<(), ResolveError> {
    // Redirects are followed manually so that missing or excessive
    // Location targets can be classified as network errors.
    let client = Client::builder()
        .user_agent(USER_AGENT)
        .redirect(redirect::Policy::none())
        .build()
        .map_err(|e| ResolveError::network(format!("failed to build http client: {e}")))?;

    match stream_to_file(&client, url, dest, progress).await {
        Ok(()) => Ok(()),
        Err(err) => {
            let _ = std::fs::remove_file(dest);
            Err(err)
        }
    }
}

async fn stream_to_file(
    client: &Client,
    url: &str,
    dest: &Path,
    progress: &mut ProgressStack,
) -> Result<(), ResolveError> {
    let mut current = Url::parse(url)
        .map_err(|e| ResolveError::network(format!("invalid download url {url}: {e}")))?;

    let mut redirects = 0usize;
    let resp = loop {
        let resp = client
            .get(current.clone())
            .send()
            .await
            .map_err(|e| ResolveError::network(format!("request to {current} failed: {e}")))?;

        match resp.status() {
            StatusCode::OK => break resp,
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND | StatusCode::TEMPORARY_REDIRECT => {
                redirects += 1;
                if redirects > MAX_REDIRECTS {
                    return Err(ResolveError::network(format!(
                        "more than {MAX_REDIRECTS} redirects while fetching {url}"
                    )));
                }
                let location = resp
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| {
                        ResolveError::network(format!(
                            "redirect from {current} is missing a Location header"
                        ))
                    })?;
                let next = current.join(location).map_err(|e| {
                    ResolveError::network(format!("invalid redirect target {location}: {e}"))
                })?;
                debug!("Following redirect to {next}");
                current = next;
            }
            status => {
                return Err(ResolveError::network(format!(
                    "download of {current} failed with status {status}"
                )))
            }
        }
    };

    let total = resp.content_length();
    info!(
        "Downloading {} ({})",
        current,
        total
            .map(|n| format!("{n} bytes"))
            .unwrap_or_else(|| "unknown size".to_string())
    );

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = resp.bytes_stream();
    let mut downloaded: u64 = 0;
    let mut last_emit: Option<Instant> = None;

    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        if last_emit.map_or(true, |at| at.elapsed() >= PROGRESS_INTERVAL) {
            last_emit = Some(Instant::now());
            match total {
                Some(total) if total > 0 => {
                    progress.update(downloaded as f64 / total as f64, None);
                }
                _ => {
                    let label = format!("downloaded {} KiB", downloaded / 1024);
                    progress.update(0.0, Some(&label));
                }
            }
        }
    }

    file.flush().await?;
    progress.update(1.0, None);
    Ok(())
}
