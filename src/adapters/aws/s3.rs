//! S3 adapter. Implements `BlobStorePort` with ListObjectsV2 (`GET /{bucket}?list-type=2`).

use super::http::ServiceClient;
use crate::ports::BlobStorePort;
use reqwest::Method;
use tracing::{debug, warn};

pub struct S3Adapter {
    http: ServiceClient,
}

impl S3Adapter {
    /// `http` points at the S3 endpoint; buckets are addressed path-style.
    pub fn new(http: ServiceClient) -> Self {
        Self { http }
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, String> {
        let req = self
            .http
            .request(Method::GET, &format!("/{}", bucket))
            .query(&[("list-type", "2"), ("prefix", prefix)]);
        let response = self.http.send(req).await.map_err(|e| e.to_string())?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("read body: {}", e))?;
        if !status.is_success() {
            return Err(format!(
                "S3 error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            ));
        }
        Ok(extract_keys(&body))
    }
}

#[async_trait::async_trait]
impl BlobStorePort for S3Adapter {
    async fn list_object_names(&self, bucket: &str, prefix: &str) -> Vec<String> {
        match self.list_keys(bucket, prefix).await {
            Ok(keys) => {
                debug!(bucket, prefix, count = keys.len(), "listed objects");
                keys.iter().map(|k| object_name(k).to_string()).collect()
            }
            Err(e) => {
                warn!(bucket, prefix, error = %e, "could not list S3 objects");
                Vec::new()
            }
        }
    }
}

/// Pull every `<Key>` value out of a ListBucketResult document.
fn extract_keys(xml: &str) -> Vec<String> {
    const OPEN: &str = "<Key>";
    const CLOSE: &str = "</Key>";
    let mut keys = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(OPEN) {
        let after = &rest[start + OPEN.len()..];
        let Some(end) = after.find(CLOSE) else { break };
        keys.push(unescape_xml(&after[..end]));
        rest = &after[end + CLOSE.len()..];
    }
    keys
}

/// Decode the predefined entities and numeric character references. Unknown ones stay as text.
fn unescape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let reference = name.strip_prefix('#')?;
            let code = match reference.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => reference.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Last `/` segment of a key.
fn object_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
