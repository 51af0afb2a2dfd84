//! Posting a payload to the Coveralls jobs API.

use tracing::info;

use crate::error::{Result, ShimError};

pub const DEFAULT_ENDPOINT: &str = "https://coveralls.io/api/v1/jobs";

/// Form field (and file name) the jobs API reads the payload from.
const FILE_FIELD: &str = "json_file";

/// POST `payload` as a multipart file upload and return the response body.
pub fn upload(endpoint: &str, payload: &str) -> Result<String> {
    let boundary = boundary_for(payload);
    let body = multipart_body(&boundary, payload);

    info!(endpoint, bytes = body.len(), "uploading coverage payload");
    let resp = ureq::post(endpoint)
        .set(
            "Content-Type",
            &format!("multipart/form-data; boundary={boundary}"),
        )
        .set("User-Agent", "covshim")
        .send_bytes(&body);

    match resp {
        Ok(resp) => resp
            .into_string()
            .map_err(|e| ShimError::Transport(format!("failed to read response body: {e}"))),
        Err(ureq::Error::Status(code, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            Err(ShimError::Transport(format!(
                "{endpoint} answered HTTP {code}: {body}"
            )))
        }
        Err(e) => Err(ShimError::Transport(format!("POST {endpoint}: {e}"))),
    }
}

/// A multipart boundary that does not occur in `payload`.
fn boundary_for(payload: &str) -> String {
    let mut boundary = String::from("covshim-payload-boundary");
    let mut n = 0u32;
    while payload.contains(&boundary) {
        n += 1;
        boundary = format!("covshim-payload-boundary-{n}");
    }
    boundary
}

fn multipart_body(boundary: &str, payload: &str) -> Vec<u8> {
    format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{FILE_FIELD}\"; filename=\"{FILE_FIELD}\"\r\n\
         Content-Type: application/json\r\n\
         \r\n\
         {payload}\r\n\
         --{boundary}--\r\n"
    )
    .into_bytes()
}
