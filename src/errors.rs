use thiserror::Error;

/// Number of characters of an unparsable completion kept for diagnostics.
pub const PREVIEW_CHARS: usize = 500;

#[derive(Error, Debug)]
pub enum SiteError {
    #[error("completion endpoint returned no content")]
    EmptyResponse,

    #[error("could not parse model response as site JSON; response began with: {preview}")]
    UnparsableResponse { preview: String },

    #[error("no JSON object found in model response")]
    NoJsonObjectFound,

    #[error("{}", upstream_message(.status, .kind, .message))]
    Upstream {
        status: Option<u16>,
        kind: Option<String>,
        message: String,
    },

    #[error("config error: {0}")]
    Config(String),
}

impl SiteError {
    pub fn unparsable(text: &str) -> Self {
        SiteError::UnparsableResponse { preview: text.chars().take(PREVIEW_CHARS).collect() }
    }
}

impl From<reqwest::Error> for SiteError {
    fn from(e: reqwest::Error) -> Self {
        SiteError::Upstream {
            status: e.status().map(|s| s.as_u16()),
            kind: None,
            message: e.to_string(),
        }
    }
}

fn upstream_message(status: &Option<u16>, kind: &Option<String>, message: &str) -> String {
    match (status, kind) {
        (Some(s), Some(k)) => format!("upstream error ({s}, {k}): {message}"),
        (Some(s), None) => format!("upstream error ({s}): {message}"),
        (None, Some(k)) => format!("upstream error ({k}): {message}"),
        (None, None) => format!("upstream error: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unparsable_preview_is_truncated() {
        let long = "x".repeat(2_000);
        match SiteError::unparsable(&long) {
            SiteError::UnparsableResponse { preview } => {
                assert_eq!(preview.chars().count(), PREVIEW_CHARS)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn upstream_display_keeps_status_and_type() {
        let e = SiteError::Upstream {
            status: Some(429),
            kind: Some("rate_limit_exceeded".into()),
            message: "slow down".into(),
        };
        assert_eq!(e.to_string(), "upstream error (429, rate_limit_exceeded): slow down");
    }
}
