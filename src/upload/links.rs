//! Preview and download addresses for stored files.

use reqwest::Url;

use crate::error::{ErrorKind, NormalizedError};
use crate::session::Session;

const PREVIEW_SEGMENT: &str = "view";
const DOWNLOAD_SEGMENT: &str = "download";

/// Build `{files_base}/api/files/{view|download}/{filename}`.
///
/// With `with_auth`, preview links need both a token and a session id and
/// fail with `MissingCredentials` otherwise; download links carry whichever
/// of the two is available.
pub fn file_url(
    files_base: &str,
    filename: &str,
    for_preview: bool,
    with_auth: bool,
    session: Option<&Session>,
) -> Result<String, NormalizedError> {
    let mut url = Url::parse(files_base).map_err(|err| {
        NormalizedError::new(
            ErrorKind::Validation,
            format!("The files address '{files_base}' is not a valid URL."),
            0,
        )
        .with_cause(err)
    })?;
    let endpoint = if for_preview {
        PREVIEW_SEGMENT
    } else {
        DOWNLOAD_SEGMENT
    };
    url.path_segments_mut()
        .map_err(|()| {
            NormalizedError::validation(format!(
                "The files address '{files_base}' cannot carry a path."
            ))
        })?
        .pop_if_empty()
        .extend(["api", "files", endpoint, filename]);

    if !with_auth {
        return Ok(url.to_string());
    }

    let token = session
        .map(|session| session.token.trim())
        .filter(|token| !token.is_empty());
    let session_id = session.and_then(Session::session_id);

    if for_preview {
        let (Some(token), Some(session_id)) = (token, session_id) else {
            return Err(NormalizedError::missing_credentials(
                "Authentication required to preview this file.",
            ));
        };
        url.query_pairs_mut()
            .append_pair("token", token)
            .append_pair("sessionId", session_id);
    } else if token.is_some() || session_id.is_some() {
        let mut pairs = url.query_pairs_mut();
        if let Some(token) = token {
            pairs.append_pair("token", token);
        }
        if let Some(session_id) = session_id {
            pairs.append_pair("sessionId", session_id);
        }
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://files.local:5001";

    fn session() -> Session {
        Session::new("tok en&1", Some("sid/9".to_string()))
    }

    #[test]
    fn plain_links_select_endpoint_by_mode() {
        assert_eq!(
            file_url(BASE, "a.png", true, false, None).unwrap(),
            "http://files.local:5001/api/files/view/a.png"
        );
        assert_eq!(
            file_url(BASE, "a.png", false, false, Some(&session())).unwrap(),
            "http://files.local:5001/api/files/download/a.png"
        );
    }

    #[test]
    fn filename_is_one_encoded_segment() {
        let url = file_url(BASE, "my report/v2.pdf", false, false, None).unwrap();
        assert_eq!(
            url,
            "http://files.local:5001/api/files/download/my%20report%2Fv2.pdf"
        );
    }

    #[test]
    fn base_path_is_preserved() {
        let url = file_url("http://host/files-svc/", "a.txt", true, false, None).unwrap();
        assert_eq!(url, "http://host/files-svc/api/files/view/a.txt");
    }

    #[test]
    fn authenticated_preview_carries_encoded_credentials() {
        let url = file_url(BASE, "a.png", true, true, Some(&session())).unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("token".to_string(), "tok en&1".to_string()),
                ("sessionId".to_string(), "sid/9".to_string()),
            ]
        );
        assert!(!url.contains("tok en&1"));
    }

    #[test]
    fn authenticated_preview_requires_full_session() {
        let err = file_url(BASE, "a.png", true, true, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCredentials);

        let partial = Session::new("tok", None);
        let err = file_url(BASE, "a.png", true, true, Some(&partial)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingCredentials);
    }

    #[test]
    fn authenticated_download_uses_what_is_available() {
        let partial = Session::new("tok", None);
        assert_eq!(
            file_url(BASE, "a.png", false, true, Some(&partial)).unwrap(),
            "http://files.local:5001/api/files/download/a.png?token=tok"
        );
        assert_eq!(
            file_url(BASE, "a.png", false, true, None).unwrap(),
            "http://files.local:5001/api/files/download/a.png"
        );
    }

    #[test]
    fn invalid_base_is_a_validation_error() {
        let err = file_url("not a url", "a.png", false, false, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
