//! Endpoint URLs derived from the base URL
//!
//! | Purpose      | Multi profile                               | Legacy profile                 |
//! |--------------|---------------------------------------------|--------------------------------|
//! | create       | `POST {base}.jocket_prepare`                | `GET {base}.jocket`            |
//! | websocket    | `{base, http→ws}?jocket_sid={sid}`          | n/a                            |
//! | polling      | `{base}.jocket_polling?jocket_sid={sid}`    | `{base/..}/jocket?s={sid}`     |

use crate::config::ProtocolProfile;
use crate::error::{JocketError, Result};
use crate::transport::TransportKind;
use url::Url;

pub const PREPARE_SUFFIX: &str = ".jocket_prepare";
pub const POLLING_SUFFIX: &str = ".jocket_polling";
pub const LEGACY_CREATE_SUFFIX: &str = ".jocket";
pub const LEGACY_POLLING_SEGMENT: &str = "jocket";
pub const SESSION_PARAM: &str = "jocket_sid";
pub const LEGACY_SESSION_PARAM: &str = "s";

/// URL of the session creation request
pub fn create_url(base: &Url, profile: ProtocolProfile) -> Url {
    match profile {
        ProtocolProfile::Multi => with_suffix(base, PREPARE_SUFFIX),
        ProtocolProfile::Legacy => with_suffix(base, LEGACY_CREATE_SUFFIX),
    }
}

/// URL of a transport for an established session
pub fn transport_url(
    base: &Url,
    kind: TransportKind,
    session_id: &str,
    profile: ProtocolProfile,
) -> Result<Url> {
    let mut url = match (profile, kind) {
        (ProtocolProfile::Multi, TransportKind::WebSocket) => socket_url(base)?,
        (ProtocolProfile::Multi, TransportKind::Polling) => with_suffix(base, POLLING_SUFFIX),
        (ProtocolProfile::Legacy, TransportKind::Polling) => legacy_polling_url(base)?,
        (ProtocolProfile::Legacy, TransportKind::WebSocket) => {
            return Err(JocketError::Configuration(
                "Legacy profile only supports the polling transport".into(),
            ))
        }
    };

    let param = match profile {
        ProtocolProfile::Multi => SESSION_PARAM,
        ProtocolProfile::Legacy => LEGACY_SESSION_PARAM,
    };
    url.query_pairs_mut().append_pair(param, session_id);
    Ok(url)
}

fn with_suffix(base: &Url, suffix: &str) -> Url {
    let mut url = base.clone();
    let path = format!("{}{}", base.path(), suffix);
    url.set_path(&path);
    url
}

fn socket_url(base: &Url) -> Result<Url> {
    let scheme = match base.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(JocketError::Configuration(format!(
                "Unsupported URL scheme: {}",
                other
            )))
        }
    };

    let mut url = base.clone();
    url.set_scheme(scheme)
        .map_err(|()| JocketError::Configuration(format!("Cannot use {} with {}", scheme, base)))?;
    Ok(url)
}

fn legacy_polling_url(base: &Url) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| JocketError::Configuration(format!("Base URL cannot carry a path: {}", base)))?
        .pop_if_empty()
        .pop()
        .push(LEGACY_POLLING_SEGMENT);
    Ok(url)
}
