//! Room-name parsing for voice interview rooms.
//!
//! Accepted shapes, tried in order:
//!   * any UUID anywhere in the name (`interview-<uuid>`, `<uuid>-1712345678`, ...)
//!   * `interview-<id>` / `interview_<id>` with an optional `-<digits>` suffix
//!   * a bare application id (letters, digits, `-`, `_`)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("uuid pattern")
});

static PREFIXED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^interview[-_](?P<id>[A-Za-z0-9]+?)(?:[-_](?P<ts>\d+))?$")
        .expect("prefixed room pattern")
});

static BARE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{2,}$").expect("bare id pattern"));

#[derive(Debug, Error, PartialEq)]
pub enum RoomParseError {
    #[error("Room name is empty")]
    Empty,

    #[error("Room name '{0}' does not contain an application id")]
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomInfo {
    pub application_id: String,
    /// Trailing numeric suffix, usually a creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

pub fn parse_room_name(room: &str) -> Result<RoomInfo, RoomParseError> {
    let room = room.trim();
    if room.is_empty() {
        return Err(RoomParseError::Empty);
    }

    if let Some(m) = UUID_RE.find(room) {
        if let Ok(id) = Uuid::parse_str(m.as_str()) {
            let rest = room[m.end()..].trim_start_matches(['-', '_']);
            let suffix = (!rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
                .then(|| rest.to_string());
            return Ok(RoomInfo {
                application_id: id.to_string(),
                suffix,
            });
        }
    }

    if let Some(caps) = PREFIXED_RE.captures(room) {
        if let Some(id) = caps.name("id") {
            return Ok(RoomInfo {
                application_id: id.as_str().to_string(),
                suffix: caps.name("ts").map(|m| m.as_str().to_string()),
            });
        }
    }

    if !room.to_lowercase().starts_with("interview") && BARE_ID_RE.is_match(room) {
        return Ok(RoomInfo {
            application_id: room.to_string(),
            suffix: None,
        });
    }

    Err(RoomParseError::Unrecognized(room.to_string()))
}

/// Room name first, then participant metadata (`applicationId` or
/// `application_id`, top-level JSON).
pub fn resolve_application_id(room: &str, metadata: Option<&str>) -> Result<String, RoomParseError> {
    let from_room = parse_room_name(room);
    if let Ok(info) = &from_room {
        return Ok(info.application_id.clone());
    }

    metadata
        .and_then(application_id_from_metadata)
        .ok_or_else(|| from_room.err().unwrap_or(RoomParseError::Empty))
}

fn application_id_from_metadata(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw).ok()?;
    ["applicationId", "application_id"]
        .iter()
        .find_map(|key| value.get(*key))
        .and_then(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP_ID: &str = "3f1c2a9e-8b7d-4c6e-9a51-0d2e4f6b8c10";

    #[test]
    fn test_uuid_anywhere_wins() {
        for room in [
            APP_ID.to_string(),
            format!("interview-{APP_ID}"),
            format!("interview_{APP_ID}_1712345678"),
            format!("room-{APP_ID}-1712345678"),
        ] {
            let info = parse_room_name(&room).unwrap();
            assert_eq!(info.application_id, APP_ID, "{room}");
        }
        let info = parse_room_name(&format!("interview-{APP_ID}-1712345678")).unwrap();
        assert_eq!(info.suffix.as_deref(), Some("1712345678"));
    }

    #[test]
    fn test_prefixed_short_id() {
        let info = parse_room_name("interview-abc123-1712345678").unwrap();
        assert_eq!(info.application_id, "abc123");
        assert_eq!(info.suffix.as_deref(), Some("1712345678"));

        let info = parse_room_name("Interview_cmf9x2").unwrap();
        assert_eq!(info.application_id, "cmf9x2");
        assert!(info.suffix.is_none());
    }

    #[test]
    fn test_bare_id() {
        let info = parse_room_name("cmf9x2k0a0001").unwrap();
        assert_eq!(info.application_id, "cmf9x2k0a0001");
    }

    #[test]
    fn test_unrecognized_and_empty() {
        assert_eq!(parse_room_name("   "), Err(RoomParseError::Empty));
        assert!(matches!(
            parse_room_name("interview-"),
            Err(RoomParseError::Unrecognized(_))
        ));
        assert!(matches!(
            parse_room_name("my room!"),
            Err(RoomParseError::Unrecognized(_))
        ));
    }

    #[test]
    fn test_metadata_fallback() {
        let id = resolve_application_id("lobby room", Some(r#"{"applicationId": "app-77"}"#)).unwrap();
        assert_eq!(id, "app-77");

        let id = resolve_application_id("???", Some(r#"{"application_id": 42}"#)).unwrap();
        assert_eq!(id, "42");
    }

    #[test]
    fn test_room_name_beats_metadata() {
        let id = resolve_application_id(
            &format!("interview-{APP_ID}"),
            Some(r#"{"applicationId": "other"}"#),
        )
        .unwrap();
        assert_eq!(id, APP_ID);
    }

    #[test]
    fn test_no_source_reports_room_error() {
        let err = resolve_application_id("my room!", Some("not json")).unwrap_err();
        assert_eq!(err, RoomParseError::Unrecognized("my room!".to_string()));
    }
}
