use axum::Json;
use serde::Serialize;

pub const MISSING_INPUTS: &str = "Please fill in all the inputs";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Body shape shared by every JSON response.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub msg: String,
}

impl Envelope<()> {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            data: None,
            msg: msg.into(),
        }
    }
}

/// Success envelope carrying a payload. A `None` payload still serializes as `"data": null`.
pub fn success<T: Serialize>(data: T, msg: &str) -> Json<Envelope<T>> {
    Json(Envelope {
        status: Status::Success,
        data: Some(data),
        msg: msg.to_string(),
    })
}

/// Success envelope without a `data` field.
pub fn done(msg: &str) -> Json<Envelope<()>> {
    Json(Envelope {
        status: Status::Success,
        data: None,
        msg: msg.to_string(),
    })
}

/// Presence check for request fields: absent and empty strings both count as missing.
pub fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_payload_is_kept_in_body() {
        let Json(body) = success(None::<u32>, "Product retrieved successfully");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json.get("data").is_some());
        assert!(json["data"].is_null());
    }

    #[test]
    fn done_omits_data() {
        let Json(body) = done("User deleted successfully");
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["msg"], "User deleted successfully");
    }

    #[test]
    fn empty_strings_are_not_present() {
        assert_eq!(present(Some(String::new())), None);
        assert_eq!(present(None), None);
        assert_eq!(present(Some("a".into())), Some("a".into()));
    }
}
