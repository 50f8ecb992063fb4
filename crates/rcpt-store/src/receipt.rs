use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Metadata binding an uploaded image to the identity that owns it.
///
/// The serialized field names (`ID`, `FilePath`, `UserID`) are the on-disk
/// and over-the-wire format and must not change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "FilePath")]
    pub file_path: PathBuf,
    #[serde(rename = "UserID")]
    pub user_id: String,
}

impl Receipt {
    pub fn new(id: impl Into<String>, file_path: impl Into<PathBuf>, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file_path: file_path.into(),
            user_id: user_id.into(),
        }
    }

    /// Location of the original uploaded image.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Returns `true` if `user_id` owns this receipt.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_field_names() {
        let r = Receipt::new("1", "/path/to/receipt1.jpg", "test-user");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(
            json,
            r#"{"ID":"1","FilePath":"/path/to/receipt1.jpg","UserID":"test-user"}"#
        );
    }

    #[test]
    fn ownership() {
        let r = Receipt::new("1", "a.jpg", "u1");
        assert!(r.is_owned_by("u1"));
        assert!(!r.is_owned_by("u2"));
        assert!(!r.is_owned_by(""));
    }

    #[test]
    fn decode_from_wire_format() {
        let r: Receipt =
            serde_json::from_str(r#"{"ID":"abc","FilePath":"uploads/x.png","UserID":"u9"}"#).unwrap();
        assert_eq!(r.id, "abc");
        assert_eq!(r.path(), Path::new("uploads/x.png"));
        assert_eq!(r.user_id, "u9");
    }
}
