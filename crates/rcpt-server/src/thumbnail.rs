use std::path::Path;

use rcpt_image::TargetSize;
use serde::{Deserialize, Serialize};

/// One of the three derived sizes generated per receipt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThumbnailSize {
    Small,
    Medium,
    Large,
}

impl ThumbnailSize {
    pub const ALL: [ThumbnailSize; 3] = [Self::Small, Self::Medium, Self::Large];

    /// Bounding width (and height) in pixels.
    pub const fn max_width(self) -> u32 {
        match self {
            Self::Small => 100,
            Self::Medium => 200,
            Self::Large => 400,
        }
    }

    pub const fn target(self) -> TargetSize {
        TargetSize::square(self.max_width())
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        }
    }
}

/// Paths of a receipt's thumbnails. A size that was not produced is empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailManifest {
    pub small: String,
    pub medium: String,
    pub large: String,
}

impl ThumbnailManifest {
    pub fn set(&mut self, size: ThumbnailSize, path: &Path) {
        let slot = match size {
            ThumbnailSize::Small => &mut self.small,
            ThumbnailSize::Medium => &mut self.medium,
            ThumbnailSize::Large => &mut self.large,
        };
        *slot = path.to_string_lossy().into_owned();
    }

    pub fn get(&self, size: ThumbnailSize) -> &str {
        match size {
            ThumbnailSize::Small => &self.small,
            ThumbnailSize::Medium => &self.medium,
            ThumbnailSize::Large => &self.large,
        }
    }

    /// First size with no path yet, if any.
    pub fn missing(&self) -> Option<ThumbnailSize> {
        ThumbnailSize::ALL.into_iter().find(|s| self.get(*s).is_empty())
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_targets() {
        assert_eq!(ThumbnailSize::Small.target(), TargetSize::square(100));
        assert_eq!(ThumbnailSize::Medium.target(), TargetSize::square(200));
        assert_eq!(ThumbnailSize::Large.target(), TargetSize::square(400));
        assert_eq!(ThumbnailSize::Large.name(), "large");
    }

    #[test]
    fn manifest_slots() {
        let mut m = ThumbnailManifest::default();
        assert!(!m.is_complete());
        assert_eq!(m.missing(), Some(ThumbnailSize::Small));
        m.set(ThumbnailSize::Medium, Path::new("uploads/r_200x150.jpg"));
        assert_eq!(m.get(ThumbnailSize::Medium), "uploads/r_200x150.jpg");
        assert_eq!(m.get(ThumbnailSize::Small), "");

        m.set(ThumbnailSize::Small, Path::new("s"));
        assert_eq!(m.missing(), Some(ThumbnailSize::Large));
        m.set(ThumbnailSize::Large, Path::new("l"));
        assert!(m.is_complete());
        assert_eq!(m.missing(), None);
    }

    #[test]
    fn manifest_json_shape() {
        let m = ThumbnailManifest { small: "a".into(), medium: "b".into(), large: "c".into() };
        assert_eq!(
            serde_json::to_string(&m).unwrap(),
            r#"{"small":"a","medium":"b","large":"c"}"#
        );
    }
}
