//! Media and document listing
//!
//! `/all-files` groups the device's files by MIME family. Each entry carries
//! the file name and a backend-relative download URL of the form
//! `/files/download?path=<percent-encoded device path>`.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::records::lenient_string;

/// One file on the device
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
}

impl FileItem {
    /// Device-side path decoded from the download URL's `path` query
    pub fn device_path(&self) -> Option<String> {
        let base = Url::parse("http://localhost/").ok()?;
        let url = base.join(&self.url).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "path")
            .map(|(_, value)| value.into_owned())
    }

    fn name_contains(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
    }
}

/// File category as grouped by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileCategory {
    Photos,
    Videos,
    Documents,
    Others,
}

impl FileCategory {
    pub const ALL: [FileCategory; 4] = [
        FileCategory::Photos,
        FileCategory::Videos,
        FileCategory::Documents,
        FileCategory::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Photos => "photos",
            FileCategory::Videos => "videos",
            FileCategory::Documents => "documents",
            FileCategory::Others => "others",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "photos" | "images" => Some(FileCategory::Photos),
            "videos" => Some(FileCategory::Videos),
            "documents" => Some(FileCategory::Documents),
            "others" => Some(FileCategory::Others),
            _ => None,
        }
    }
}

/// Per-category counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileCounts {
    pub photos: usize,
    pub videos: usize,
    pub documents: usize,
    pub others: usize,
}

impl FileCounts {
    pub fn total(&self) -> usize {
        self.photos + self.videos + self.documents + self.others
    }
}

/// `/all-files` payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCatalog {
    pub photos: Vec<FileItem>,
    pub videos: Vec<FileItem>,
    pub documents: Vec<FileItem>,
    pub others: Vec<FileItem>,
}

impl FileCatalog {
    pub fn category(&self, category: FileCategory) -> &[FileItem] {
        match category {
            FileCategory::Photos => &self.photos,
            FileCategory::Videos => &self.videos,
            FileCategory::Documents => &self.documents,
            FileCategory::Others => &self.others,
        }
    }

    pub fn counts(&self) -> FileCounts {
        FileCounts {
            photos: self.photos.len(),
            videos: self.videos.len(),
            documents: self.documents.len(),
            others: self.others.len(),
        }
    }

    /// Copy of the catalog holding only files whose name contains `term`
    ///
    /// Matching is case-insensitive; a blank term keeps everything.
    ///
    /// # Example
    ///
    /// ```rust
    /// use devscope_core::files::{FileCatalog, FileItem};
    ///
    /// let catalog = FileCatalog {
    ///     photos: vec![
    ///         FileItem { name: "IMG_0001.jpg".into(), url: String::new() },
    ///         FileItem { name: "Screenshot.png".into(), url: String::new() },
    ///     ],
    ///     ..Default::default()
    /// };
    /// assert_eq!(catalog.search("img").counts().photos, 1);
    /// ```
    pub fn search(&self, term: &str) -> FileCatalog {
        let needle = term.trim().to_lowercase();
        let keep = |items: &[FileItem]| -> Vec<FileItem> {
            items
                .iter()
                .filter(|item| needle.is_empty() || item.name_contains(&needle))
                .cloned()
                .collect()
        };

        FileCatalog {
            photos: keep(&self.photos),
            videos: keep(&self.videos),
            documents: keep(&self.documents),
            others: keep(&self.others),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> FileCatalog {
        serde_json::from_value(json!({
            "photos": [
                {"name": "IMG_2024.jpg", "url": "/files/download?path=%2Fsdcard%2FDCIM%2FIMG_2024.jpg"},
                {"name": "cat.png", "url": "/files/download?path=%2Fsdcard%2FPictures%2Fcat.png"}
            ],
            "videos": [{"name": "VID_img.mp4", "url": "/files/download?path=%2Fsdcard%2FVID_img.mp4"}],
            "documents": [{"name": "contract.pdf", "url": "/files/download?path=%2Fsdcard%2Fcontract.pdf"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_missing_category_defaults_empty() {
        let catalog = catalog();
        assert!(catalog.others.is_empty());
        assert_eq!(
            catalog.counts(),
            FileCounts {
                photos: 2,
                videos: 1,
                documents: 1,
                others: 0
            }
        );
        assert_eq!(catalog.counts().total(), 4);
    }

    #[test]
    fn test_search_across_categories() {
        let found = catalog().search("IMG");
        assert_eq!(found.photos.len(), 1);
        assert_eq!(found.videos.len(), 1);
        assert!(found.documents.is_empty());
        assert_eq!(catalog().search("  ").counts().total(), 4);
    }

    #[test]
    fn test_device_path_decoded() {
        let catalog = catalog();
        assert_eq!(
            catalog.photos[0].device_path().as_deref(),
            Some("/sdcard/DCIM/IMG_2024.jpg")
        );
        let bare = FileItem {
            name: "x".into(),
            url: "/files/download".into(),
        };
        assert!(bare.device_path().is_none());
    }

    #[test]
    fn test_category_names() {
        assert_eq!(FileCategory::from_name("Images"), Some(FileCategory::Photos));
        assert_eq!(FileCategory::from_name("others"), Some(FileCategory::Others));
        assert!(FileCategory::from_name("music").is_none());
        for category in FileCategory::ALL {
            assert_eq!(FileCategory::from_name(category.as_str()), Some(category));
        }
    }
}
