use serde::{Deserialize, Serialize};

/// Wire payload returned by `GET /api/projects`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsPayload {
    pub ok: bool,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A project entry as served to the frontend. Read-only input; the backend
/// flattens the studio document shape into this before it goes on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub slug: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub thumbnail: Option<ThumbnailField>,
}

impl Project {
    pub fn has_identity(&self) -> bool {
        !self.id.trim().is_empty()
    }

    /// Identifier used to tag and locate this project's page section:
    /// the slug when present, else the raw document id.
    pub fn scroll_target(&self) -> Option<&str> {
        self.slug
            .as_deref()
            .filter(|slug| !slug.is_empty())
            .or_else(|| (!self.id.is_empty()).then_some(self.id.as_str()))
    }

    pub fn effective_thumbnail(&self) -> Option<&MediaItem> {
        self.thumbnail.as_ref().and_then(ThumbnailField::effective)
    }
}

/// The studio schema historically allowed both a single media object and an
/// ordered gallery for the thumbnail field, so stored documents still carry
/// either shape. Deserialization settles it once; nothing downstream
/// re-inspects raw JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThumbnailField {
    Gallery(Vec<Option<MediaItem>>),
    Single(MediaItem),
}

impl ThumbnailField {
    /// First populated entry wins; later gallery entries are ignored.
    pub fn effective(&self) -> Option<&MediaItem> {
        match self {
            Self::Gallery(entries) => entries.iter().flatten().next(),
            Self::Single(item) => Some(item),
        }
    }
}

/// One media value attached to a project. Unrecognized `_type` tags map to
/// `Unknown` rather than failing the whole document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum MediaItem {
    #[serde(rename = "image")]
    Image {
        asset: Option<AssetRef>,
        #[serde(skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
    #[serde(rename = "video")]
    Video { asset: Option<AssetRef> },
    #[serde(other)]
    Unknown,
}

impl MediaItem {
    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video { .. })
    }

    /// The opaque asset reference, when present and non-empty.
    pub fn asset_ref(&self) -> Option<&str> {
        match self {
            Self::Image { asset, .. } | Self::Video { asset } => {
                asset.as_ref().and_then(AssetRef::reference)
            }
            Self::Unknown => None,
        }
    }
}

/// Reference to a stored asset in the content backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(rename = "_ref", skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
}

impl AssetRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
        }
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref().filter(|value| !value.is_empty())
    }
}

/// Aspect ratios the thumbnail grid supports, passed through to CSS untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AspectRatio {
    SixteenNine,
    FourThree,
    Square,
    ThreeFour,
    NineSixteen,
    FourFive,
}

impl AspectRatio {
    pub fn as_css(self) -> &'static str {
        match self {
            Self::SixteenNine => "16/9",
            Self::FourThree => "4/3",
            Self::Square => "1/1",
            Self::ThreeFour => "3/4",
            Self::NineSixteen => "9/16",
            Self::FourFive => "4/5",
        }
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::FourFive
    }
}
