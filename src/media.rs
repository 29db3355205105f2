use crate::model::{MediaItem, Project};
use std::fmt;

/// Location of the content CDN that serves uploaded assets.
#[derive(Clone, Debug, PartialEq)]
pub struct CdnConfig {
    base_url: String,
    project_id: String,
    dataset: String,
}

impl CdnConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://cdn.sanity.io";

    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            project_id: project_id.into(),
            dataset: dataset.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Why a thumbnail could not be resolved to a usable URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaError {
    MissingAssetRef,
    MalformedAssetRef,
    UnsupportedMediaType,
}

impl MediaError {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingAssetRef => "media asset reference is missing",
            Self::MalformedAssetRef => "media asset reference is malformed",
            Self::UnsupportedMediaType => "media type is not renderable",
        }
    }
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of resolving a project's thumbnail field. `Absent` (no thumbnail
/// at all) is deliberately distinct from a resolution error; callers that
/// only want a source string can collapse both through [`ResolvedMedia::url`].
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedMedia {
    Absent,
    Image { url: String },
    Video { url: String },
}

impl ResolvedMedia {
    pub fn is_video(&self) -> bool {
        matches!(self, Self::Video { .. })
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Absent => "",
            Self::Image { url } | Self::Video { url } => url,
        }
    }
}

/// Resolves the media URL for a project's thumbnail.
///
/// An explicit `override_url` is returned verbatim; the media kind is still
/// derived from the underlying thumbnail, never from the override.
pub fn resolve_media(
    config: &CdnConfig,
    project: &Project,
    override_url: Option<&str>,
) -> Result<ResolvedMedia, MediaError> {
    let Some(media) = project.effective_thumbnail() else {
        return Ok(match override_url {
            Some(url) => ResolvedMedia::Image {
                url: url.to_string(),
            },
            None => ResolvedMedia::Absent,
        });
    };

    if let Some(url) = override_url {
        let url = url.to_string();
        return Ok(if media.is_video() {
            ResolvedMedia::Video { url }
        } else {
            ResolvedMedia::Image { url }
        });
    }

    match media {
        MediaItem::Video { asset } => {
            let reference = asset
                .as_ref()
                .and_then(|asset| asset.reference())
                .ok_or(MediaError::MissingAssetRef)?;
            Ok(ResolvedMedia::Video {
                url: video_url(config, reference)?,
            })
        }
        MediaItem::Image { .. } => Ok(ResolvedMedia::Image {
            url: url_for(config, media).auto_format().url()?,
        }),
        MediaItem::Unknown => Err(MediaError::UnsupportedMediaType),
    }
}

/// Stable render key for a media element, so the host framework can tell
/// successive video sources apart on the same card. Falls back to the
/// project id when the media carries no asset identity.
pub fn media_render_key(media: Option<&MediaItem>, fallback: &str) -> String {
    match media.and_then(MediaItem::asset_ref) {
        Some(reference) => format!("video-{reference}"),
        None => format!("video-{fallback}"),
    }
}

/// Starts a chainable image URL builder for the given media item, mirroring
/// the CDN's transform query API.
pub fn url_for<'a>(config: &'a CdnConfig, media: &'a MediaItem) -> ImageUrlBuilder<'a> {
    ImageUrlBuilder {
        config,
        media,
        width: None,
        height: None,
        auto_format: false,
    }
}

pub struct ImageUrlBuilder<'a> {
    config: &'a CdnConfig,
    media: &'a MediaItem,
    width: Option<u32>,
    height: Option<u32>,
    auto_format: bool,
}

impl ImageUrlBuilder<'_> {
    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    /// Lets the CDN pick the delivery format (webp where supported).
    pub fn auto_format(mut self) -> Self {
        self.auto_format = true;
        self
    }

    pub fn url(&self) -> Result<String, MediaError> {
        let reference = self.media.asset_ref().ok_or(MediaError::MissingAssetRef)?;
        let image = parse_image_ref(reference)?;

        let mut url = format!(
            "{}/images/{}/{}/{}-{}.{}",
            self.config.base_url,
            self.config.project_id,
            self.config.dataset,
            image.id,
            image.dimensions,
            image.format,
        );

        let mut params: Vec<String> = Vec::new();
        if let Some(width) = self.width {
            params.push(format!("w={width}"));
        }
        if let Some(height) = self.height {
            params.push(format!("h={height}"));
        }
        if self.auto_format {
            params.push("auto=format".to_string());
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        Ok(url)
    }
}

/// Resolves a stored file reference (`file-<id>-<format>`) to a directly
/// playable CDN URL.
pub fn video_url(config: &CdnConfig, reference: &str) -> Result<String, MediaError> {
    let (id, format) = parse_file_ref(reference)?;
    Ok(format!(
        "{}/files/{}/{}/{}.{}",
        config.base_url, config.project_id, config.dataset, id, format,
    ))
}

struct ImageRef<'a> {
    id: &'a str,
    dimensions: &'a str,
    format: &'a str,
}

// Image references look like `image-<id>-<width>x<height>-<format>`.
fn parse_image_ref(reference: &str) -> Result<ImageRef<'_>, MediaError> {
    let rest = reference
        .strip_prefix("image-")
        .ok_or(MediaError::MalformedAssetRef)?;

    let mut parts = rest.rsplitn(3, '-');
    let format = parts.next().ok_or(MediaError::MalformedAssetRef)?;
    let dimensions = parts.next().ok_or(MediaError::MalformedAssetRef)?;
    let id = parts.next().ok_or(MediaError::MalformedAssetRef)?;

    if id.is_empty() || format.is_empty() || !is_dimension_pair(dimensions) {
        return Err(MediaError::MalformedAssetRef);
    }

    Ok(ImageRef {
        id,
        dimensions,
        format,
    })
}

fn is_dimension_pair(value: &str) -> bool {
    let Some((width, height)) = value.split_once('x') else {
        return false;
    };

    !width.is_empty()
        && !height.is_empty()
        && width.bytes().all(|byte| byte.is_ascii_digit())
        && height.bytes().all(|byte| byte.is_ascii_digit())
}

fn parse_file_ref(reference: &str) -> Result<(&str, &str), MediaError> {
    let rest = reference
        .strip_prefix("file-")
        .ok_or(MediaError::MalformedAssetRef)?;
    let (id, format) = rest.rsplit_once('-').ok_or(MediaError::MalformedAssetRef)?;

    if id.is_empty() || format.is_empty() {
        return Err(MediaError::MalformedAssetRef);
    }

    Ok((id, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssetRef, ThumbnailField};

    fn config() -> CdnConfig {
        CdnConfig::new("f6mhnkv2", "production")
    }

    fn image_item(reference: &str) -> MediaItem {
        MediaItem::Image {
            asset: Some(AssetRef::new(reference)),
            alt: None,
        }
    }

    fn video_item(reference: &str) -> MediaItem {
        MediaItem::Video {
            asset: Some(AssetRef::new(reference)),
        }
    }

    fn project_with(thumbnail: Option<ThumbnailField>) -> Project {
        Project {
            id: "doc-1".to_string(),
            slug: None,
            title: None,
            summary: None,
            thumbnail,
        }
    }

    #[test]
    fn image_ref_resolves_to_cdn_url() {
        let url = url_for(&config(), &image_item("image-a1b2c3-1200x800-jpg"))
            .url()
            .expect("well-formed reference resolves");

        assert_eq!(
            url,
            "https://cdn.sanity.io/images/f6mhnkv2/production/a1b2c3-1200x800.jpg"
        );
    }

    #[test]
    fn image_builder_appends_transform_params() {
        let url = url_for(&config(), &image_item("image-a1b2c3-1200x800-jpg"))
            .width(640)
            .height(480)
            .auto_format()
            .url()
            .expect("well-formed reference resolves");

        assert_eq!(
            url,
            "https://cdn.sanity.io/images/f6mhnkv2/production/a1b2c3-1200x800.jpg?w=640&h=480&auto=format"
        );
    }

    #[test]
    fn malformed_image_refs_are_rejected() {
        for reference in [
            "a1b2c3-1200x800-jpg",
            "image-a1b2c3-jpg",
            "image--1200x800-jpg",
            "image-a1b2c3-1200x800-",
            "image-a1b2c3-wide-jpg",
            "image-a1b2c3-12x-jpg",
        ] {
            let result = url_for(&config(), &image_item(reference)).url();
            assert_eq!(
                result,
                Err(MediaError::MalformedAssetRef),
                "reference {reference:?} should be rejected"
            );
        }
    }

    #[test]
    fn file_ref_resolves_to_cdn_url() {
        let url = video_url(&config(), "file-a1b2c3-mp4").expect("well-formed reference resolves");
        assert_eq!(url, "https://cdn.sanity.io/files/f6mhnkv2/production/a1b2c3.mp4");
    }

    #[test]
    fn malformed_file_refs_are_rejected() {
        for reference in ["a1b2c3-mp4", "file-a1b2c3", "file--mp4", "file-a1b2c3-"] {
            assert_eq!(
                video_url(&config(), reference),
                Err(MediaError::MalformedAssetRef),
                "reference {reference:?} should be rejected"
            );
        }
    }

    #[test]
    fn custom_cdn_base_url_is_used() {
        let config = config().with_base_url("https://media.example.com/");
        let url = video_url(&config, "file-a1b2c3-webm").expect("resolves");
        assert_eq!(url, "https://media.example.com/files/f6mhnkv2/production/a1b2c3.webm");
    }

    #[test]
    fn no_thumbnail_resolves_to_absent() {
        let resolved = resolve_media(&config(), &project_with(None), None).expect("resolves");
        assert_eq!(resolved, ResolvedMedia::Absent);
        assert_eq!(resolved.url(), "");
    }

    #[test]
    fn gallery_first_populated_entry_is_resolved() {
        let thumbnail = ThumbnailField::Gallery(vec![
            None,
            Some(video_item("file-first-mp4")),
            Some(image_item("image-later-100x100-png")),
        ]);
        let project = project_with(Some(thumbnail));

        let resolved = resolve_media(&config(), &project, None).expect("resolves");
        assert!(resolved.is_video());
        assert_eq!(
            resolved.url(),
            "https://cdn.sanity.io/files/f6mhnkv2/production/first.mp4"
        );
    }

    #[test]
    fn gallery_without_populated_entries_is_absent() {
        let project = project_with(Some(ThumbnailField::Gallery(vec![None, None])));
        let resolved = resolve_media(&config(), &project, None).expect("resolves");
        assert_eq!(resolved, ResolvedMedia::Absent);
    }

    #[test]
    fn override_url_wins_over_any_thumbnail_shape() {
        let project = project_with(Some(ThumbnailField::Single(image_item(
            "image-a1b2c3-1200x800-jpg",
        ))));

        let resolved =
            resolve_media(&config(), &project, Some("https://example.com/custom.png")).expect("resolves");
        assert_eq!(resolved.url(), "https://example.com/custom.png");
        assert!(!resolved.is_video());
    }

    #[test]
    fn override_url_keeps_video_kind_from_thumbnail() {
        let project = project_with(Some(ThumbnailField::Single(video_item("file-a1b2c3-mp4"))));

        let resolved =
            resolve_media(&config(), &project, Some("https://example.com/reel.mp4")).expect("resolves");
        assert!(resolved.is_video());
        assert_eq!(resolved.url(), "https://example.com/reel.mp4");
    }

    #[test]
    fn video_without_asset_ref_is_a_missing_ref_error() {
        let project = project_with(Some(ThumbnailField::Single(MediaItem::Video {
            asset: None,
        })));

        assert_eq!(
            resolve_media(&config(), &project, None),
            Err(MediaError::MissingAssetRef)
        );
    }

    #[test]
    fn image_thumbnail_resolves_through_the_builder() {
        let media = image_item("image-a1b2c3-1200x800-jpg");
        let project = project_with(Some(ThumbnailField::Single(media.clone())));

        let resolved = resolve_media(&config(), &project, None).expect("resolves");
        assert!(!resolved.is_video());
        assert_eq!(
            resolved.url(),
            url_for(&config(), &media).auto_format().url().expect("builds"),
        );
    }

    #[test]
    fn unknown_media_is_unsupported() {
        let project = project_with(Some(ThumbnailField::Single(MediaItem::Unknown)));
        assert_eq!(
            resolve_media(&config(), &project, None),
            Err(MediaError::UnsupportedMediaType)
        );
    }

    #[test]
    fn render_key_prefers_asset_identity() {
        let media = video_item("file-a1b2c3-mp4");
        assert_eq!(media_render_key(Some(&media), "doc-1"), "video-file-a1b2c3-mp4");
        assert_eq!(
            media_render_key(Some(&MediaItem::Video { asset: None }), "doc-1"),
            "video-doc-1"
        );
        assert_eq!(media_render_key(None, "doc-1"), "video-doc-1");
    }
}
