use std::path::PathBuf;

use crate::error::{MoodpaperError, MoodpaperResult};

pub type Rgb = [u8; 3];

/// One already-fetched source image; decoding happens inside the engine so a
/// bad buffer degrades to a blank slot instead of failing the request.
#[derive(Clone, Debug)]
pub struct SourceImage {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SourceImage {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ComposeRequest {
    /// Template name, or "auto" to let the catalog pick.
    #[serde(default = "default_template")]
    pub template: String,
    /// Explicit palette; when absent it is derived from the source images.
    #[serde(default)]
    pub palette: Option<Vec<Rgb>>,
    /// Colors per derived palette.
    #[serde(default = "default_color_count")]
    pub color_count: u32,
    #[serde(default)]
    pub title: Option<TitleOptions>,
    /// Filter name; unknown names fall back to the identity filter.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub stickers: Option<StickerOptions>,
    /// Album image opacity; below 255 the slot images blend toward white.
    #[serde(default = "default_opacity")]
    pub album_opacity: u8,
    #[serde(default)]
    pub border_width: u32,
    /// Defaults to palette[1].
    #[serde(default)]
    pub border_color: Option<Rgb>,
    /// Vertical gradient from palette[0] to palette[N-1] instead of a flat fill.
    #[serde(default)]
    pub gradient_background: bool,
    /// Seed for template auto-selection and sticker placement. None draws
    /// from OS entropy, which makes the output non-reproducible on purpose.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TitleOptions {
    pub text: String,
    #[serde(default = "default_title_size")]
    pub size: f32,
    /// Defaults to palette[1].
    #[serde(default)]
    pub color: Option<Rgb>,
    /// Path to a TTF/OTF file; falls back to the embedded face.
    #[serde(default)]
    pub font: Option<PathBuf>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StickerOptions {
    pub texts: Vec<String>,
    #[serde(default = "default_sticker_size")]
    pub size: f32,
    /// Rotation in degrees, shared by all stickers.
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_opacity")]
    pub opacity: u8,
}

fn default_template() -> String {
    "auto".to_string()
}

fn default_filter() -> String {
    "none".to_string()
}

fn default_color_count() -> u32 {
    5
}

fn default_opacity() -> u8 {
    255
}

fn default_title_size() -> f32 {
    64.0
}

fn default_sticker_size() -> f32 {
    96.0
}

impl Default for ComposeRequest {
    fn default() -> Self {
        Self {
            template: default_template(),
            palette: None,
            color_count: default_color_count(),
            title: None,
            filter: default_filter(),
            stickers: None,
            album_opacity: default_opacity(),
            border_width: 0,
            border_color: None,
            gradient_background: false,
            seed: None,
        }
    }
}

impl ComposeRequest {
    pub fn validate(&self) -> MoodpaperResult<()> {
        if self.template.trim().is_empty() {
            return Err(MoodpaperError::input("template must be non-empty"));
        }
        if self.filter.trim().is_empty() {
            return Err(MoodpaperError::input("filter must be non-empty"));
        }
        match &self.palette {
            Some(p) if p.len() < 2 => {
                return Err(MoodpaperError::input("palette must have at least 2 colors"));
            }
            Some(_) => {}
            None => {
                if self.color_count < 2 {
                    return Err(MoodpaperError::input("color_count must be >= 2"));
                }
            }
        }
        if let Some(t) = &self.title
            && (!t.size.is_finite() || t.size <= 0.0)
        {
            return Err(MoodpaperError::input("title size must be finite and > 0"));
        }
        if let Some(s) = &self.stickers {
            if !s.size.is_finite() || s.size <= 0.0 {
                return Err(MoodpaperError::input("sticker size must be finite and > 0"));
            }
            if !s.rotation.is_finite() {
                return Err(MoodpaperError::input("sticker rotation must be finite"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deserialize_from_empty_object() {
        let req: ComposeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req.template, "auto");
        assert_eq!(req.filter, "none");
        assert_eq!(req.color_count, 5);
        assert_eq!(req.album_opacity, 255);
        assert_eq!(req.border_width, 0);
        assert!(req.palette.is_none());
        assert!(req.seed.is_none());
    }

    #[test]
    fn json_roundtrip() {
        let req = ComposeRequest {
            template: "t1".to_string(),
            palette: Some(vec![[1, 2, 3], [4, 5, 6]]),
            title: Some(TitleOptions {
                text: "My Moodboard".to_string(),
                size: 72.0,
                color: None,
                font: None,
            }),
            stickers: Some(StickerOptions {
                texts: vec!["★".to_string(), "♪".to_string()],
                size: 96.0,
                rotation: 30.0,
                opacity: 200,
            }),
            seed: Some(7),
            ..ComposeRequest::default()
        };
        let s = serde_json::to_string_pretty(&req).unwrap();
        let de: ComposeRequest = serde_json::from_str(&s).unwrap();
        assert_eq!(de.template, "t1");
        assert_eq!(de.palette.as_ref().unwrap().len(), 2);
        assert_eq!(de.stickers.as_ref().unwrap().texts.len(), 2);
        assert_eq!(de.seed, Some(7));
    }

    #[test]
    fn validate_rejects_zero_color_count() {
        let req = ComposeRequest {
            color_count: 0,
            ..ComposeRequest::default()
        };
        assert!(matches!(req.validate(), Err(MoodpaperError::Input(_))));
    }

    #[test]
    fn validate_rejects_single_color_palette() {
        let req = ComposeRequest {
            palette: Some(vec![[0, 0, 0]]),
            ..ComposeRequest::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_rejects_nonfinite_sticker_rotation() {
        let req = ComposeRequest {
            stickers: Some(StickerOptions {
                texts: vec!["x".to_string()],
                size: 40.0,
                rotation: f32::NAN,
                opacity: 255,
            }),
            ..ComposeRequest::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn validate_accepts_explicit_palette_with_zero_color_count() {
        // color_count only matters when the palette is derived
        let req = ComposeRequest {
            palette: Some(vec![[0, 0, 0], [255, 255, 255]]),
            color_count: 0,
            ..ComposeRequest::default()
        };
        assert!(req.validate().is_ok());
    }
}
