use std::fmt;
use std::str::FromStr;

/// Framing requested for a photosession
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    /// 9:16
    #[default]
    Vertical,
    /// 16:9
    Horizontal,
    /// Let the model choose
    Any,
}

impl Orientation {
    fn aspect_hint(self) -> Option<&'static str> {
        match self {
            Self::Vertical => Some("vertical aspect ratio, 9:16"),
            Self::Horizontal => Some("horizontal aspect ratio, 16:9"),
            Self::Any => None,
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vertical" => Ok(Self::Vertical),
            "horizontal" => Ok(Self::Horizontal),
            "any" | "square" => Ok(Self::Any),
            other => Err(format!("unknown orientation '{other}'")),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertical => "vertical",
            Self::Horizontal => "horizontal",
            Self::Any => "any",
        })
    }
}

const PHOTOSESSION_SUFFIX: &str = "1080p resolution, high-end retouch, natural skin texture, \
     choose scene, light and composition to fit the style, \
     pick clothing and accessories that suit the location, \
     read gender and look from the face and dress accordingly, \
     premium fashion lighting, cinematic depth of field";

/// Instruction for a free-form prompt generation
pub fn prompt_text(prompt: &str, template: Option<&str>) -> String {
    match template.filter(|t| !t.is_empty()) {
        Some(template) => format!("{template}: {prompt}"),
        None => prompt.to_owned(),
    }
}

/// Instruction for a styled photosession
///
/// A user prompt replaces the generic style description; the aspect hint
/// and quality suffix are always applied.
pub fn photosession_prompt(style: &str, prompt: Option<&str>, orientation: Orientation) -> String {
    let base = prompt
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map_or_else(|| format!("High-end realistic photoshoot in {style} style"), ToOwned::to_owned);

    match orientation.aspect_hint() {
        Some(hint) => format!("{hint}, {base}, {PHOTOSESSION_SUFFIX}"),
        None => format!("{base}, {PHOTOSESSION_SUFFIX}"),
    }
}
