use serde::Serialize;

/// Which downstream decoder a playable source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    /// Encrypted delivery API (RPM Share)
    Primary,
    /// Third-party web player (Videa)
    Secondary,
}

/// Identifier recovered from a content page, tagged by decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayableSource {
    /// Opaque video id consumed by the delivery API
    Primary { token: String },
    /// Embed id consumed directly as a web player URL
    Secondary { embed_id: String },
}

impl PlayableSource {
    pub fn primary(token: impl Into<String>) -> Self {
        Self::Primary {
            token: token.into(),
        }
    }

    pub fn secondary(embed_id: impl Into<String>) -> Self {
        Self::Secondary {
            embed_id: embed_id.into(),
        }
    }

    pub fn decoder(&self) -> DecoderKind {
        match self {
            Self::Primary { .. } => DecoderKind::Primary,
            Self::Secondary { .. } => DecoderKind::Secondary,
        }
    }
}

impl std::fmt::Display for PlayableSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary { token } => write!(f, "primary:{}", token),
            Self::Secondary { embed_id } => write!(f, "secondary:{}", embed_id),
        }
    }
}

/// How a variant URL must be played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// HLS playlist, playable by a raw media player
    Hls,
    /// Web player page, needs a web view
    Web,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamVariant {
    pub url: String,
    pub quality_label: String,
    pub container_kind: ContainerKind,
}

impl StreamVariant {
    pub fn is_directly_embeddable(&self) -> bool {
        self.container_kind != ContainerKind::Web
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleTrack {
    pub url: String,
    #[serde(rename = "lang")]
    pub language_code: String,
}

/// Final pipeline output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamBundle {
    pub title: String,
    pub decoder: DecoderKind,
    pub variants: Vec<StreamVariant>,
    pub subtitles: Vec<SubtitleTrack>,
}

impl StreamBundle {
    /// Copy of this bundle carrying `title`
    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self
        }
    }
}
