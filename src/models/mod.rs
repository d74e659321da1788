pub mod media;
pub mod stremio;
pub mod stream;

pub use media::{EpisodeInfo, MediaInfo, MediaKind, StreamRequest};
pub use stremio::{
    Manifest, ManifestBehaviorHints, ProxyHeaders, StreamBehaviorHints, StreamsResponse,
    StremioStream,
};
pub use stream::{
    ContainerKind, DecoderKind, PlayableSource, StreamBundle, StreamVariant, SubtitleTrack,
};
