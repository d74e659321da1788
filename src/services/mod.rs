//! Resolution pipeline components
//!
//! Leaves first: `hex` and `cipher` back the delivery-provider client
//! (`rpm`); `tmdb`, `site` and `extractor` discover a playable source;
//! `playlist` and `assembler` turn it into streams; `pipeline` chains them.

pub mod assembler;
pub mod cipher;
pub mod extractor;
pub mod hex;
pub mod http;
pub mod metrics;
pub mod pipeline;
pub mod playlist;
pub mod rpm;
pub mod site;
pub mod stremio;
pub mod tmdb;

pub use pipeline::Pipeline;
