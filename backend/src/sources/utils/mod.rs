pub mod http;
pub mod image;
pub mod provider_cache;
pub mod token_utils;

pub use http::*;
pub use image::*;
pub use provider_cache::*;
pub use token_utils::*;
