use thiserror::Error;

use crate::cache::CacheError;
use crate::generation::GenerationError;
use crate::gps::GpsError;
use crate::providers::ProviderError;
use crate::resource::ResourceError;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error(transparent)]
    Gps(#[from] GpsError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}
