//! The remote image processor the session talks to.

pub mod http_client;
pub mod preview;
pub mod types;

use async_trait::async_trait;

use crate::error::RetouchError;
use crate::session::Adjustments;

pub use http_client::HttpProcessor;
pub use types::{Histogram, ImageFile, ImageId, ImageInfo, OneShot, Preview, Variant};

/// Operations the session controller consumes. Every call may fail and may
/// suspend; the controller never issues two state-changing calls at once for
/// the same session.
#[async_trait]
pub trait RemoteProcessor: Send + Sync {
    /// Liveness probe used for the connectivity banner.
    async fn health(&self) -> Result<(), RetouchError>;

    async fn upload(&self, file: &ImageFile) -> Result<ImageInfo, RetouchError>;

    /// Render `adjustments` over the original and store it as the processed variant.
    async fn process(&self, id: &ImageId, adjustments: &Adjustments) -> Result<(), RetouchError>;

    async fn apply_one_shot(&self, id: &ImageId, op: &OneShot) -> Result<(), RetouchError>;

    async fn fetch_preview(&self, id: &ImageId, variant: Variant) -> Result<Preview, RetouchError>;

    async fn fetch_histogram(&self, id: &ImageId, variant: Variant)
        -> Result<Histogram, RetouchError>;

    /// Full-resolution bytes, used for export.
    async fn download(&self, id: &ImageId, variant: Variant) -> Result<Vec<u8>, RetouchError>;

    async fn delete(&self, id: &ImageId) -> Result<(), RetouchError>;
}
