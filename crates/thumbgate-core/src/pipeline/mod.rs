//! Request pipeline stages.
//!
//! Each request runs strictly in order, stopping at the first failure:
//! - **decode**: parse the request URI into a `TransformDescriptor`
//! - **signature**: recompute and check the HMAC signature
//! - **resolve**: load the source (or placeholder), fit, persist
//! - **response**: map the outcome to 403 / 302 / 404
//!
//! `codec` and `hooks` are the resolver's injected collaborators.

pub mod codec;
pub mod decode;
pub mod hooks;
pub mod resolve;
pub mod response;
pub mod signature;

// Re-exports for convenient access
pub use codec::{fit_within, ImageCodec, ImageCrateCodec};
pub use decode::RequestDecoder;
pub use hooks::{NoopHooks, ThumbnailHooks};
pub use resolve::{ResolvedThumbnail, ThumbnailResolver};
pub use response::{ResponseMapper, ThumbnailResponse};
pub use signature::{Signer, SIGNATURE_HEX_LEN};
