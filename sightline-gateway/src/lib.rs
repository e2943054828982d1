//! Sightline Gateway - Remote Data Boundary
//!
//! The hosted backend is an external collaborator. This crate defines the
//! seam: the [`DataGateway`] RPC trait, strict decoding of its loosely
//! typed payloads into `sightline-core` shapes, the [`ChangeFeed`]
//! change-notification abstraction, and in-memory mocks for tests.

pub mod decode;
pub mod feed;
pub mod gateway;
pub mod mock;

pub use decode::{decode_consolidated, decode_regional, decode_trends};
pub use feed::{ChangeFeed, ChangeSubscription};
pub use gateway::{DataGateway, GatewayResult, HealthProbe, RawPayload};
pub use mock::{MockChangeFeed, MockGateway};
