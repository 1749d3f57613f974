// plexgrant-api: Async Rust client for the plex.tv sharing APIs (legacy XML + JSON)

pub mod account;
pub mod client;
pub mod error;
pub mod invites;
pub mod legacy;
pub mod settings;
pub mod shares;
pub mod transport;

pub use client::PlexTvClient;
pub use error::Error;
pub use legacy::LegacyClient;
