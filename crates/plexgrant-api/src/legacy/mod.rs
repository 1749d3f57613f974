// Legacy XML endpoint
//
// plex.tv's share-era endpoints predate its JSON API and still answer XML.
// The one surface this crate needs from them is section enumeration:
// `GET /api/servers/{owner}` is the only place that returns a server's
// sections with *both* identifier spaces (plex.tv numeric id and server
// section key) in a single response.

pub mod client;
pub mod models;

pub use client::LegacyClient;
pub use models::SectionRecord;
