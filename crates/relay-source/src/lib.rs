//! HTTP notification gateway client.
//!
//! The gateway exposes the filesystem's inotify log over two endpoints:
//!
//! - `GET /v1/inotify/tip` returns `{"txid": n}`, the newest transaction id.
//! - `GET /v1/inotify/events?after=n&waitMs=ms` long-polls for the next
//!   batch after `n`. `200` carries `{"txid", "events"}`, `204` means the
//!   wait elapsed, `410` means the history after `n` was pruned.
//!
//! [`HttpEventSource`] maps those onto [`relay_types::EventSource`]:
//! `5xx` and transport failures are transient, `410` is a gap, and anything
//! else unexpected is a protocol error.

mod client;
mod error;
mod wire;

pub use client::{HttpEventSource, HttpStream, SourceSettings};
pub use error::SourceBuildError;
