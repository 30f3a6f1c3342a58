//! Handler contracts, built-in handlers and their registries
//!
//! A handler wraps one external site. Streaming services implement
//! [`ServiceHandler`]; metadata sites implement [`InfoHandler`]. Both embed
//! a [`HandlerBase`] carrying the key, display name, write-once config and
//! the handler's own [`Fetcher`](crate::fetch::Fetcher).
//!
//! ## Key Components
//!
//! - [`Handlers`] - both registries, built once at startup
//! - [`Registry`] - lazy key to instance map for one family
//! - [`HandlerBase`] - shared handler state and request building
//! - [`RequestOptions`] - per-call user agent, proxy and auth overrides
//!
//! ## Example
//!
//! ```rust,no_run
//! use showfetch::config::Config;
//! use showfetch::handlers::{Handlers, RequestOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let handlers = Handlers::setup(&config)?;
//!
//! if let Some(crunchyroll) = handlers.service(Some("crunchyroll")) {
//!     let latest = crunchyroll
//!         .get_latest_episode("spice-and-wolf", &RequestOptions::default())
//!         .await;
//!     println!("{:?}", latest);
//! }
//! # Ok(())
//! # }
//! ```

mod base;
pub mod info;
mod registry;
pub mod stream;
mod traits;
pub(crate) mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use base::{HandlerBase, HandlerContext};
pub use registry::{Factory, Family, Handlers, Registry};
pub use traits::{Handler, HandlerError, InfoHandler, RequestOptions, ServiceHandler};
pub use types::{
    Episode, Link, Season, SeasonName, SeasonNameError, Show, ShowType, Stream, UnprocessedShow,
    UnprocessedStream,
};
