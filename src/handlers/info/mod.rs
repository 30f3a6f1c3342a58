//! Built-in metadata sites

mod anidb;
mod mal;

pub use anidb::AniDb;
pub use mal::MyAnimeList;

use std::sync::Arc;

use super::base::HandlerContext;
use super::traits::InfoHandler;

/// Every known info handler
pub fn all(ctx: &HandlerContext) -> Vec<Arc<dyn InfoHandler>> {
    let handlers: Vec<Arc<dyn InfoHandler>> =
        vec![Arc::new(MyAnimeList::new(ctx)), Arc::new(AniDb::new(ctx))];
    handlers
}
