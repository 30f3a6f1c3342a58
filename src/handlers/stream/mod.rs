//! Built-in streaming services

mod crunchyroll;
mod funimation;

pub use crunchyroll::Crunchyroll;
pub use funimation::Funimation;

use std::sync::Arc;

use super::base::HandlerContext;
use super::traits::ServiceHandler;

/// Every known service handler
pub fn all(ctx: &HandlerContext) -> Vec<Arc<dyn ServiceHandler>> {
    let handlers: Vec<Arc<dyn ServiceHandler>> = vec![
        Arc::new(Crunchyroll::new(ctx)),
        Arc::new(Funimation::new(ctx)),
    ];
    handlers
}
