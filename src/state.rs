use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::services::ItemService;

/// Shared handles threaded through the router. Both fields sit behind trait
/// objects (directly or via the service), so tests can assemble a state with
/// an in-memory store and a stub identity provider.
#[derive(Clone)]
pub struct AppState {
    pub items: Arc<ItemService>,
    pub identity: Arc<dyn IdentityProvider>,
}
