use std::sync::Arc;

use marstrade_infra::TradeStore;

/// Shared handler state: the persistence seam behind every route.
pub struct AppServices {
    store: Arc<dyn TradeStore>,
}

impl AppServices {
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn TradeStore {
        self.store.as_ref()
    }
}
