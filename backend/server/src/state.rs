use std::sync::Arc;

use tokio::sync::Mutex;

use super::{abacus::AbacusBox, config::Config, error::AppError};

pub struct AppState {
    pub config: Config,
    abacus: Mutex<AbacusBox>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Arc<Self>, AppError> {
        let abacus = AbacusBox::init(config.base)?;

        Ok(Arc::new(Self {
            config,
            abacus: Mutex::new(abacus),
        }))
    }

    /// Runs `operation` with the box locked for its whole duration.
    pub async fn with_abacus<R>(&self, operation: impl FnOnce(&mut AbacusBox) -> R) -> R {
        let mut abacus = self.abacus.lock().await;

        operation(&mut abacus)
    }
}
