//! Shared application state for all routes.

use crate::config::AppConfig;
use crate::store::{DeveloperStore, UserStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub developers: Arc<dyn DeveloperStore>,
    pub users: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(developers: Arc<dyn DeveloperStore>, users: Arc<dyn UserStore>, config: AppConfig) -> Self {
        AppState {
            developers,
            users,
            config: Arc::new(config),
        }
    }
}
