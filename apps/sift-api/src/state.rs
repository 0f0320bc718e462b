use std::sync::Arc;

use sift_config::Config;
use sift_service::{Providers, SiftService};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SiftService>,
}
impl AppState {
	pub fn new(config: Config) -> Self {
		Self { service: Arc::new(SiftService::new(config)) }
	}

	pub fn with_providers(config: Config, providers: Providers) -> Self {
		Self { service: Arc::new(SiftService::with_providers(config, providers)) }
	}
}
