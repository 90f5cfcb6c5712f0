use std::sync::Arc;

use axum::response::{IntoResponse as _, Response};
use bookshelf_dal::Pool;
use http::StatusCode;

use crate::render::{JsonRenderer, Renderer, View};

pub const DEFAULT_PAGE_SIZE: u32 = 8;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: Pool) -> Self {
        Self::with_renderer(app_config, pool, JsonRenderer)
    }

    pub fn with_renderer(
        app_config: AppConfig,
        pool: Pool,
        renderer: impl Renderer + 'static,
    ) -> Self {
        AppState {
            state: Arc::new(AppStateInner {
                app_config,
                pool,
                renderer: Box::new(renderer),
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn pool(&self) -> &Pool {
        &self.state.pool
    }

    pub fn render(&self, view: View, status: StatusCode, data: serde_json::Value) -> Response {
        (status, self.state.renderer.render(view, data)).into_response()
    }
}

struct AppStateInner {
    pool: Pool,
    app_config: AppConfig,
    renderer: Box<dyn Renderer>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub page_size: u32,
    /// Hides error details from rendered error pages
    pub production: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            page_size: DEFAULT_PAGE_SIZE,
            production: false,
        }
    }
}
