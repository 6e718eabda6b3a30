//! Home page: the live catalog grid.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use tracing::instrument;

use super::NoticeQuery;
use super::views::{ProductCard, Shell};
use crate::db::ProductRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::CurrentSession;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub shell: Shell,
    pub products: Vec<ProductCard>,
}

/// Display the catalog.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    current: CurrentSession,
    Query(query): Query<NoticeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = ProductRepository::new(state.store()).all().await?;
    let shell = Shell::new("DroidShop", &current, query.notice)
        .with_cart_link(&state, &current)
        .await?;

    Ok(HomeTemplate {
        shell,
        products: ProductCard::from_catalog(&catalog),
    })
}
