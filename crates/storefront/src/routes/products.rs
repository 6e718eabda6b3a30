//! Product detail and add-to-cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use droidshop_core::ProductId;
use tracing::instrument;

use super::views::{ProductCard, Shell};
use super::{NoticeQuery, notice_redirect};
use crate::db::{CartRepository, ProductRepository};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::{CurrentSession, RequireAuth};
use crate::state::AppState;

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "product.html")]
pub struct ProductTemplate {
    pub shell: Shell,
    pub product: ProductCard,
}

fn product_id(raw: &str) -> Result<ProductId, AppError> {
    ProductId::parse(raw).map_err(|_| AppError::NotFound(format!("product {raw}")))
}

/// Display one product.
#[instrument(skip(state, current, query))]
pub async fn show(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<String>,
    Query(query): Query<NoticeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let id = product_id(&id)?;
    let product = ProductRepository::new(state.store())
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let shell = Shell::new("Details", &current, query.notice)
        .with_cart_link(&state, &current)
        .await?;

    Ok(ProductTemplate {
        shell,
        product: ProductCard::new(&id, &product),
    })
}

/// Add a product to the visitor's cart. Adding it again overwrites the
/// entry.
#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    RequireAuth { user, .. }: RequireAuth,
    Path(id): Path<String>,
) -> Response {
    let back = format!("/product/{id}");
    let result = async {
        let id = product_id(&id)?;
        let product = ProductRepository::new(state.store())
            .get(&id)
            .await?
            .ok_or_else(|| AppError::NotFound("That product is no longer available".to_owned()))?;
        CartRepository::new(state.store())
            .add_entry(&user.uid, &id, &product)
            .await?;
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
        Ok::<_, AppError>(())
    }
    .await;

    match result {
        Ok(()) => notice_redirect(&back, "Added to cart!").into_response(),
        Err(AppError::NotFound(_)) => {
            notice_redirect("/", "That product is no longer available").into_response()
        }
        Err(e) => {
            e.report();
            notice_redirect(&back, &e.public_message()).into_response()
        }
    }
}

