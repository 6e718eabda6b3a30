//! Cart page, entry removal and checkout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use droidshop_core::ProductId;
use tracing::instrument;

use super::views::{CartView, Shell};
use super::{NoticeQuery, notice_redirect};
use crate::db::{CartRepository, OrderRepository, PlaceOrderError};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub shell: Shell,
    pub cart: CartView,
}

/// Display the visitor's cart.
#[instrument(skip(state, current, user, query), fields(user_id = %user.uid))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth { current, user }: RequireAuth,
    Query(query): Query<NoticeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let cart = CartRepository::new(state.store()).get(&user.uid).await?;
    Ok(CartTemplate {
        shell: Shell::new("My Cart", &current, query.notice),
        cart: CartView::from(&cart),
    })
}

/// Remove one product from the cart.
#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth { user, .. }: RequireAuth,
    Path(pid): Path<String>,
) -> Response {
    let Ok(pid) = ProductId::parse(&pid) else {
        return Redirect::to("/cart").into_response();
    };

    match CartRepository::new(state.store())
        .remove_entry(&user.uid, &pid)
        .await
    {
        Ok(()) => Redirect::to("/cart").into_response(),
        Err(e) => {
            let e = AppError::from(e);
            e.report();
            notice_redirect("/cart", &e.public_message()).into_response()
        }
    }
}

/// Place an order from the current cart. An empty cart places nothing.
#[instrument(skip(state, user), fields(user_id = %user.uid))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth { user, .. }: RequireAuth,
) -> Response {
    let cart = match CartRepository::new(state.store()).get(&user.uid).await {
        Ok(cart) => cart,
        Err(e) => {
            let e = AppError::from(e);
            e.report();
            return notice_redirect("/cart", &e.public_message()).into_response();
        }
    };
    if cart.is_empty() {
        return Redirect::to("/cart").into_response();
    }

    match OrderRepository::new(state.store()).place(&user.uid, &cart).await {
        Ok(order_id) => {
            add_breadcrumb("order", "Order placed", Some(&[("order_id", order_id.as_str())]));
            notice_redirect("/orders", "Order placed!").into_response()
        }
        Err(e) => {
            let target = match &e {
                PlaceOrderError::CartNotCleared { .. } => "/orders",
                PlaceOrderError::NotPlaced(_) => "/cart",
            };
            let e = AppError::from(e);
            e.report();
            notice_redirect(target, &e.public_message()).into_response()
        }
    }
}
