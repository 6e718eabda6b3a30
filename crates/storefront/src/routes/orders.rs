//! Order history for the signed-in visitor.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use tracing::instrument;

use super::NoticeQuery;
use super::views::{OrderCard, Shell};
use crate::db::OrderRepository;
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Orders page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders.html")]
pub struct OrdersTemplate {
    pub shell: Shell,
    pub orders: Vec<OrderCard>,
}

/// Display the visitor's orders, newest first.
#[instrument(skip(state, current, user, query), fields(user_id = %user.uid))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth { current, user }: RequireAuth,
    Query(query): Query<NoticeQuery>,
) -> Result<impl IntoResponse, AppError> {
    let orders = OrderRepository::new(state.store()).for_user(&user.uid).await?;
    let shell = Shell::new("My Orders", &current, query.notice);

    Ok(OrdersTemplate {
        shell,
        orders: OrderCard::newest_first(orders.iter().map(|(id, order)| (id, order))),
    })
}
