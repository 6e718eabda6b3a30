//! Live fragments over server-sent events.
//!
//! Each endpoint opens a store listener when the browser connects and sends
//! a rendered fragment (named after the `sse-swap` target) for the current
//! value and after every change. Dropping the connection drops the listener.
//! Streams owned by a signed-in visitor also end when that visitor signs out.

use std::convert::Infallible;

use askama::Template;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, KeepAliveStream, Sse},
};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, future, stream};
use tracing::instrument;

use super::views::{CartView, OrderCard, ProductCard};
use crate::db::{CartRepository, Live, OrderRepository, ProductRepository};
use crate::error::AppError;
use crate::filters;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::AuthUser;
use crate::services::auth::SessionHandle;
use crate::state::AppState;

/// Catalog grid fragment.
#[derive(Template)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridFragment {
    pub products: Vec<ProductCard>,
}

/// Cart items fragment.
#[derive(Template)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsFragment {
    pub cart: CartView,
}

/// Order list fragment.
#[derive(Template)]
#[template(path = "partials/order_list.html")]
pub struct OrderListFragment {
    pub orders: Vec<OrderCard>,
}

/// Admin product table fragment.
#[derive(Template)]
#[template(path = "partials/admin_products.html")]
pub struct AdminProductsFragment {
    pub products: Vec<ProductCard>,
}

/// Admin order list fragment.
#[derive(Template)]
#[template(path = "partials/admin_orders.html")]
pub struct AdminOrdersFragment {
    pub orders: Vec<OrderCard>,
}

type EventStream = Sse<KeepAliveStream<BoxStream<'static, Result<Event, Infallible>>>>;

/// Render `template` as a named event.
fn fragment(name: &'static str, template: &impl Template) -> askama::Result<Event> {
    // SSE data lines cannot carry carriage returns.
    let html = template.render()?.replace('\r', "");
    Ok(Event::default().event(name).data(html))
}

/// Turn a live query into a stream of rendered events.
fn live_events<T, F>(live: Live<T>, render: F) -> impl Stream<Item = Result<Event, Infallible>> + Send
where
    T: Send + 'static,
    F: Fn(T) -> askama::Result<Vec<Event>> + Send + 'static,
{
    live.into_stream()
        .filter_map(move |delivery| {
            let events = match delivery {
                Ok(value) => match render(value) {
                    Ok(events) => Some(events),
                    Err(e) => {
                        AppError::from(e).report();
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Live fragment stopped");
                    None
                }
            };
            future::ready(events)
        })
        .flat_map(stream::iter)
        .map(Ok)
}

/// End `events` once `user` is no longer signed in on `handle`.
fn until_signed_out<S>(events: S, handle: SessionHandle, user: AuthUser) -> impl Stream<Item = S::Item> + Send
where
    S: Stream + Send,
{
    events.take_until(async move { handle.left(&user).await })
}

fn respond<S>(events: S) -> EventStream
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(events.boxed()).keep_alive(KeepAlive::default())
}

/// Live catalog grid.
#[instrument(skip_all)]
pub async fn products(State(state): State<AppState>) -> Result<EventStream, AppError> {
    let live = ProductRepository::new(state.store()).watch_all().await?;
    Ok(respond(live_events(live, |catalog| {
        let products = ProductCard::from_catalog(&catalog);
        Ok(vec![fragment("products", &ProductGridFragment { products })?])
    })))
}

/// Live cart items and badge count.
#[instrument(skip_all, fields(user_id = %user.uid))]
pub async fn cart(
    State(state): State<AppState>,
    RequireAuth { current, user }: RequireAuth,
) -> Result<EventStream, AppError> {
    let live = CartRepository::new(state.store()).watch(&user.uid).await?;
    let events = live_events(live, |cart| {
        let badge = Event::default().event("badge").data(cart.len().to_string());
        let items = fragment("cart", &CartItemsFragment {
            cart: CartView::from(&cart),
        })?;
        Ok(vec![items, badge])
    });
    Ok(respond(until_signed_out(events, current.handle, user)))
}

/// Live order list for the signed-in visitor.
#[instrument(skip_all, fields(user_id = %user.uid))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth { current, user }: RequireAuth,
) -> Result<EventStream, AppError> {
    let live = OrderRepository::new(state.store())
        .watch_for_user(&user.uid)
        .await?;
    let events = live_events(live, |orders| {
        let orders = OrderCard::newest_first(orders.iter().map(|(id, order)| (id, order)));
        Ok(vec![fragment("orders", &OrderListFragment { orders })?])
    });
    Ok(respond(until_signed_out(events, current.handle, user)))
}

/// Live admin product table.
#[instrument(skip_all, fields(admin_id = %user.uid))]
pub async fn admin_products(
    State(state): State<AppState>,
    RequireAdmin { current, user }: RequireAdmin,
) -> Result<EventStream, AppError> {
    let live = ProductRepository::new(state.store()).watch_all().await?;
    let events = live_events(live, |catalog| {
        let products = ProductCard::from_catalog(&catalog);
        Ok(vec![fragment("admin-products", &AdminProductsFragment { products })?])
    });
    Ok(respond(until_signed_out(events, current.handle, user)))
}

/// Live admin order list.
#[instrument(skip_all, fields(admin_id = %user.uid))]
pub async fn admin_orders(
    State(state): State<AppState>,
    RequireAdmin { current, user }: RequireAdmin,
) -> Result<EventStream, AppError> {
    let live = OrderRepository::new(state.store()).watch_all().await?;
    let events = live_events(live, |orders| {
        let orders = OrderCard::newest_first(&orders);
        Ok(vec![fragment("admin-orders", &AdminOrdersFragment { orders })?])
    });
    Ok(respond(until_signed_out(events, current.handle, user)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use droidshop_core::{Price, ProductId};

    use super::*;
    use crate::models::Product;

    #[test]
    fn test_product_grid_renders_cards() {
        let widget = Product {
            name: "Widget".to_owned(),
            price: Price::from_cents(999),
            description: "A widget".to_owned(),
            image: "https://i.ibb.co/widget.png".to_owned(),
        };
        let fragment = ProductGridFragment {
            products: vec![ProductCard::new(&ProductId::new("p1"), &widget)],
        };
        let html = fragment.render().unwrap();
        assert!(html.contains("Widget"));
        assert!(html.contains("$9.99"));
        assert!(html.contains("/product/p1"));
    }

    #[test]
    fn test_admin_product_rows_show_thumbnails() {
        let with_image = Product {
            name: "Viper Droid".to_owned(),
            price: Price::from_cents(1500),
            description: String::new(),
            image: "https://i.ibb.co/viper.png".to_owned(),
        };
        let without_image = Product {
            image: String::new(),
            ..with_image.clone()
        };
        let html = AdminProductsFragment {
            products: vec![ProductCard::new(&ProductId::new("p1"), &with_image)],
        }
        .render()
        .unwrap();
        assert!(html.contains("<img class=\"thumb\""));
        assert!(html.contains("viper.png"));
        assert!(html.contains("/admin/products/p1/delete"));

        let html = AdminProductsFragment {
            products: vec![ProductCard::new(&ProductId::new("p2"), &without_image)],
        }
        .render()
        .unwrap();
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_empty_order_list_renders_placeholder() {
        let html = OrderListFragment { orders: Vec::new() }.render().unwrap();
        assert!(html.contains("No orders yet"));
    }
}
