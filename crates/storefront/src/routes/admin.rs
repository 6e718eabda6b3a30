//! Admin panel: catalog management and order fulfilment.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Response},
};
use droidshop_core::{OrderId, OrderStatus, Price, ProductId};
use serde::Deserialize;
use tracing::instrument;

use super::notice_redirect;
use super::views::{OrderCard, ProductCard, Shell};
use crate::db::{OrderRepository, ProductRepository};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::RequireAdmin;
use crate::models::Product;
use crate::state::AppState;

const PRODUCTS_TAB: &str = "/admin?tab=products";
const ORDERS_TAB: &str = "/admin?tab=orders";

/// Which panel is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminTab {
    #[default]
    Products,
    Orders,
}

/// Admin page query.
#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    #[serde(default)]
    pub tab: AdminTab,
    pub notice: Option<String>,
}

/// Status change form.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Admin panel template.
#[derive(Template, WebTemplate)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub shell: Shell,
    pub show_orders: bool,
    pub uploads_enabled: bool,
    pub products: Vec<ProductCard>,
    pub orders: Vec<OrderCard>,
}

/// Display the admin panel.
#[instrument(skip(state, current, query), fields(tab = ?query.tab))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdmin { current, .. }: RequireAdmin,
    Query(query): Query<AdminQuery>,
) -> Result<impl IntoResponse, AppError> {
    let catalog = ProductRepository::new(state.store()).all().await?;
    let orders = OrderRepository::new(state.store()).all().await?;

    Ok(AdminTemplate {
        shell: Shell::new("Admin Dashboard", &current, query.notice),
        show_orders: query.tab == AdminTab::Orders,
        uploads_enabled: state.images().is_configured(),
        products: ProductCard::from_catalog(&catalog),
        orders: OrderCard::newest_first(&orders),
    })
}

/// Fields of the add-product form.
#[derive(Debug, Default)]
struct NewProductForm {
    name: String,
    price: String,
    description: String,
    image_name: String,
    image: Vec<u8>,
}

fn bad_multipart(err: &axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

async fn read_product_form(multipart: &mut Multipart) -> Result<NewProductForm, AppError> {
    let mut form = NewProductForm::default();
    while let Some(field) = multipart.next_field().await.map_err(|e| bad_multipart(&e))? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "name" => form.name = field.text().await.map_err(|e| bad_multipart(&e))?,
            "price" => form.price = field.text().await.map_err(|e| bad_multipart(&e))?,
            "desc" => form.description = field.text().await.map_err(|e| bad_multipart(&e))?,
            "image" => {
                form.image_name = field.file_name().unwrap_or("upload").to_owned();
                form.image = field.bytes().await.map_err(|e| bad_multipart(&e))?.to_vec();
            }
            other => tracing::debug!(field = other, "Ignoring unknown form field"),
        }
    }
    Ok(form)
}

async fn create_product(state: &AppState, multipart: &mut Multipart) -> Result<ProductId, AppError> {
    let form = read_product_form(multipart).await?;

    let name = form.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Please enter a product name".to_owned()));
    }
    let price = Price::parse(&form.price).map_err(|e| AppError::BadRequest(e.to_string()))?;
    // Whether the file is a usable image is for the host to decide.
    let image = state.images().upload(&form.image_name, form.image).await?;
    let product = Product {
        name: name.to_owned(),
        price,
        description: form.description.trim().to_owned(),
        image: image.to_string(),
    };
    Ok(ProductRepository::new(state.store()).add(&product).await?)
}

/// Upload the image, then add the product.
#[instrument(skip_all, fields(admin_id = %user.uid))]
pub async fn add_product(
    State(state): State<AppState>,
    RequireAdmin { user, .. }: RequireAdmin,
    mut multipart: Multipart,
) -> Response {
    match create_product(&state, &mut multipart).await {
        Ok(id) => {
            add_breadcrumb("admin", "Product added", Some(&[("product_id", id.as_str())]));
            notice_redirect(PRODUCTS_TAB, "Product added!").into_response()
        }
        Err(e) => {
            e.report();
            notice_redirect(PRODUCTS_TAB, &e.public_message()).into_response()
        }
    }
}

/// Delete a product.
#[instrument(skip(state, user), fields(admin_id = %user.uid))]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin { user, .. }: RequireAdmin,
    Path(id): Path<String>,
) -> Response {
    let Ok(id) = ProductId::parse(&id) else {
        return notice_redirect(PRODUCTS_TAB, "Unknown product").into_response();
    };

    match ProductRepository::new(state.store()).delete(&id).await {
        Ok(()) => notice_redirect(PRODUCTS_TAB, "Product deleted").into_response(),
        Err(e) => {
            let e = AppError::from(e);
            e.report();
            notice_redirect(PRODUCTS_TAB, &e.public_message()).into_response()
        }
    }
}

/// Set an order's status. Any transition is allowed.
#[instrument(skip(state, user), fields(admin_id = %user.uid))]
pub async fn set_order_status(
    State(state): State<AppState>,
    RequireAdmin { user, .. }: RequireAdmin,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Response {
    let (Ok(id), Ok(status)) = (OrderId::parse(&id), form.status.parse::<OrderStatus>()) else {
        return notice_redirect(ORDERS_TAB, "Invalid status update").into_response();
    };

    match OrderRepository::new(state.store())
        .update_status(&id, status)
        .await
    {
        Ok(()) => notice_redirect(ORDERS_TAB, &format!("Order #{} is now {status}", id.short()))
            .into_response(),
        Err(e) => {
            let e = AppError::from(e);
            e.report();
            notice_redirect(ORDERS_TAB, &e.public_message()).into_response()
        }
    }
}
