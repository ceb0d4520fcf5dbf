//! Menu read endpoints and the stock adjustment used by the kitchen.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::MenuItemId;
use domain::{Category, MenuItem};
use serde::{Deserialize, Serialize};
use store::{InventoryLedger, MenuQuery, OrderStore};

use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request / Response types --

#[derive(Debug, Default, Deserialize)]
pub struct MenuParams {
    pub category: Option<String>,
    /// `"true"` restricts the listing to available items.
    pub available: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustmentRequest {
    pub quantity: Option<i64>,
    pub operation: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemResponse {
    pub id: MenuItemId,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub stock: u32,
    pub category: &'static str,
    pub image: String,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MenuItem> for MenuItemResponse {
    fn from(item: MenuItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            price_cents: item.price.cents(),
            stock: item.stock,
            category: item.category.as_str(),
            image: item.image,
            is_available: item.is_available,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

impl StockAdjustmentRequest {
    /// Signed stock delta: positive releases stock, negative reserves it.
    fn delta(&self) -> Result<i64, ApiError> {
        let quantity = match self.quantity {
            Some(q) if q >= 1 => q,
            _ => {
                return Err(ApiError::BadRequest(
                    "Quantity must be a positive integer".to_string(),
                ));
            }
        };

        match self.operation.as_deref().map(str::trim) {
            Some("increase") => Ok(quantity),
            Some("decrease") => Ok(-quantity),
            _ => Err(ApiError::BadRequest(
                "Operation must be either increase or decrease".to_string(),
            )),
        }
    }
}

// -- Handlers --

/// GET /api/menu: lists menu items by category, then name.
pub async fn list<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
    Query(params): Query<MenuParams>,
) -> Result<Json<Vec<MenuItemResponse>>, ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let mut query = MenuQuery::new();
    if let Some(raw) = params.category.as_deref().filter(|c| !c.is_empty()) {
        let category: Category = raw
            .parse()
            .map_err(|e: domain::MenuError| ApiError::BadRequest(e.to_string()))?;
        query = query.category(category);
    }
    if params.available.as_deref() == Some("true") {
        query = query.available_only();
    }

    let items = state.engine.list_menu_items(query).await?;
    Ok(Json(items.into_iter().map(MenuItemResponse::from).collect()))
}

/// GET /api/menu/categories/list: categories that currently have items.
pub async fn categories<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
) -> Result<Json<Vec<&'static str>>, ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let categories = state.engine.list_categories().await?;
    Ok(Json(categories.iter().map(Category::as_str).collect()))
}

/// GET /api/menu/{id}: gets a single menu item.
pub async fn get<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
    Path(id): Path<String>,
) -> Result<Json<MenuItemResponse>, ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let id: MenuItemId = parse_id(&id, "menu item")?;
    let item = state.engine.get_menu_item(id).await?;
    Ok(Json(item.into()))
}

/// PATCH /api/menu/{id}/stock: adds or removes stock by hand.
pub async fn adjust_stock<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
    Path(id): Path<String>,
    payload: Result<Json<StockAdjustmentRequest>, JsonRejection>,
) -> Result<Json<MenuItemResponse>, ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let id: MenuItemId = parse_id(&id, "menu item")?;
    let Json(req) = payload?;
    let delta = req.delta()?;

    let item = state.engine.adjust_stock(id, delta).await?;
    Ok(Json(item.into()))
}
