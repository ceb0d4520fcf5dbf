//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{MenuItemId, OrderId};
use domain::{
    CreateOrder, MenuItemSummary, OrderDetails, OrderLine, OrderLineRequest, OrderNumber,
    OrderStats, OrderStatus, PaymentMethod, StatusSummary, parse_pickup_time,
};
use engine::EngineError;
use serde::{Deserialize, Serialize};
use store::{InventoryLedger, OrderQuery, OrderStore};

use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request / Response types --

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
    pub customer_name: String,
    pub customer_phone: String,
    pub pickup_time: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub menu_item: String,
    #[serde(default)]
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersParams {
    pub status: Option<String>,
    pub customer_phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemSummaryResponse {
    pub id: MenuItemId,
    pub name: String,
    pub price_cents: i64,
    pub description: String,
    pub image: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub price_cents: i64,
    pub quantity: u32,
    pub total_price_cents: i64,
    /// Current catalog entry, or null once the item left the menu.
    pub menu_item: Option<MenuItemSummaryResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: OrderId,
    pub order_number: String,
    pub items: Vec<OrderLineResponse>,
    pub total_amount_cents: i64,
    pub status: &'static str,
    pub customer_name: String,
    pub customer_phone: String,
    pub pickup_time: DateTime<Utc>,
    pub payment_status: &'static str,
    pub payment_method: &'static str,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CancelOrderResponse {
    pub message: &'static str,
    pub order: OrderResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummaryResponse {
    pub status: &'static str,
    pub count: u64,
    pub total_amount_cents: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatsResponse {
    pub status_breakdown: Vec<StatusSummaryResponse>,
    pub total_orders: u64,
    pub total_revenue_cents: i64,
}

impl From<&MenuItemSummary> for MenuItemSummaryResponse {
    fn from(summary: &MenuItemSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name.clone(),
            price_cents: summary.price.cents(),
            description: summary.description.clone(),
            image: summary.image.clone(),
        }
    }
}

impl OrderLineResponse {
    fn new(line: &OrderLine, catalog: Option<&MenuItemSummary>) -> Self {
        Self {
            menu_item_id: line.menu_item_id,
            name: line.name.clone(),
            price_cents: line.unit_price.cents(),
            quantity: line.quantity,
            total_price_cents: line.total_price.cents(),
            menu_item: catalog.map(MenuItemSummaryResponse::from),
        }
    }
}

impl From<&OrderDetails> for OrderResponse {
    fn from(details: &OrderDetails) -> Self {
        let order = &details.order;
        Self {
            id: order.id(),
            order_number: order.order_number().to_string(),
            items: details
                .lines()
                .map(|(line, catalog)| OrderLineResponse::new(line, catalog))
                .collect(),
            total_amount_cents: order.total_amount().cents(),
            status: order.status().as_str(),
            customer_name: order.customer_name().to_string(),
            customer_phone: order.customer_phone().to_string(),
            pickup_time: order.pickup_time(),
            payment_status: order.payment_status().as_str(),
            payment_method: order.payment_method().as_str(),
            notes: order.notes().map(str::to_string),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            expires_at: order.expires_at(),
        }
    }
}

impl From<&StatusSummary> for StatusSummaryResponse {
    fn from(summary: &StatusSummary) -> Self {
        Self {
            status: summary.status.as_str(),
            count: summary.count,
            total_amount_cents: summary.total_amount.cents(),
        }
    }
}

impl From<OrderStats> for OrderStatsResponse {
    fn from(stats: OrderStats) -> Self {
        Self {
            status_breakdown: stats
                .status_breakdown
                .iter()
                .map(StatusSummaryResponse::from)
                .collect(),
            total_orders: stats.total_orders,
            total_revenue_cents: stats.total_revenue.cents(),
        }
    }
}

impl CreateOrderRequest {
    /// Turns the request body into an engine command.
    ///
    /// Only decoding happens here; field rules are enforced by the engine.
    fn into_command(self) -> Result<CreateOrder, ApiError> {
        let lines = self
            .items
            .iter()
            .map(|item| -> Result<OrderLineRequest, ApiError> {
                let menu_item_id: MenuItemId = parse_id(&item.menu_item, "menu item")?;
                // Negative quantities fall to zero and fail the quantity check
                let quantity = u32::try_from(item.quantity.max(0)).unwrap_or(u32::MAX);
                Ok(OrderLineRequest::new(menu_item_id, quantity))
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        let pickup_time = parse_pickup_time(self.pickup_time.as_deref().unwrap_or_default())
            .map_err(EngineError::from)?;

        let mut command = CreateOrder::new(
            lines,
            self.customer_name,
            self.customer_phone,
            pickup_time,
        );
        if let Some(method) = self.payment_method.as_deref().filter(|m| !m.is_empty()) {
            let method: PaymentMethod = method.parse().map_err(EngineError::from)?;
            command = command.with_payment_method(method);
        }
        if let Some(notes) = self.notes {
            command = command.with_notes(notes);
        }

        Ok(command)
    }
}

fn render_all(orders: &[OrderDetails]) -> Vec<OrderResponse> {
    orders.iter().map(OrderResponse::from).collect()
}

// -- Handlers --

/// POST /api/orders: places an order and reserves its stock.
pub async fn create<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let Json(req) = payload?;
    let command = req.into_command()?;
    let details = state.engine.create_order(command).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(&details))))
}

/// GET /api/orders: lists orders newest first, optionally filtered.
pub async fn list<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let mut query = OrderQuery::new();
    if let Some(raw) = params.status.as_deref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = raw.parse().map_err(EngineError::from)?;
        query = query.status(status);
    }
    if let Some(phone) = params
        .customer_phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    {
        query = query.customer_phone(phone);
    }

    let orders = state.engine.list_orders(query).await?;
    Ok(Json(render_all(&orders)))
}

/// GET /api/orders/{id}: gets an order with its catalog entries.
pub async fn get<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let id: OrderId = parse_id(&id, "order")?;
    let details = state.engine.get_order(id).await?;
    Ok(Json(OrderResponse::from(&details)))
}

/// GET /api/orders/number/{orderNumber}: looks an order up by its number.
pub async fn get_by_number<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
    Path(number): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let number = OrderNumber::new(number.trim());
    let details = state.engine.get_order_by_number(&number).await?;
    Ok(Json(OrderResponse::from(&details)))
}

/// GET /api/orders/customer/{phone}: one customer's order history.
pub async fn list_by_customer<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
    Path(phone): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let orders = state.engine.list_orders_by_customer_phone(&phone).await?;
    Ok(Json(render_all(&orders)))
}

/// PUT /api/orders/{id}/status: moves an order along its lifecycle.
pub async fn update_status<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<OrderResponse>, ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let id: OrderId = parse_id(&id, "order")?;
    let Json(req) = payload?;
    let status: OrderStatus = req.status.trim().parse().map_err(EngineError::from)?;

    let details = state.engine.update_order_status(id, status).await?;
    Ok(Json(OrderResponse::from(&details)))
}

/// DELETE /api/orders/{id}: cancels an order and gives its stock back.
///
/// The returned order is the snapshot taken before the cancellation.
pub async fn cancel<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
    Path(id): Path<String>,
) -> Result<Json<CancelOrderResponse>, ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let id: OrderId = parse_id(&id, "order")?;
    let details = state.engine.cancel_order(id).await?;
    Ok(Json(CancelOrderResponse {
        message: "Order cancelled successfully",
        order: OrderResponse::from(&details),
    }))
}

/// GET /api/orders/stats/summary: per-status counts and revenue.
pub async fn stats<L, O>(
    State(state): State<Arc<AppState<L, O>>>,
) -> Result<Json<OrderStatsResponse>, ApiError>
where
    L: InventoryLedger + 'static,
    O: OrderStore + 'static,
{
    let stats = state.engine.get_order_stats().await?;
    Ok(Json(stats.into()))
}
