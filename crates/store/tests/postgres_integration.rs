//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use domain::{
    Category, CreateOrder, MenuItem, MenuItemId, Money, Order, OrderLine, OrderLineRequest,
    OrderNumber, OrderStatus,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    InventoryLedger, InventoryLedgerExt, MenuQuery, OrderQuery, OrderStore, PostgresStore,
    StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_canteen_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE orders, menu_items")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn menu_item(name: &str, stock: u32, category: Category) -> MenuItem {
    MenuItem::new(name, "Freshly made", Money::from_cents(450), stock, category).unwrap()
}

fn pending_order(phone: &str, suffix: u16) -> Order {
    let now = Utc::now();
    let item_id = MenuItemId::new();
    let cmd = CreateOrder::new(
        vec![OrderLineRequest::new(item_id, 2)],
        "Arjun",
        phone,
        now + Duration::minutes(30),
    )
    .with_notes("extra chutney");

    Order::place(
        OrderNumber::from_parts(now.timestamp_millis(), suffix),
        vec![OrderLine::new(item_id, "Dosa", Money::from_cents(350), 2)],
        &cmd,
        now,
        Duration::minutes(15),
    )
}

#[tokio::test]
#[serial]
async fn upsert_and_get_menu_item() {
    let store = get_test_store().await;
    let item = menu_item("Idli", 12, Category::Breakfast);

    store.upsert_menu_item(item.clone()).await.unwrap();

    let loaded = store.get_menu_item(item.id).await.unwrap().unwrap();
    assert_eq!(loaded.name, "Idli");
    assert_eq!(loaded.stock, 12);
    assert_eq!(loaded.category, Category::Breakfast);
    assert_eq!(loaded.price, Money::from_cents(450));

    let missing = store.get_menu_item(MenuItemId::new()).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
#[serial]
async fn list_menu_items_filters_and_sorts() {
    let store = get_test_store().await;
    store
        .upsert_menu_item(menu_item("Tea", 10, Category::Beverages))
        .await
        .unwrap();
    store
        .upsert_menu_item(menu_item("Poha", 10, Category::Breakfast))
        .await
        .unwrap();
    store
        .upsert_menu_item(menu_item("Soup", 10, Category::Dinner).with_availability(false))
        .await
        .unwrap();

    let all: Vec<_> = store
        .list_menu_items(MenuQuery::new())
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(all, vec!["Poha", "Soup", "Tea"]);

    let available = store
        .list_menu_items(MenuQuery::new().available_only())
        .await
        .unwrap();
    assert_eq!(available.len(), 2);

    let categories = store.list_categories().await.unwrap();
    assert_eq!(
        categories,
        vec![Category::Breakfast, Category::Dinner, Category::Beverages]
    );
}

#[tokio::test]
#[serial]
async fn reserve_classifies_failures() {
    let store = get_test_store().await;
    let item = menu_item("Vada", 2, Category::Snacks);
    let off = menu_item("Lassi", 5, Category::Beverages).with_availability(false);
    store.upsert_menu_item(item.clone()).await.unwrap();
    store.upsert_menu_item(off.clone()).await.unwrap();

    let updated = store.reserve(item.id, 2).await.unwrap();
    assert_eq!(updated.stock, 0);

    let result = store.reserve(item.id, 1).await;
    assert!(matches!(
        result,
        Err(StoreError::InsufficientStock {
            available: 0,
            requested: 1,
            ..
        })
    ));

    let result = store.reserve(off.id, 1).await;
    assert!(matches!(result, Err(StoreError::ItemUnavailable { .. })));

    let result = store.reserve(MenuItemId::new(), 1).await;
    assert!(matches!(result, Err(StoreError::MenuItemNotFound(_))));
}

#[tokio::test]
#[serial]
async fn release_and_adjust_stock() {
    let store = get_test_store().await;
    let item = menu_item("Vada", 1, Category::Snacks).with_availability(false);
    store.upsert_menu_item(item.clone()).await.unwrap();

    let updated = store.release(item.id, 3).await.unwrap();
    assert_eq!(updated.stock, 4);

    let updated = store.adjust_stock(item.id, 6).await.unwrap();
    assert_eq!(updated.stock, 10);

    let result = store.release(MenuItemId::new(), 1).await;
    assert!(matches!(result, Err(StoreError::MenuItemNotFound(_))));
}

#[tokio::test]
#[serial]
async fn concurrent_reservations_never_oversell() {
    let store = get_test_store().await;
    let item = menu_item("Last Samosa", 5, Category::Snacks);
    store.upsert_menu_item(item.clone()).await.unwrap();

    let tasks: Vec<_> = (0..15)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.reserve(item.id, 1).await })
        })
        .collect();

    let results = futures_util::future::join_all(tasks).await;
    let succeeded = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();

    assert_eq!(succeeded, 5);
    let loaded = store.get_menu_item(item.id).await.unwrap().unwrap();
    assert_eq!(loaded.stock, 0);
}

#[tokio::test]
#[serial]
async fn insert_and_load_order() {
    let store = get_test_store().await;
    let order = pending_order("555-0100", 1);

    store.insert_order(order.clone()).await.unwrap();

    let loaded = store.get_order(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.order_number(), order.order_number());
    assert_eq!(loaded.items(), order.items());
    assert_eq!(loaded.total_amount(), Money::from_cents(700));
    assert_eq!(loaded.status(), OrderStatus::Pending);
    assert_eq!(loaded.notes(), Some("extra chutney"));

    let by_number = store
        .get_order_by_number(order.order_number())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_number.id(), order.id());
}

#[tokio::test]
#[serial]
async fn duplicate_order_number_is_rejected() {
    let store = get_test_store().await;
    let first = pending_order("555-0100", 7);
    let mut second = pending_order("555-0101", 8);
    second.renumber(first.order_number().clone());

    store.insert_order(first).await.unwrap();
    let result = store.insert_order(second.clone()).await;
    assert!(matches!(result, Err(StoreError::DuplicateOrderNumber(_))));
    assert!(store.get_order(second.id()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn list_orders_by_phone_and_status() {
    let store = get_test_store().await;
    let a = pending_order("555-0100", 1);
    let b = pending_order("555-0100", 2);
    let c = pending_order("555-0200", 3);
    for order in [&a, &b, &c] {
        store.insert_order(order.clone()).await.unwrap();
    }
    store
        .transition_status(
            b.id(),
            &[OrderStatus::Pending],
            OrderStatus::Confirmed,
            Utc::now(),
        )
        .await
        .unwrap();

    let mine = store
        .list_orders(OrderQuery::for_customer_phone("555-0100"))
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);

    let confirmed = store
        .list_orders(OrderQuery::new().status(OrderStatus::Confirmed))
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].id(), b.id());
}

#[tokio::test]
#[serial]
async fn concurrent_transitions_only_one_wins() {
    let store = get_test_store().await;
    let order = pending_order("555-0100", 1);
    store.insert_order(order.clone()).await.unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            let id = order.id();
            tokio::spawn(async move {
                store
                    .transition_status(
                        id,
                        &OrderStatus::CANCELLABLE,
                        OrderStatus::Cancelled,
                        Utc::now(),
                    )
                    .await
            })
        })
        .collect();

    let results = futures_util::future::join_all(tasks).await;
    let won = results
        .iter()
        .filter(|r| matches!(r, Ok(Ok(_))))
        .count();
    let conflicted = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(StoreError::StatusConflict { .. }))))
        .count();

    assert_eq!(won, 1);
    assert_eq!(conflicted, 7);
}

#[tokio::test]
#[serial]
async fn transition_missing_order_fails() {
    let store = get_test_store().await;
    let result = store
        .transition_status(
            domain::OrderId::new(),
            &[OrderStatus::Pending],
            OrderStatus::Confirmed,
            Utc::now(),
        )
        .await;
    assert!(matches!(result, Err(StoreError::OrderNotFound(_))));
}

#[tokio::test]
#[serial]
async fn find_expired_and_stats() {
    let store = get_test_store().await;
    let order = pending_order("555-0100", 1);
    let ready = pending_order("555-0100", 2);
    store.insert_order(order.clone()).await.unwrap();
    store.insert_order(ready.clone()).await.unwrap();
    store
        .transition_status(
            ready.id(),
            &[OrderStatus::Pending],
            OrderStatus::Ready,
            Utc::now(),
        )
        .await
        .unwrap();

    let later = order.expires_at() + Duration::seconds(1);
    let expired = store.find_expired(later).await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id(), order.id());

    assert!(store.find_expired(order.expires_at()).await.unwrap().is_empty());

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.total_revenue, Money::from_cents(700));
    assert_eq!(stats.status_breakdown.len(), 2);
    assert_eq!(stats.status_breakdown[0].status, OrderStatus::Pending);
}
