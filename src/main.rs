//! Pre-Order Marketplace - HTTP service

use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post, put}, Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use validator::Validate;

use preorder_market::checkout::{payment_countdown, price_order, CheckoutItem, FeeSchedule, PaymentCountdown};
use preorder_market::domain::aggregates::{Bundle, Cart, CartItem, Order, OrderStatus};
use preorder_market::domain::events::{BundleEvent, DomainEvent, OrderEvent};
use preorder_market::domain::value_objects::{Money, OrderNumber};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoreRow { pub id: Uuid, pub name: String, pub slug: String, pub contact_phone: Option<String>, pub created_at: DateTime<Utc> }

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BankRow { pub id: Uuid, pub name: String, pub account_number: String, pub account_holder: String }

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BundleRow {
    pub id: Uuid, pub store_id: Uuid, pub name: String, pub description: String,
    pub price: i64, pub currency: String, pub status: String,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid, pub order_number: String, pub customer_email: String, pub status: String,
    pub subtotal: i64, pub service_fee: i64, pub total: i64, pub currency: String,
    pub bank_id: Option<Uuid>, pub pickup_date: Option<NaiveDate>, pub notes: Option<String>,
    pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItemRow { pub id: Uuid, pub order_id: Uuid, pub bundle_id: Uuid, pub store_id: Uuid, pub name: String, pub position: i32, pub quantity: i32, pub unit_price: i64, pub total: i64 }

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentRow { pub id: Uuid, pub order_id: Uuid, pub amount: i64, pub method: String, pub status: String, pub proof_url: Option<String>, pub notes: Option<String>, pub created_at: DateTime<Utc>, pub updated_at: DateTime<Utc> }

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItemRow { pub id: Uuid, pub session_id: String, pub bundle_id: Uuid, pub quantity: i32, pub created_at: DateTime<Utc> }

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CartLineRow { pub bundle_id: Uuid, pub store_id: Uuid, pub name: String, pub quantity: i32, pub price: i64 }

#[derive(Clone)] pub struct AppState { pub db: sqlx::PgPool, pub nats: Option<async_nats::Client>, pub fees: FeeSchedule }

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let db = PgPoolOptions::new().max_connections(10).connect(&std::env::var("DATABASE_URL")?).await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let nats = match std::env::var("NATS_URL") {
        Ok(url) => match async_nats::connect(&url).await {
            Ok(client) => Some(client),
            Err(e) => { tracing::warn!("NATS unavailable, events disabled: {}", e); None }
        },
        Err(_) => None,
    };
    let fees = FeeSchedule::from_env();
    let state = AppState { db, nats, fees };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "preorder-market"})) }))
        .route("/api/v1/stores", get(list_stores).post(create_store))
        .route("/api/v1/stores/:id", get(get_store))
        .route("/api/v1/bundles", get(list_bundles).post(create_bundle))
        .route("/api/v1/bundles/:id", get(get_bundle).put(update_bundle).delete(delete_bundle))
        .route("/api/v1/banks", get(list_banks).post(create_bank))
        .route("/api/v1/cart/:session", get(get_cart).post(add_to_cart).delete(clear_cart))
        .route("/api/v1/orders", get(list_orders).post(create_order))
        .route("/api/v1/orders/:id", get(get_order))
        .route("/api/v1/orders/:id/payment-proof", post(submit_payment_proof))
        .route("/api/v1/orders/:id/status", put(update_order_status))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8083".to_string());
    tracing::info!("🚀 preorder-market listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

/// Best-effort event publication after commit; delivery failures are logged,
/// never surfaced to the customer.
async fn publish_events(nats: &Option<async_nats::Client>, events: Vec<DomainEvent>) {
    let Some(client) = nats else { return };
    for event in events {
        match serde_json::to_vec(&event) {
            Ok(payload) => {
                if let Err(e) = client.publish(event.subject(), payload.into()).await {
                    tracing::warn!("failed to publish {}: {}", event.subject(), e);
                }
            }
            Err(e) => tracing::warn!("failed to encode domain event: {}", e),
        }
    }
}

#[derive(Debug, Deserialize)] pub struct ListParams { pub page: Option<u32>, pub per_page: Option<u32>, pub store: Option<Uuid> }
#[derive(Debug, Serialize)] pub struct PaginatedResponse<T> { pub data: Vec<T>, pub total: i64, pub page: u32 }

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

async fn list_stores(State(s): State<AppState>) -> Result<Json<Vec<StoreRow>>, (StatusCode, String)> {
    let stores = sqlx::query_as::<_, StoreRow>("SELECT * FROM stores ORDER BY name").fetch_all(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(stores))
}

async fn get_store(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<StoreRow>, (StatusCode, String)> {
    sqlx::query_as::<_, StoreRow>("SELECT * FROM stores WHERE id = $1").bind(id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.map(Json).ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))
}

#[derive(Debug, Deserialize, Validate)] pub struct CreateStoreRequest { #[validate(length(min = 1))] pub name: String, pub contact_phone: Option<String> }

async fn create_store(State(s): State<AppState>, Json(r): Json<CreateStoreRequest>) -> Result<(StatusCode, Json<StoreRow>), (StatusCode, String)> {
    r.validate().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let slug = r.name.to_lowercase().replace(' ', "-");
    let store = sqlx::query_as::<_, StoreRow>("INSERT INTO stores (id, name, slug, contact_phone, created_at) VALUES ($1, $2, $3, $4, NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(&r.name).bind(&slug).bind(&r.contact_phone)
        .fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((StatusCode::CREATED, Json(store)))
}

// ---------------------------------------------------------------------------
// Bundles
// ---------------------------------------------------------------------------

async fn list_bundles(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<BundleRow>>, (StatusCode, String)> {
    let page = p.page.unwrap_or(1).max(1); let per_page = p.per_page.unwrap_or(20).min(100);
    let bundles = sqlx::query_as::<_, BundleRow>("SELECT * FROM bundles WHERE status = 'active' AND ($3::uuid IS NULL OR store_id = $3) ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(per_page as i64).bind(((page-1)*per_page) as i64).bind(p.store).fetch_all(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bundles WHERE status = 'active' AND ($1::uuid IS NULL OR store_id = $1)").bind(p.store).fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(PaginatedResponse { data: bundles, total: total.0, page }))
}

async fn get_bundle(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<BundleRow>, (StatusCode, String)> {
    sqlx::query_as::<_, BundleRow>("SELECT * FROM bundles WHERE id = $1").bind(id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.map(Json).ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBundleRequest {
    pub store_id: Uuid,
    #[validate(length(min = 1))] pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))] pub price: i64,
}

async fn create_bundle(State(s): State<AppState>, Json(r): Json<CreateBundleRequest>) -> Result<(StatusCode, Json<BundleRow>), (StatusCode, String)> {
    r.validate().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    sqlx::query("SELECT 1 FROM stores WHERE id = $1").bind(r.store_id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.ok_or((StatusCode::BAD_REQUEST, "Unknown store".to_string()))?;

    let mut bundle = Bundle::create(r.store_id, &r.name, Money::new(r.price));
    if let Some(d) = &r.description { bundle.set_description(d); }
    bundle.publish().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let row = sqlx::query_as::<_, BundleRow>("INSERT INTO bundles (id, store_id, name, description, price, currency, status, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, 'IDR', $6, $7, $7) RETURNING *")
        .bind(bundle.id()).bind(bundle.store_id()).bind(bundle.name()).bind(bundle.description()).bind(bundle.price().amount()).bind(bundle.status().as_str()).bind(bundle.created_at())
        .fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    publish_events(&s.nats, bundle.take_events()).await;
    Ok((StatusCode::CREATED, Json(row)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBundleRequest {
    #[validate(length(min = 1))] pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))] pub price: i64,
}

async fn update_bundle(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<UpdateBundleRequest>) -> Result<Json<BundleRow>, (StatusCode, String)> {
    r.validate().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let row = sqlx::query_as::<_, BundleRow>("UPDATE bundles SET name = $2, description = COALESCE($3, description), price = $4, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(&r.name).bind(&r.description).bind(r.price)
        .fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))?;
    Ok(Json(row))
}

async fn delete_bundle(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode, (StatusCode, String)> {
    let row = sqlx::query_as::<_, BundleRow>("UPDATE bundles SET status = 'archived', updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))?;
    publish_events(&s.nats, vec![DomainEvent::Bundle(BundleEvent::Archived { bundle_id: row.id, store_id: row.store_id })]).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Banks
// ---------------------------------------------------------------------------

async fn list_banks(State(s): State<AppState>) -> Result<Json<Vec<BankRow>>, (StatusCode, String)> {
    let banks = sqlx::query_as::<_, BankRow>("SELECT * FROM banks ORDER BY name").fetch_all(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(banks))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBankRequest {
    #[validate(length(min = 1))] pub name: String,
    #[validate(length(min = 1))] pub account_number: String,
    #[validate(length(min = 1))] pub account_holder: String,
}

async fn create_bank(State(s): State<AppState>, Json(r): Json<CreateBankRequest>) -> Result<(StatusCode, Json<BankRow>), (StatusCode, String)> {
    r.validate().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let bank = sqlx::query_as::<_, BankRow>("INSERT INTO banks (id, name, account_number, account_holder) VALUES ($1, $2, $3, $4) RETURNING *")
        .bind(Uuid::now_v7()).bind(&r.name).bind(&r.account_number).bind(&r.account_holder)
        .fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((StatusCode::CREATED, Json(bank)))
}

// ---------------------------------------------------------------------------
// Cart
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)] pub struct CartItemView { pub bundle_id: Uuid, pub name: String, pub quantity: u32, pub unit_price: i64, pub line_total: i64 }
#[derive(Debug, Serialize)] pub struct CartView { pub items: Vec<CartItemView>, pub subtotal: i64 }

async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<CartView>, (StatusCode, String)> {
    let rows = sqlx::query_as::<_, CartLineRow>("SELECT c.bundle_id, b.store_id, b.name, c.quantity, b.price FROM cart_items c JOIN bundles b ON b.id = c.bundle_id WHERE c.session_id = $1 ORDER BY c.created_at")
        .bind(&session).fetch_all(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let mut cart = Cart::new(session);
    for row in rows {
        cart.add_item(CartItem { bundle_id: row.bundle_id, store_id: row.store_id, name: row.name, quantity: row.quantity.max(0) as u32, unit_price: Money::new(row.price) });
    }
    let items = cart.items().iter().map(|i| CartItemView { bundle_id: i.bundle_id, name: i.name.clone(), quantity: i.quantity, unit_price: i.unit_price.amount(), line_total: i.line_total().amount() }).collect();
    Ok(Json(CartView { items, subtotal: cart.subtotal().amount() }))
}

#[derive(Debug, Deserialize)] pub struct AddToCartRequest { pub bundle_id: Uuid, pub quantity: u32 }

async fn add_to_cart(State(s): State<AppState>, Path(session): Path<String>, Json(r): Json<AddToCartRequest>) -> Result<(StatusCode, Json<CartItemRow>), (StatusCode, String)> {
    if r.quantity == 0 { return Err((StatusCode::BAD_REQUEST, "Quantity must be at least 1".to_string())); }
    sqlx::query("SELECT 1 FROM bundles WHERE id = $1 AND status = 'active'").bind(r.bundle_id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.ok_or((StatusCode::BAD_REQUEST, "Bundle is not available".to_string()))?;
    let item = sqlx::query_as::<_, CartItemRow>("INSERT INTO cart_items (id, session_id, bundle_id, quantity, created_at) VALUES ($1, $2, $3, $4, NOW()) ON CONFLICT (session_id, bundle_id) DO UPDATE SET quantity = cart_items.quantity + $4 RETURNING *")
        .bind(Uuid::now_v7()).bind(&session).bind(r.bundle_id).bind(r.quantity as i32)
        .fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<StatusCode, (StatusCode, String)> {
    sqlx::query("DELETE FROM cart_items WHERE session_id = $1").bind(&session).execute(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

async fn list_orders(State(s): State<AppState>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<OrderRow>>, (StatusCode, String)> {
    let page = p.page.unwrap_or(1).max(1); let per_page = p.per_page.unwrap_or(20).min(100);
    let orders = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(per_page as i64).bind(((page-1)*per_page) as i64).fetch_all(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(PaginatedResponse { data: orders, total: total.0, page }))
}

#[derive(Debug, Serialize)]
pub struct OrderDetailResponse { pub order: OrderRow, pub items: Vec<OrderItemRow>, pub payment: Option<PaymentRow>, pub countdown: Option<PaymentCountdown> }

async fn get_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OrderDetailResponse>, (StatusCode, String)> {
    let order = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))?;
    let items = sqlx::query_as::<_, OrderItemRow>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY position").bind(id).fetch_all(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let payment = sqlx::query_as::<_, PaymentRow>("SELECT * FROM payments WHERE order_id = $1").bind(id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    // Countdown shown while payment proof is still awaited.
    let countdown = match &payment {
        Some(p) if p.status == "pending" && order.status == "pending" => Some(payment_countdown(order.created_at, Utc::now())),
        _ => None,
    };
    Ok(Json(OrderDetailResponse { order, items, payment, countdown }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(email)] pub customer_email: String,
    #[validate(length(min = 1, message = "cart is empty"))] pub items: Vec<OrderItemRequest>,
    pub bank_id: Option<Uuid>,
    pub pickup_date: Option<NaiveDate>,
    pub notes: Option<String>,
    /// Cart session to clear once the order is placed.
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)] pub struct OrderItemRequest { pub bundle_id: Uuid, pub quantity: u32 }

#[derive(Debug, Serialize)]
pub struct CheckoutResponse { pub order_number: String, pub total_amount: i64, pub order_status: String, pub payment_status: String, pub payment_deadline: DateTime<Utc> }

async fn create_order(State(s): State<AppState>, Json(r): Json<CreateOrderRequest>) -> Result<(StatusCode, Json<CheckoutResponse>), (StatusCode, String)> {
    r.validate().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let ids: Vec<Uuid> = r.items.iter().map(|i| i.bundle_id).collect();
    let bundles = sqlx::query_as::<_, BundleRow>("SELECT * FROM bundles WHERE id = ANY($1) AND status = 'active'")
        .bind(&ids).fetch_all(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let by_id: HashMap<Uuid, &BundleRow> = bundles.iter().map(|b| (b.id, b)).collect();

    let mut items = Vec::with_capacity(r.items.len());
    for req in &r.items {
        let b = by_id.get(&req.bundle_id).ok_or((StatusCode::BAD_REQUEST, format!("Bundle {} is not available", req.bundle_id)))?;
        items.push(CheckoutItem { bundle_id: b.id, quantity: req.quantity, unit_price: Money::new(b.price) });
    }

    let breakdown = price_order(&items, |id| by_id.get(&id).map(|b| b.store_id), &s.fees).map_err(|e| {
        let code = if e.is_client_error() { StatusCode::BAD_REQUEST } else { StatusCode::INTERNAL_SERVER_ERROR };
        (code, e.to_string())
    })?;

    let mut order = Order::place(OrderNumber::generate(), &r.customer_email, &breakdown);
    order.set_bank(r.bank_id);
    order.set_pickup_date(r.pickup_date);
    order.set_notes(r.notes.clone());

    // Order, its items, and the pending payment land in one transaction;
    // partial checkouts are never observable.
    let mut tx = s.db.begin().await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let row = sqlx::query_as::<_, OrderRow>("INSERT INTO orders (id, order_number, customer_email, status, subtotal, service_fee, total, currency, bank_id, pickup_date, notes, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, 'IDR', $8, $9, $10, $11, $11) RETURNING *")
        .bind(order.id()).bind(order.order_number().as_str()).bind(order.customer_email()).bind(order.status().as_str())
        .bind(order.subtotal().amount()).bind(order.service_fee().amount()).bind(order.total().amount())
        .bind(order.bank_id()).bind(order.pickup_date()).bind(order.notes()).bind(order.created_at())
        .fetch_one(&mut *tx).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    for (position, line) in order.lines().iter().enumerate() {
        let name = by_id.get(&line.bundle_id).map(|b| b.name.clone()).unwrap_or_default();
        sqlx::query("INSERT INTO order_items (id, order_id, bundle_id, store_id, name, position, quantity, unit_price, total) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)")
            .bind(Uuid::now_v7()).bind(order.id()).bind(line.bundle_id).bind(line.store_id).bind(&name)
            .bind(position as i32).bind(line.quantity as i32).bind(line.unit_price.amount()).bind(line.total.amount())
            .execute(&mut *tx).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    }
    let payment = sqlx::query_as::<_, PaymentRow>("INSERT INTO payments (id, order_id, amount, method, status, created_at, updated_at) VALUES ($1, $2, $3, 'bank_transfer', 'pending', NOW(), NOW()) RETURNING *")
        .bind(Uuid::now_v7()).bind(order.id()).bind(order.total().amount())
        .fetch_one(&mut *tx).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    tx.commit().await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if let Some(session) = &r.session_id {
        if let Err(e) = sqlx::query("DELETE FROM cart_items WHERE session_id = $1").bind(session).execute(&s.db).await {
            tracing::warn!("failed to clear cart session {}: {}", session, e);
        }
    }
    publish_events(&s.nats, order.take_events()).await;

    let countdown = payment_countdown(row.created_at, Utc::now());
    Ok((StatusCode::CREATED, Json(CheckoutResponse {
        order_number: row.order_number, total_amount: row.total, order_status: row.status,
        payment_status: payment.status, payment_deadline: countdown.deadline,
    })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PaymentProofRequest { #[validate(length(min = 1))] pub proof_url: String, pub notes: Option<String> }

async fn submit_payment_proof(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<PaymentProofRequest>) -> Result<Json<PaymentRow>, (StatusCode, String)> {
    r.validate().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let order = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))?;
    let payment = sqlx::query_as::<_, PaymentRow>("UPDATE payments SET proof_url = $2, notes = COALESCE($3, notes), updated_at = NOW() WHERE order_id = $1 AND status = 'pending' RETURNING *")
        .bind(id).bind(&r.proof_url).bind(&r.notes)
        .fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::CONFLICT, "No pending payment for this order".to_string()))?;
    publish_events(&s.nats, vec![DomainEvent::Order(OrderEvent::PaymentProofSubmitted { order_id: order.id, order_number: order.order_number.clone() })]).await;
    Ok(Json(payment))
}

#[derive(Debug, Deserialize)] pub struct UpdateStatusRequest { pub status: String }

async fn update_order_status(State(s): State<AppState>, Path(id): Path<Uuid>, Json(r): Json<UpdateStatusRequest>) -> Result<Json<OrderRow>, (StatusCode, String)> {
    let next = OrderStatus::parse(&r.status).ok_or((StatusCode::BAD_REQUEST, format!("Unknown status '{}'", r.status)))?;
    let order = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?.ok_or((StatusCode::NOT_FOUND, "Not found".to_string()))?;
    let current = OrderStatus::parse(&order.status).ok_or((StatusCode::INTERNAL_SERVER_ERROR, format!("Corrupt order status '{}'", order.status)))?;
    if !current.can_transition(next) {
        return Err((StatusCode::CONFLICT, format!("Cannot move order from {} to {}", current.as_str(), next.as_str())));
    }
    let updated = sqlx::query_as::<_, OrderRow>("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(next.as_str())
        .fetch_one(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if next == OrderStatus::Cancelled {
        publish_events(&s.nats, vec![DomainEvent::Order(OrderEvent::Cancelled { order_id: updated.id, order_number: updated.order_number.clone() })]).await;
    }
    Ok(Json(updated))
}
