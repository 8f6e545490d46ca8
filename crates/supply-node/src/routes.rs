//! HTTP handlers over the shared supply chain.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use supply_core::chain::ChainHead;
use supply_core::ops::PaymentReceipt;
use supply_core::{
    Block, LedgerError, MarketAnalysis, Product, ProductStatus, SupplyChain, Transaction, User,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::constants::{BLOCKS_PER_PAGE, MAX_BLOCKS_PER_REQUEST};

/// The mutex serialises every command, so plan, apply and seal never interleave.
#[derive(Clone)]
pub struct AppState {
    chain: Arc<Mutex<SupplyChain>>,
}

impl AppState {
    pub fn new(chain: SupplyChain) -> Self {
        Self {
            chain: Arc::new(Mutex::new(chain)),
        }
    }

    fn chain(&self) -> Result<MutexGuard<'_, SupplyChain>, ApiError> {
        self.chain
            .lock()
            .map_err(|_| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "ledger lock poisoned"))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/users", get(list_users))
        .route("/users/{address}", get(get_user))
        .route("/products", get(list_products).post(create_product))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/transactions", get(product_transactions))
        .route("/products/{id}/market", get(market_analysis))
        .route("/products/{id}/status", post(update_status))
        .route("/products/{id}/payment", post(process_payment))
        .route("/products/{id}/margin", post(set_margin))
        .route("/products/{id}/batch-size", post(update_batch_size))
        .route("/products/{id}/inspection", post(inspect))
        .route("/products/{id}/retail-price", post(update_retail_price))
        .route("/chain/head", get(chain_head))
        .route("/chain/blocks", get(chain_blocks))
        .route("/chain/verify", get(verify_chain))
        .route("/mempool", get(mempool))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status = match &err {
            LedgerError::ProductNotFound(_) | LedgerError::UserNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::InsufficientBalance { .. } => StatusCode::CONFLICT,
            LedgerError::UnknownRole(_) | LedgerError::UnknownStatus(_) => StatusCode::BAD_REQUEST,
            LedgerError::BrokenLink { .. } | LedgerError::DigestMismatch { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn product_not_found(id: &str) -> ApiError {
    LedgerError::ProductNotFound(id.to_string()).into()
}

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

#[derive(Deserialize)]
pub struct LoginIn {
    pub role: String,
    pub password: String,
}

/// POST /auth/login
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginIn>) -> ApiResult<User> {
    let chain = state.chain()?;
    match chain.authenticate(&body.role, &body.password) {
        Some(user) => Ok(Json(user.clone())),
        None => {
            warn!(role = %body.role, "login rejected");
            Err(ApiError::new(StatusCode::UNAUTHORIZED, "invalid credentials"))
        }
    }
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    Ok(Json(state.chain()?.users().to_vec()))
}

pub async fn get_user(State(state): State<AppState>, Path(address): Path<String>) -> ApiResult<User> {
    state
        .chain()?
        .user(&address)
        .cloned()
        .map(Json)
        .ok_or_else(|| LedgerError::UserNotFound(address).into())
}

pub async fn list_products(State(state): State<AppState>) -> ApiResult<Vec<Product>> {
    Ok(Json(state.chain()?.products().to_vec()))
}

#[derive(Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub manufacturer: String,
}

/// POST /products
pub async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "product name is empty"));
    }
    let product = state.chain()?.add_product(&body.name, &body.manufacturer);
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Product> {
    state
        .chain()?
        .product(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| product_not_found(&id))
}

/// GET /products/{id}/transactions; empty for unknown ids.
pub async fn product_transactions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Transaction>> {
    Ok(Json(state.chain()?.product_transactions(&id)))
}

pub async fn market_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MarketAnalysis> {
    state
        .chain()?
        .market_analysis(&id)
        .copied()
        .map(Json)
        .ok_or_else(|| product_not_found(&id))
}

#[derive(Deserialize)]
pub struct StatusIn {
    pub status: ProductStatus,
    pub from: String,
    pub to: String,
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusIn>,
) -> ApiResult<Product> {
    let product = state
        .chain()?
        .update_product_status(&id, body.status, &body.from, &body.to)?;
    Ok(Json(product))
}

#[derive(Deserialize)]
pub struct PaymentIn {
    pub from: String,
    pub to: String,
}

pub async fn process_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PaymentIn>,
) -> ApiResult<PaymentReceipt> {
    let receipt = state.chain()?.process_payment(&id, &body.from, &body.to)?;
    Ok(Json(receipt))
}

#[derive(Deserialize)]
pub struct MarginIn {
    pub margin: f64,
}

pub async fn set_margin(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MarginIn>,
) -> ApiResult<Product> {
    Ok(Json(state.chain()?.set_distributor_margin(&id, body.margin)?))
}

#[derive(Deserialize)]
pub struct BatchSizeIn {
    pub size: u32,
}

pub async fn update_batch_size(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<BatchSizeIn>,
) -> ApiResult<Product> {
    Ok(Json(state.chain()?.update_batch_size(&id, body.size)?))
}

#[derive(Deserialize)]
pub struct InspectionIn {
    pub inspector: String,
}

pub async fn inspect(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<InspectionIn>,
) -> ApiResult<Product> {
    Ok(Json(state.chain()?.inspect_product(&id, &body.inspector)?))
}

#[derive(Deserialize)]
pub struct RetailPriceIn {
    pub price: f64,
}

pub async fn update_retail_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RetailPriceIn>,
) -> ApiResult<Product> {
    Ok(Json(state.chain()?.update_retail_price(&id, body.price)?))
}

pub async fn chain_head(State(state): State<AppState>) -> ApiResult<ChainHead> {
    Ok(Json(state.chain()?.head()))
}

#[derive(Deserialize, Default)]
pub struct BlocksQuery {
    pub limit: Option<usize>,
    pub dir: Option<String>,
}

/// GET /chain/blocks?limit=&dir=asc|desc
pub async fn chain_blocks(
    State(state): State<AppState>,
    Query(q): Query<BlocksQuery>,
) -> ApiResult<Vec<Block>> {
    let limit = q
        .limit
        .unwrap_or(BLOCKS_PER_PAGE)
        .min(MAX_BLOCKS_PER_REQUEST);
    let chain = state.chain()?;
    let blocks = chain.blocks();
    let page: Vec<Block> = match q.dir.as_deref() {
        Some("desc") => blocks.iter().rev().take(limit).cloned().collect(),
        _ => blocks.iter().take(limit).cloned().collect(),
    };
    Ok(Json(page))
}

#[derive(Serialize, Deserialize, Debug)]
pub struct VerifyOut {
    pub ok: bool,
    pub error: Option<String>,
}

pub async fn verify_chain(State(state): State<AppState>) -> ApiResult<VerifyOut> {
    let out = match state.chain()?.verify() {
        Ok(()) => VerifyOut {
            ok: true,
            error: None,
        },
        Err(e) => VerifyOut {
            ok: false,
            error: Some(e.to_string()),
        },
    };
    Ok(Json(out))
}

pub async fn mempool(State(state): State<AppState>) -> ApiResult<Vec<Transaction>> {
    Ok(Json(state.chain()?.pending().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use supply_core::{PaymentStatus, Role};

    fn state() -> AppState {
        AppState::new(SupplyChain::seeded(7))
    }

    async fn address(state: &AppState, role: Role) -> String {
        state
            .chain()
            .unwrap()
            .user_by_role(role)
            .unwrap()
            .address
            .clone()
    }

    async fn new_product(state: &AppState) -> Product {
        let manufacturer = address(state, Role::Manufacturer).await;
        let (status, Json(product)) = create_product(
            State(state.clone()),
            Json(NewProduct {
                name: "Widget".into(),
                manufacturer,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        product
    }

    #[tokio::test]
    async fn login_accepts_role_password() {
        let st = state();
        let Json(user) = login(
            State(st.clone()),
            Json(LoginIn {
                role: "distributor".into(),
                password: "dist123".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(user.role, Role::Distributor);

        let err = login(
            State(st),
            Json(LoginIn {
                role: "distributor".into(),
                password: "nope".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn blank_product_name_is_rejected() {
        let err = create_product(
            State(state()),
            Json(NewProduct {
                name: "   ".into(),
                manufacturer: "0xm".into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn product_name_is_stored_as_given() {
        let st = state();
        let manufacturer = address(&st, Role::Manufacturer).await;
        let (_, Json(product)) = create_product(
            State(st),
            Json(NewProduct {
                name: "  Widget ".into(),
                manufacturer,
            }),
        )
        .await
        .unwrap();
        assert_eq!(product.name, "  Widget ");
    }

    #[tokio::test]
    async fn unknown_product_is_404() {
        let st = state();
        let err = get_product(State(st.clone()), Path("missing".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        let err = set_margin(
            State(st.clone()),
            Path("missing".into()),
            Json(MarginIn { margin: 5.0 }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        let Json(txs) = product_transactions(State(st), Path("missing".into()))
            .await
            .unwrap();
        assert!(txs.is_empty());
    }

    #[tokio::test]
    async fn ship_then_pay() {
        let st = state();
        let product = new_product(&st).await;
        let m = address(&st, Role::Manufacturer).await;
        let d = address(&st, Role::Distributor).await;

        let Json(shipped) = update_status(
            State(st.clone()),
            Path(product.id.clone()),
            Json(StatusIn {
                status: ProductStatus::InTransit,
                from: m.clone(),
                to: d.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(shipped.status, ProductStatus::InTransit);

        let Json(receipt) = process_payment(
            State(st.clone()),
            Path(product.id.clone()),
            Json(PaymentIn {
                from: d.clone(),
                to: m.clone(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(receipt.amount, product.price);

        let Json(after) = get_product(State(st.clone()), Path(product.id.clone()))
            .await
            .unwrap();
        assert_eq!(after.payment_status, PaymentStatus::Completed);

        let Json(head) = chain_head(State(st.clone())).await.unwrap();
        assert_eq!(head.height, 3);
        let Json(verdict) = verify_chain(State(st)).await.unwrap();
        assert!(verdict.ok);
    }

    #[tokio::test]
    async fn overdrawn_payment_is_conflict() {
        let st = state();
        let product = new_product(&st).await;
        let m = address(&st, Role::Manufacturer).await;
        let r = address(&st, Role::Retailer).await;
        loop {
            let result = process_payment(
                State(st.clone()),
                Path(product.id.clone()),
                Json(PaymentIn {
                    from: r.clone(),
                    to: m.clone(),
                }),
            )
            .await;
            if let Err(err) = result {
                assert_eq!(err.status, StatusCode::CONFLICT);
                break;
            }
        }
    }

    #[tokio::test]
    async fn blocks_page_in_both_directions() {
        let st = state();
        for _ in 0..3 {
            new_product(&st).await;
        }
        let Json(asc) = chain_blocks(
            State(st.clone()),
            Query(BlocksQuery {
                limit: Some(2),
                dir: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(asc.iter().map(|b| b.index).collect::<Vec<_>>(), [0, 1]);

        let Json(desc) = chain_blocks(
            State(st),
            Query(BlocksQuery {
                limit: None,
                dir: Some("desc".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(desc.iter().map(|b| b.index).collect::<Vec<_>>(), [2, 1, 0]);
    }
}
