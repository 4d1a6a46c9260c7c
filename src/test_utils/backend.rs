//! An in-process stand-in for the Tally backend.
//!
//! It speaks the same JSON as the real backend for every endpoint the client
//! uses, records what it was sent, and can be told to misbehave.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use axum::{
    Json, Router,
    body::{Body, to_bytes},
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

use crate::{endpoints, token_store::TokenPair};

/// The password the mock accepts for any email.
pub(crate) const VALID_PASSWORD: &str = "correct horse battery";

/// A running mock backend.
pub(crate) struct MockBackend {
    /// The base URL to point clients at.
    pub base_url: Url,
    /// Shared with the server task.
    pub state: Arc<BackendState>,
}

impl MockBackend {
    /// Start a backend on a random local port.
    pub async fn start() -> Self {
        let state = Arc::new(BackendState::default());
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("could not bind mock backend");
        let address = listener.local_addr().expect("mock backend has no address");
        let router = build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("mock backend stopped");
        });

        Self {
            base_url: Url::parse(&format!("http://{address}/")).expect("invalid mock backend URL"),
            state,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<String>,
    last_content_type: Option<String>,
    last_authorization: Option<String>,
    last_query: Option<String>,
    last_body: Option<Value>,
    token_counter: u64,
    valid_access_tokens: HashSet<String>,
    latest_access_token: String,
    valid_refresh_tokens: HashSet<String>,
    latest_refresh_token: String,
    refresh_calls: usize,
    reject_refreshes: bool,
    rotate_refresh_tokens: bool,
    fail_logouts: bool,
    ignore_month_filter: bool,
    transactions: Vec<Value>,
    next_transaction_id: i64,
    budgets: BTreeMap<String, f64>,
}

/// What the mock backend has seen and how it should behave.
#[derive(Debug, Default)]
pub(crate) struct BackendState {
    inner: Mutex<Inner>,
}

impl BackendState {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("mock backend state poisoned")
    }

    /// Issue a new token pair, as a log in would.
    pub fn issue_tokens(&self) -> TokenPair {
        let mut inner = self.lock();
        let access_token = new_access_token(&mut inner);
        let refresh_token = new_refresh_token(&mut inner);

        TokenPair {
            access_token,
            refresh_token,
        }
    }

    /// Every request received, as "METHOD /path".
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn last_content_type(&self) -> Option<String> {
        self.lock().last_content_type.clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.lock().last_authorization.clone()
    }

    pub fn last_query(&self) -> Option<String> {
        self.lock().last_query.clone()
    }

    pub fn last_body(&self) -> Option<Value> {
        self.lock().last_body.clone()
    }

    /// Reject every access token issued so far.
    pub fn expire_access_token(&self) {
        self.lock().valid_access_tokens.clear();
    }

    /// Answer every refresh with 401.
    pub fn reject_refreshes(&self) {
        self.lock().reject_refreshes = true;
    }

    /// Issue a new refresh token with each refresh and revoke the old one.
    pub fn rotate_refresh_tokens(&self) {
        self.lock().rotate_refresh_tokens = true;
    }

    /// Answer every log out with 500.
    pub fn fail_logouts(&self) {
        self.lock().fail_logouts = true;
    }

    /// Return transactions of every month, whatever the query asks for.
    pub fn ignore_month_filter(&self) {
        self.lock().ignore_month_filter = true;
    }

    pub fn refresh_calls(&self) -> usize {
        self.lock().refresh_calls
    }

    /// The most recently issued access token.
    pub fn valid_access_token(&self) -> String {
        self.lock().latest_access_token.clone()
    }

    /// The most recently issued refresh token.
    pub fn valid_refresh_token(&self) -> String {
        self.lock().latest_refresh_token.clone()
    }

    pub fn accepts_access_token(&self, token: &str) -> bool {
        self.lock().valid_access_tokens.contains(token)
    }

    /// Store four transactions: three in May 2025 and one in April 2025.
    pub fn seed_transactions(&self) {
        let seed = [
            json!({"subject": "Groceries", "date": "2025-05-03", "amount": 85.25,
                   "category": "Food", "type": "Expense", "notes": "market"}),
            json!({"subject": "Lunch", "date": "2025-05-10", "amount": "12.50",
                   "category": "Food", "type": "Expense", "notes": ""}),
            json!({"subject": "Salary", "date": "2025-05-01T09:00:00Z", "amount": "3000.00",
                   "category": "Other", "type": "Income", "notes": null}),
            json!({"subject": "Electricity", "date": "2025-04-28", "amount": 120,
                   "category": "Utilities", "type": "Expense", "notes": ""}),
        ];

        let mut inner = self.lock();
        for transaction in seed {
            insert_transaction(&mut inner, transaction);
        }
    }

    /// Store `transaction` exactly as given.
    pub fn push_raw_transaction(&self, transaction: Value) {
        self.lock().transactions.push(transaction);
    }
}

fn new_access_token(inner: &mut Inner) -> String {
    inner.token_counter += 1;
    let token = format!("access-{}", inner.token_counter);
    inner.valid_access_tokens.insert(token.clone());
    inner.latest_access_token = token.clone();
    token
}

fn new_refresh_token(inner: &mut Inner) -> String {
    inner.token_counter += 1;
    let token = format!("refresh-{}", inner.token_counter);
    inner.valid_refresh_tokens.insert(token.clone());
    inner.latest_refresh_token = token.clone();
    token
}

fn insert_transaction(inner: &mut Inner, mut transaction: Value) -> Value {
    inner.next_transaction_id += 1;
    transaction["id"] = json!(inner.next_transaction_id);
    inner.transactions.push(transaction.clone());
    transaction
}

fn build_router(state: Arc<BackendState>) -> Router {
    let route = |path: &str| format!("/{path}");

    Router::new()
        .route(&route(endpoints::LOG_IN), post(log_in))
        .route(&route(endpoints::REGISTER), post(register))
        .route(&route(endpoints::LOG_OUT), post(log_out))
        .route(&route(endpoints::REFRESH), post(refresh))
        .route(&route(endpoints::CURRENT_USER), get(current_user))
        .route(&route(endpoints::TRANSACTIONS), get(list_transactions))
        .route(&route(endpoints::TRANSACTION), get(get_transaction))
        .route(&route(endpoints::NEW_TRANSACTION), post(create_transaction))
        .route(&route(endpoints::UPDATE_TRANSACTION), put(update_transaction))
        .route(&route(endpoints::DELETE_TRANSACTION), delete(delete_transaction))
        .route(&route(endpoints::BUDGET), get(get_budget))
        .route(&route(endpoints::NEW_BUDGET), post(set_budget))
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .with_state(state)
}

async fn record_request(
    State(state): State<Arc<BackendState>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    {
        let header_text = |name| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned)
        };
        let mut inner = state.lock();
        inner
            .calls
            .push(format!("{} {}", parts.method, parts.uri.path()));
        inner.last_content_type = header_text(header::CONTENT_TYPE);
        inner.last_authorization = header_text(header::AUTHORIZATION);
        inner.last_query = parts.uri.query().map(str::to_owned);
        inner.last_body = serde_json::from_slice(&bytes).ok();
    }

    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

fn error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn authorize(state: &BackendState, headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if state.accepts_access_token(token) => Ok(()),
        Some(_) => Err(error(
            StatusCode::UNAUTHORIZED,
            "Given token not valid for any token type",
        )),
        None => Err(error(
            StatusCode::UNAUTHORIZED,
            "Authentication credentials were not provided.",
        )),
    }
}

fn alice() -> Value {
    json!({"id": 1, "username": "alice", "email": "alice@example.com"})
}

async fn log_in(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    if body["password"] != VALID_PASSWORD {
        return error(
            StatusCode::UNAUTHORIZED,
            "No active account found with the given credentials",
        );
    }

    let pair = state.issue_tokens();
    Json(json!({
        "access": pair.access_token,
        "refresh": pair.refresh_token,
        "user": alice(),
    }))
    .into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({"id": 2, "username": body["username"], "email": body["email"]})),
    )
        .into_response()
}

async fn log_out(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    let mut inner = state.lock();
    if inner.fail_logouts {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Logout is broken");
    }

    if let Some(refresh) = body["refresh"].as_str() {
        inner.valid_refresh_tokens.remove(refresh);
    }

    Json(json!({})).into_response()
}

async fn refresh(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    let mut inner = state.lock();
    inner.refresh_calls += 1;

    let refresh_token = body["refresh"].as_str().unwrap_or_default().to_owned();
    if inner.reject_refreshes || !inner.valid_refresh_tokens.contains(&refresh_token) {
        return error(StatusCode::UNAUTHORIZED, "Token is invalid or expired");
    }

    let access = new_access_token(&mut inner);

    if inner.rotate_refresh_tokens {
        inner.valid_refresh_tokens.remove(&refresh_token);
        let refresh = new_refresh_token(&mut inner);
        return Json(json!({"access": access, "refresh": refresh})).into_response();
    }

    Json(json!({"access": access})).into_response()
}

async fn current_user(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    Json(alice()).into_response()
}

async fn list_transactions(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let inner = state.lock();
    let matches = |transaction: &&Value| {
        let field_matches = |field: &str, key: &str| {
            query
                .get(key)
                .is_none_or(|wanted| transaction[field].as_str() == Some(wanted.as_str()))
        };
        let month_matches = inner.ignore_month_filter
            || query.get("month").is_none_or(|month| {
                transaction["date"]
                    .as_str()
                    .is_some_and(|date| date.starts_with(month.as_str()))
            });

        field_matches("type", "type") && field_matches("category", "category") && month_matches
    };

    let transactions: Vec<Value> = inner.transactions.iter().filter(matches).cloned().collect();
    Json(transactions).into_response()
}

async fn get_transaction(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let inner = state.lock();
    match inner.transactions.iter().find(|t| t["id"] == json!(id)) {
        Some(transaction) => Json(transaction.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Not found."),
    }
}

async fn create_transaction(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let created = insert_transaction(&mut state.lock(), body);
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn update_transaction(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(mut body): Json<Value>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let mut inner = state.lock();
    match inner.transactions.iter_mut().find(|t| t["id"] == json!(id)) {
        Some(transaction) => {
            body["id"] = json!(id);
            *transaction = body.clone();
            Json(body).into_response()
        }
        None => error(StatusCode::NOT_FOUND, "Not found."),
    }
}

async fn delete_transaction(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let mut inner = state.lock();
    let before = inner.transactions.len();
    inner.transactions.retain(|t| t["id"] != json!(id));

    if inner.transactions.len() == before {
        error(StatusCode::NOT_FOUND, "Not found.")
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

fn budget_json(month: &str, amount: f64) -> Value {
    json!({"amount": format!("{amount:.2}"), "month": format!("{month}-01")})
}

async fn get_budget(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Query(query): Query<BTreeMap<String, String>>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let inner = state.lock();
    let month = query.get("month").cloned().or_else(|| inner.budgets.keys().last().cloned());

    match month.and_then(|month| inner.budgets.get(&month).map(|amount| (month.clone(), *amount))) {
        Some((month, amount)) => Json(budget_json(&month, amount)).into_response(),
        None => error(StatusCode::NOT_FOUND, "No budget set for this month."),
    }
}

async fn set_budget(
    State(state): State<Arc<BackendState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }

    let (Some(amount), Some(month)) = (body["amount"].as_f64(), body["month"].as_str()) else {
        return error(StatusCode::BAD_REQUEST, "amount and month are required");
    };
    let Some(month) = month.get(..7).map(str::to_owned) else {
        return error(StatusCode::BAD_REQUEST, "month must be YYYY-MM-01");
    };

    state.lock().budgets.insert(month.clone(), amount);
    (StatusCode::CREATED, Json(budget_json(&month, amount))).into_response()
}
