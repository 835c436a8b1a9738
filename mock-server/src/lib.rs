//! In-memory fake of the Planka REST API.
//!
//! Covers the endpoints the client uses, with Planka's response envelopes
//! (`item`, `items`, `included`), bearer-token auth and the status codes the
//! client reacts to. State lives in a single `Store` behind a tokio
//! `RwLock`; nothing is persisted.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post, MethodRouter},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

mod store;

use store::id_of;
pub use store::{Fields, Store, DEMO_PASSWORD, DEMO_USERNAME, DEMO_USER_ID};

pub type Db = Arc<RwLock<Store>>;

type ApiResult = Result<Json<Value>, Rejection>;

const STRIDE: i64 = 65535;
const BOARD_ROLES: &[&str] = &["editor", "viewer"];

/// Error response in Planka's `{"code": ...}` shape.
#[derive(Debug)]
pub struct Rejection {
    status: StatusCode,
    code: &'static str,
}

impl Rejection {
    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "E_NOT_FOUND",
        }
    }

    fn bad_request() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "E_MISSING_OR_INVALID_PARAMS",
        }
    }

    fn conflict(code: &'static str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            code,
        }
    }

    fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "E_UNAUTHORIZED",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "code": self.code }))).into_response()
    }
}

pub fn app() -> Router {
    app_with(Store::seeded())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));

    let protected = Router::new()
        .route("/api/access-tokens/me", delete(logout))
        .route("/api/config", get(config))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/me", get(me))
        .route("/api/users/{id}", get(get_user).merge(updatable("users")).delete(delete_user))
        .route("/api/users/{id}/username", patch(change_username))
        .route("/api/users/{id}/email", patch(change_email))
        .route("/api/users/{id}/password", patch(change_password))
        .route("/api/users/{id}/avatar", post(upload_avatar))
        .route("/api/projects", get(list_projects).post(create_project))
        .route(
            "/api/projects/{id}",
            get(get_project).merge(updatable("projects")).delete(delete_project),
        )
        .route("/api/projects/{id}/managers", post(add_project_manager))
        .route("/api/projects/{id}/background-image", post(upload_background))
        .route("/api/projects/{id}/boards", post(create_board))
        .route("/api/project-managers/{id}", deletable("projectManagers"))
        .route("/api/boards/{id}", get(get_board).merge(updatable("boards")).delete(delete_board))
        .route("/api/boards/{id}/memberships", post(add_board_membership))
        .route("/api/boards/{id}/labels", post(create_label))
        .route("/api/boards/{id}/lists", post(create_list))
        .route("/api/board-memberships/{id}", updatable("boardMemberships").merge(deletable("boardMemberships")))
        .route("/api/labels/{id}", updatable("labels").delete(delete_label))
        .route("/api/lists/{id}", updatable("lists").delete(delete_list))
        .route("/api/lists/{id}/sort", post(sort_list))
        .route("/api/lists/{id}/cards", post(create_card))
        .route("/api/cards/{id}", get(get_card).merge(updatable("cards")).delete(delete_card))
        .route("/api/cards/{id}/duplicate", post(duplicate_card))
        .route("/api/cards/{id}/actions", get(list_actions))
        .route("/api/cards/{id}/comment-actions", post(add_comment))
        .route("/api/cards/{id}/labels", post(add_card_label))
        .route("/api/cards/{id}/labels/{label_id}", delete(remove_card_label))
        .route(
            "/api/cards/{id}/memberships",
            post(add_card_membership).delete(remove_card_membership),
        )
        .route("/api/cards/{id}/tasks", post(create_task))
        .route("/api/cards/{id}/attachments", post(upload_attachment))
        .route("/api/comment-actions/{id}", patch(edit_comment).merge(deletable("actions")))
        .route("/api/tasks/{id}", updatable("tasks").merge(deletable("tasks")))
        .route("/api/attachments/{id}", updatable("attachments").merge(deletable("attachments")))
        .route("/attachments/{id}/download/{filename}", get(download_attachment))
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/{id}", get(get_notification).merge(updatable("notifications")))
        .route_layer(middleware::from_fn_with_state(db.clone(), require_token));

    Router::new()
        .route("/api/access-tokens", post(login))
        .merge(protected)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- plumbing ---

fn item(value: Value) -> Json<Value> {
    Json(json!({ "item": value }))
}

fn items(values: Vec<Value>) -> Json<Value> {
    Json(json!({ "items": values }))
}

fn text(body: &Fields, key: &str) -> Option<String> {
    match body.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn origin(headers: &HeaderMap) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}")
}

async fn require_token(State(db): State<Db>, request: Request, next: Next) -> Response {
    let authorized = match bearer(request.headers()) {
        Some(token) => db.read().await.user_for_token(&token).is_some(),
        None => false,
    };
    if !authorized {
        debug!(path = %request.uri().path(), "rejected request without a valid token");
        return Rejection::unauthorized().into_response();
    }
    next.run(request).await
}

async fn current_user(db: &Db, headers: &HeaderMap) -> Result<String, Rejection> {
    let token = bearer(headers).ok_or_else(Rejection::unauthorized)?;
    db.read().await.user_for_token(&token).ok_or_else(Rejection::unauthorized)
}

/// PATCH handler merging the body into a record of `table`.
fn updatable(table: &'static str) -> MethodRouter<Db> {
    patch(move |State(db): State<Db>, Path(id): Path<String>, Json(body): Json<Fields>| async move {
        update_record(&db, table, &id, body).await
    })
}

/// DELETE handler removing a record of `table` without cascading.
fn deletable(table: &'static str) -> MethodRouter<Db> {
    delete(move |State(db): State<Db>, Path(id): Path<String>| async move {
        let removed = db.write().await.remove(table, &id).ok_or_else(Rejection::not_found)?;
        Ok::<_, Rejection>(item(removed))
    })
}

async fn update_record(db: &Db, table: &str, id: &str, body: Fields) -> ApiResult {
    db.write()
        .await
        .patch(table, id, body)
        .map(item)
        .ok_or_else(Rejection::not_found)
}

async fn fetch(db: &Db, table: &str, id: &str) -> Result<Value, Rejection> {
    db.read().await.get(table, id).ok_or_else(Rejection::not_found)
}

/// File name and contents of the first file part of a multipart form.
async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), Rejection> {
    while let Some(field) = multipart.next_field().await.map_err(|_| Rejection::bad_request())? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let contents = field.bytes().await.map_err(|_| Rejection::bad_request())?;
        return Ok((file_name, contents.to_vec()));
    }
    Err(Rejection::bad_request())
}

fn purge_card(store: &mut Store, card_id: &str) {
    for table in ["tasks", "cardLabels", "cardMemberships", "attachments", "actions", "notifications"] {
        store.remove_where(table, "cardId", card_id);
    }
}

fn purge_board(store: &mut Store, board_id: &str) {
    for card in store.remove_where("cards", "boardId", board_id) {
        purge_card(store, &id_of(&card));
    }
    for table in ["lists", "labels", "boardMemberships"] {
        store.remove_where(table, "boardId", board_id);
    }
}

// --- session ---

async fn login(State(db): State<Db>, Json(body): Json<Fields>) -> ApiResult {
    let login = text(&body, "emailOrUsername").ok_or_else(Rejection::bad_request)?;
    let password = text(&body, "password").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    let user_id = store
        .find_login(&login)
        .filter(|id| store.check_password(id, &password))
        .ok_or_else(Rejection::unauthorized)?;
    let token = store.issue_token(&user_id);
    debug!(%user_id, "issued access token");
    Ok(item(Value::String(token)))
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let token = bearer(&headers).ok_or_else(Rejection::unauthorized)?;
    db.write().await.revoke_token(&token);
    Ok(item(Value::String(token)))
}

async fn config() -> Json<Value> {
    item(json!({ "oidc": null }))
}

// --- users ---

async fn list_users(State(db): State<Db>) -> Json<Value> {
    items(db.read().await.all("users"))
}

async fn create_user(State(db): State<Db>, Json(mut body): Json<Fields>) -> ApiResult {
    let email = text(&body, "email").ok_or_else(Rejection::bad_request)?;
    let password = body
        .remove("password")
        .and_then(|p| p.as_str().map(str::to_string))
        .filter(|p| p.len() >= 8)
        .ok_or_else(Rejection::bad_request)?;
    text(&body, "name").ok_or_else(Rejection::bad_request)?;
    let username = text(&body, "username");

    let mut store = db.write().await;
    if !store.filter("users", "email", &email).is_empty() {
        return Err(Rejection::conflict("E_EMAIL_ALREADY_IN_USE"));
    }
    if let Some(username) = &username {
        if !store.filter("users", "username", username).is_empty() {
            return Err(Rejection::conflict("E_USERNAME_ALREADY_IN_USE"));
        }
    }
    body.entry("isAdmin").or_insert(Value::Bool(false));
    let user = store.insert("users", body);
    store.set_password(&id_of(&user), &password);
    Ok(item(user))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let user_id = current_user(&db, &headers).await?;
    fetch(&db, "users", &user_id).await.map(item)
}

async fn get_user(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    fetch(&db, "users", &id).await.map(item)
}

async fn delete_user(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    let mut store = db.write().await;
    let user = store.remove("users", &id).ok_or_else(Rejection::not_found)?;
    for table in ["projectManagers", "boardMemberships", "cardMemberships", "notifications"] {
        store.remove_where(table, "userId", &id);
    }
    Ok(item(user))
}

/// Credential changes require `currentPassword` unless an admin edits
/// another account.
async fn change_credential(db: &Db, headers: &HeaderMap, id: &str, key: &str, body: Fields) -> ApiResult {
    let actor = current_user(db, headers).await?;
    let value = text(&body, key).ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    let actor_is_admin = store
        .get("users", &actor)
        .and_then(|u| u.get("isAdmin").and_then(Value::as_bool))
        .unwrap_or(false);
    if actor == id || !actor_is_admin {
        let current = text(&body, "currentPassword").unwrap_or_default();
        if !store.check_password(id, &current) {
            return Err(Rejection {
                status: StatusCode::BAD_REQUEST,
                code: "E_INVALID_CURRENT_PASSWORD",
            });
        }
    }
    if key == "password" {
        if value.len() < 8 {
            return Err(Rejection::bad_request());
        }
        store.set_password(id, &value);
        return store.get("users", id).map(item).ok_or_else(Rejection::not_found);
    }
    if !store.filter("users", key, &value).is_empty() {
        return Err(Rejection::conflict("E_CONFLICT"));
    }
    let mut change = Fields::new();
    change.insert(key.to_string(), Value::String(value));
    store.patch("users", id, change).map(item).ok_or_else(Rejection::not_found)
}

async fn change_username(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Fields>,
) -> ApiResult {
    change_credential(&db, &headers, &id, "username", body).await
}

async fn change_email(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Fields>,
) -> ApiResult {
    change_credential(&db, &headers, &id, "email", body).await
}

async fn change_password(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Fields>,
) -> ApiResult {
    change_credential(&db, &headers, &id, "password", body).await
}

async fn upload_avatar(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult {
    let (file_name, _) = read_upload(&mut multipart).await?;
    let mut change = Fields::new();
    change.insert(
        "avatarUrl".into(),
        Value::String(format!("{}/user-avatars/{id}/{file_name}", origin(&headers))),
    );
    update_record(&db, "users", &id, change).await
}

// --- projects ---

async fn list_projects(State(db): State<Db>) -> Json<Value> {
    items(db.read().await.all("projects"))
}

async fn create_project(State(db): State<Db>, headers: HeaderMap, Json(body): Json<Fields>) -> ApiResult {
    let user_id = current_user(&db, &headers).await?;
    text(&body, "name").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    let project = store.insert("projects", body);
    let mut manager = Fields::new();
    manager.insert("projectId".into(), Value::String(id_of(&project)));
    manager.insert("userId".into(), Value::String(user_id));
    store.insert("projectManagers", manager);
    Ok(item(project))
}

async fn get_project(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    let store = db.read().await;
    let project = store.get("projects", &id).ok_or_else(Rejection::not_found)?;
    let managers = store.filter("projectManagers", "projectId", &id);
    let boards = store.filter("boards", "projectId", &id);
    let board_ids: Vec<String> = boards.iter().map(id_of).collect();
    let memberships = store.filter_in("boardMemberships", "boardId", &board_ids);
    let mut user_ids: Vec<String> = managers
        .iter()
        .chain(memberships.iter())
        .filter_map(|r| r.get("userId").and_then(Value::as_str).map(str::to_string))
        .collect();
    user_ids.sort();
    user_ids.dedup();
    let users = store.filter_in("users", "id", &user_ids);
    Ok(Json(json!({
        "item": project,
        "included": {
            "users": users,
            "projectManagers": managers,
            "boards": boards,
            "boardMemberships": memberships,
        }
    })))
}

async fn delete_project(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    let mut store = db.write().await;
    let project = store.remove("projects", &id).ok_or_else(Rejection::not_found)?;
    for board in store.remove_where("boards", "projectId", &id) {
        purge_board(&mut store, &id_of(&board));
    }
    store.remove_where("projectManagers", "projectId", &id);
    Ok(item(project))
}

async fn add_project_manager(State(db): State<Db>, Path(id): Path<String>, Json(body): Json<Fields>) -> ApiResult {
    let user_id = text(&body, "userId").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    store.get("projects", &id).ok_or_else(Rejection::not_found)?;
    store.get("users", &user_id).ok_or_else(Rejection::not_found)?;
    let taken = store
        .filter("projectManagers", "projectId", &id)
        .iter()
        .any(|m| m.get("userId").and_then(Value::as_str) == Some(user_id.as_str()));
    if taken {
        return Err(Rejection::conflict("E_USER_ALREADY_PROJECT_MANAGER"));
    }
    let mut manager = Fields::new();
    manager.insert("projectId".into(), Value::String(id));
    manager.insert("userId".into(), Value::String(user_id));
    Ok(item(store.insert("projectManagers", manager)))
}

async fn upload_background(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult {
    let (file_name, _) = read_upload(&mut multipart).await?;
    let mut change = Fields::new();
    change.insert(
        "backgroundImage".into(),
        json!({ "url": format!("{}/project-background-images/{id}/{file_name}", origin(&headers)) }),
    );
    change.insert("background".into(), json!({ "type": "image" }));
    update_record(&db, "projects", &id, change).await
}

// --- boards ---

async fn create_board(
    State(db): State<Db>,
    Path(project_id): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Fields>,
) -> ApiResult {
    let user_id = current_user(&db, &headers).await?;
    text(&body, "name").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    store.get("projects", &project_id).ok_or_else(Rejection::not_found)?;
    body.insert("projectId".into(), Value::String(project_id));
    let board = store.insert("boards", body);
    let mut membership = Fields::new();
    membership.insert("boardId".into(), Value::String(id_of(&board)));
    membership.insert("userId".into(), Value::String(user_id));
    membership.insert("role".into(), Value::String("editor".into()));
    membership.insert("canComment".into(), Value::Bool(true));
    store.insert("boardMemberships", membership);
    Ok(item(board))
}

async fn get_board(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    let store = db.read().await;
    let board = store.get("boards", &id).ok_or_else(Rejection::not_found)?;
    let memberships = store.filter("boardMemberships", "boardId", &id);
    let user_ids: Vec<String> = memberships
        .iter()
        .filter_map(|m| m.get("userId").and_then(Value::as_str).map(str::to_string))
        .collect();
    let cards = store.filter("cards", "boardId", &id);
    let card_ids: Vec<String> = cards.iter().map(id_of).collect();
    Ok(Json(json!({
        "item": board,
        "included": {
            "users": store.filter_in("users", "id", &user_ids),
            "boardMemberships": memberships,
            "labels": store.filter("labels", "boardId", &id),
            "lists": store.filter("lists", "boardId", &id),
            "cards": cards,
            "cardMemberships": store.filter_in("cardMemberships", "cardId", &card_ids),
            "cardLabels": store.filter_in("cardLabels", "cardId", &card_ids),
            "tasks": store.filter_in("tasks", "cardId", &card_ids),
            "attachments": store.filter_in("attachments", "cardId", &card_ids),
        }
    })))
}

async fn delete_board(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    let mut store = db.write().await;
    let board = store.remove("boards", &id).ok_or_else(Rejection::not_found)?;
    purge_board(&mut store, &id);
    Ok(item(board))
}

async fn add_board_membership(
    State(db): State<Db>,
    Path(board_id): Path<String>,
    Json(mut body): Json<Fields>,
) -> ApiResult {
    let user_id = text(&body, "userId").ok_or_else(Rejection::bad_request)?;
    let role = text(&body, "role").filter(|r| BOARD_ROLES.contains(&r.as_str()));
    role.ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    store.get("boards", &board_id).ok_or_else(Rejection::not_found)?;
    store.get("users", &user_id).ok_or_else(Rejection::not_found)?;
    let taken = store
        .filter("boardMemberships", "boardId", &board_id)
        .iter()
        .any(|m| m.get("userId").and_then(Value::as_str) == Some(user_id.as_str()));
    if taken {
        return Err(Rejection::conflict("E_USER_ALREADY_BOARD_MEMBER"));
    }
    body.insert("boardId".into(), Value::String(board_id));
    Ok(item(store.insert("boardMemberships", body)))
}

async fn create_label(State(db): State<Db>, Path(board_id): Path<String>, Json(mut body): Json<Fields>) -> ApiResult {
    text(&body, "color").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    store.get("boards", &board_id).ok_or_else(Rejection::not_found)?;
    body.insert("boardId".into(), Value::String(board_id));
    Ok(item(store.insert("labels", body)))
}

async fn delete_label(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    let mut store = db.write().await;
    let label = store.remove("labels", &id).ok_or_else(Rejection::not_found)?;
    store.remove_where("cardLabels", "labelId", &id);
    Ok(item(label))
}

// --- lists ---

async fn create_list(State(db): State<Db>, Path(board_id): Path<String>, Json(mut body): Json<Fields>) -> ApiResult {
    text(&body, "name").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    store.get("boards", &board_id).ok_or_else(Rejection::not_found)?;
    body.insert("boardId".into(), Value::String(board_id));
    Ok(item(store.insert("lists", body)))
}

async fn delete_list(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    let mut store = db.write().await;
    let list = store.remove("lists", &id).ok_or_else(Rejection::not_found)?;
    for card in store.remove_where("cards", "listId", &id) {
        purge_card(&mut store, &id_of(&card));
    }
    Ok(item(list))
}

async fn sort_list(State(db): State<Db>, Path(id): Path<String>, Json(body): Json<Fields>) -> ApiResult {
    let order = text(&body, "type").ok_or_else(Rejection::bad_request)?;
    let (key, descending) = match order.as_str() {
        "name_asc" => ("name", false),
        "dueDate_asc" => ("dueDate", false),
        "createdAt_asc" => ("createdAt", false),
        "createdAt_desc" => ("createdAt", true),
        _ => return Err(Rejection::bad_request()),
    };
    let mut store = db.write().await;
    let list = store.get("lists", &id).ok_or_else(Rejection::not_found)?;
    let mut cards = store.filter("cards", "listId", &id);
    cards.sort_by(|a, b| {
        let (a, b) = (a.get(key).and_then(Value::as_str), b.get(key).and_then(Value::as_str));
        // Cards without the key go last.
        let ord = match (a, b) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        };
        if descending && a.is_some() && b.is_some() {
            ord.reverse()
        } else {
            ord
        }
    });
    let mut sorted = Vec::with_capacity(cards.len());
    for (index, card) in cards.iter().enumerate() {
        let mut change = Fields::new();
        change.insert("position".into(), json!((index as i64 + 1) * STRIDE));
        if let Some(card) = store.patch("cards", &id_of(card), change) {
            sorted.push(card);
        }
    }
    Ok(Json(json!({ "item": list, "included": { "cards": sorted } })))
}

// --- cards ---

async fn create_card(
    State(db): State<Db>,
    Path(list_id): Path<String>,
    headers: HeaderMap,
    Json(mut body): Json<Fields>,
) -> ApiResult {
    let user_id = current_user(&db, &headers).await?;
    text(&body, "name").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    let list = store.get("lists", &list_id).ok_or_else(Rejection::not_found)?;
    body.insert("listId".into(), Value::String(list_id));
    body.insert("boardId".into(), list.get("boardId").cloned().unwrap_or(Value::Null));
    body.insert("creatorUserId".into(), Value::String(user_id.clone()));
    body.entry("stopwatch").or_insert(Value::Null);
    let card = store.insert("cards", body);

    let mut action = Fields::new();
    action.insert("type".into(), Value::String("createCard".into()));
    action.insert("data".into(), json!({ "list": { "id": list["id"], "name": list["name"] } }));
    action.insert("cardId".into(), Value::String(id_of(&card)));
    action.insert("userId".into(), Value::String(user_id));
    store.insert("actions", action);
    Ok(item(card))
}

async fn get_card(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    fetch(&db, "cards", &id).await.map(item)
}

async fn delete_card(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    let mut store = db.write().await;
    let card = store.remove("cards", &id).ok_or_else(Rejection::not_found)?;
    purge_card(&mut store, &id);
    Ok(item(card))
}

async fn duplicate_card(State(db): State<Db>, Path(id): Path<String>, Json(body): Json<Fields>) -> ApiResult {
    let mut store = db.write().await;
    let Value::Object(mut copy) = store.get("cards", &id).ok_or_else(Rejection::not_found)? else {
        return Err(Rejection::not_found());
    };
    copy.extend(body);
    copy.remove("id");
    Ok(item(store.insert("cards", copy)))
}

async fn list_actions(State(db): State<Db>, Path(card_id): Path<String>) -> ApiResult {
    let store = db.read().await;
    store.get("cards", &card_id).ok_or_else(Rejection::not_found)?;
    Ok(items(store.filter("actions", "cardId", &card_id)))
}

async fn add_comment(
    State(db): State<Db>,
    Path(card_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Fields>,
) -> ApiResult {
    let user_id = current_user(&db, &headers).await?;
    let comment = text(&body, "text").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    store.get("cards", &card_id).ok_or_else(Rejection::not_found)?;
    let mut action = Fields::new();
    action.insert("type".into(), Value::String("commentCard".into()));
    action.insert("data".into(), json!({ "text": comment }));
    action.insert("cardId".into(), Value::String(card_id.clone()));
    action.insert("userId".into(), Value::String(user_id.clone()));
    let action = store.insert("actions", action);

    // Card members other than the author are notified.
    for member in store.filter("cardMemberships", "cardId", &card_id) {
        let Some(member_id) = member.get("userId").and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        if member_id == user_id {
            continue;
        }
        let mut notification = Fields::new();
        notification.insert("isRead".into(), Value::Bool(false));
        notification.insert("userId".into(), Value::String(member_id));
        notification.insert("actionId".into(), Value::String(id_of(&action)));
        notification.insert("cardId".into(), Value::String(card_id.clone()));
        store.insert("notifications", notification);
    }
    Ok(item(action))
}

async fn edit_comment(State(db): State<Db>, Path(id): Path<String>, Json(body): Json<Fields>) -> ApiResult {
    let comment = text(&body, "text").ok_or_else(Rejection::bad_request)?;
    let mut change = Fields::new();
    change.insert("data".into(), json!({ "text": comment }));
    update_record(&db, "actions", &id, change).await
}

async fn add_card_label(State(db): State<Db>, Path(card_id): Path<String>, Json(body): Json<Fields>) -> ApiResult {
    let label_id = text(&body, "labelId").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    store.get("cards", &card_id).ok_or_else(Rejection::not_found)?;
    store.get("labels", &label_id).ok_or_else(Rejection::not_found)?;
    let taken = store
        .filter("cardLabels", "cardId", &card_id)
        .iter()
        .any(|cl| cl.get("labelId").and_then(Value::as_str) == Some(label_id.as_str()));
    if taken {
        return Err(Rejection::conflict("E_LABEL_ALREADY_IN_CARD"));
    }
    let mut link = Fields::new();
    link.insert("cardId".into(), Value::String(card_id));
    link.insert("labelId".into(), Value::String(label_id));
    Ok(item(store.insert("cardLabels", link)))
}

async fn remove_card_label(State(db): State<Db>, Path((card_id, label_id)): Path<(String, String)>) -> ApiResult {
    let mut store = db.write().await;
    let link = store
        .filter("cardLabels", "cardId", &card_id)
        .into_iter()
        .find(|cl| cl.get("labelId").and_then(Value::as_str) == Some(label_id.as_str()))
        .ok_or_else(Rejection::not_found)?;
    store.remove("cardLabels", &id_of(&link));
    Ok(item(link))
}

async fn add_card_membership(
    State(db): State<Db>,
    Path(card_id): Path<String>,
    Json(body): Json<Fields>,
) -> ApiResult {
    let user_id = text(&body, "userId").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    store.get("cards", &card_id).ok_or_else(Rejection::not_found)?;
    store.get("users", &user_id).ok_or_else(Rejection::not_found)?;
    let taken = store
        .filter("cardMemberships", "cardId", &card_id)
        .iter()
        .any(|m| m.get("userId").and_then(Value::as_str) == Some(user_id.as_str()));
    if taken {
        return Err(Rejection::conflict("E_USER_ALREADY_CARD_MEMBER"));
    }
    let mut membership = Fields::new();
    membership.insert("cardId".into(), Value::String(card_id));
    membership.insert("userId".into(), Value::String(user_id));
    Ok(item(store.insert("cardMemberships", membership)))
}

async fn remove_card_membership(
    State(db): State<Db>,
    Path(card_id): Path<String>,
    Json(body): Json<Fields>,
) -> ApiResult {
    let user_id = text(&body, "userId").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    let membership = store
        .filter("cardMemberships", "cardId", &card_id)
        .into_iter()
        .find(|m| m.get("userId").and_then(Value::as_str) == Some(user_id.as_str()))
        .ok_or_else(Rejection::not_found)?;
    store.remove("cardMemberships", &id_of(&membership));
    Ok(item(membership))
}

async fn create_task(State(db): State<Db>, Path(card_id): Path<String>, Json(mut body): Json<Fields>) -> ApiResult {
    text(&body, "name").ok_or_else(Rejection::bad_request)?;
    let mut store = db.write().await;
    store.get("cards", &card_id).ok_or_else(Rejection::not_found)?;
    body.insert("cardId".into(), Value::String(card_id));
    body.entry("isCompleted").or_insert(Value::Bool(false));
    Ok(item(store.insert("tasks", body)))
}

async fn upload_attachment(
    State(db): State<Db>,
    Path(card_id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult {
    let user_id = current_user(&db, &headers).await?;
    let (file_name, contents) = read_upload(&mut multipart).await?;
    let mut store = db.write().await;
    store.get("cards", &card_id).ok_or_else(Rejection::not_found)?;
    let mut attachment = Fields::new();
    attachment.insert("name".into(), Value::String(file_name.clone()));
    attachment.insert("filename".into(), Value::String(file_name.clone()));
    attachment.insert("dirname".into(), Value::String("private/attachments".into()));
    attachment.insert("cardId".into(), Value::String(card_id));
    attachment.insert("creatorUserId".into(), Value::String(user_id));
    let id = id_of(&store.insert("attachments", attachment));
    store.store_file(&id, contents);
    let mut change = Fields::new();
    change.insert(
        "url".into(),
        Value::String(format!("{}/attachments/{id}/download/{file_name}", origin(&headers))),
    );
    store.patch("attachments", &id, change).map(item).ok_or_else(Rejection::not_found)
}

async fn download_attachment(
    State(db): State<Db>,
    Path((id, _file_name)): Path<(String, String)>,
) -> Result<Vec<u8>, Rejection> {
    db.read().await.file(&id).ok_or_else(Rejection::not_found)
}

// --- notifications ---

async fn list_notifications(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    let user_id = current_user(&db, &headers).await?;
    Ok(items(db.read().await.filter("notifications", "userId", &user_id)))
}

async fn get_notification(State(db): State<Db>, Path(id): Path<String>) -> ApiResult {
    fetch(&db, "notifications", &id).await.map(item)
}
