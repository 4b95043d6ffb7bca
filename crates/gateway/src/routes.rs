//! Request handlers.

use {
    axum::{
        Json,
        extract::{Multipart, Path, Query, State},
        http::header,
        response::{Html, IntoResponse, Redirect},
    },
    axum_extra::extract::Host,
    serde::{Deserialize, Serialize},
};

use {
    tgrelay_common::Error,
    tgrelay_messaging::{ChatMessage, DEFAULT_HISTORY_LIMIT},
    tgrelay_products::Product,
    tgrelay_sessions::LoginOutcome,
};

use crate::{error::ApiError, server::AppState};

/// Query carrying only the account phone.
#[derive(Deserialize)]
pub struct PhoneQuery {
    pub phone: String,
}

/// Query for a history fetch.
#[derive(Deserialize)]
pub struct MessagesQuery {
    pub phone: String,
    pub uname: String,
}

/// Query for a media send.
#[derive(Deserialize)]
pub struct MediaQuery {
    pub phone: String,
    pub username: String,
}

/// Body of a text send.
#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub phone: String,
    pub username: String,
    pub message_text: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    status: &'static str,
    qr_link_url: Option<String>,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            status: outcome.status.as_str(),
            qr_link_url: outcome.qr_link_url,
        }
    }
}

#[derive(Serialize)]
pub struct CheckLoginResponse {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

#[derive(Serialize)]
pub struct MessagesResponse {
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct ProductsResponse {
    products: Vec<Product>,
}

#[derive(Serialize)]
pub struct SendStatus {
    status: &'static str,
}

impl SendStatus {
    fn ok() -> Self {
        Self { status: "ok" }
    }
}

/// Land callers on the endpoint index.
pub async fn root() -> Redirect {
    Redirect::to("/docs")
}

static DOCS_HTML: &str = include_str!("docs.html");

/// Minimal endpoint index.
pub async fn docs() -> Html<&'static str> {
    Html(DOCS_HTML)
}

/// Begin a QR login for the given phone. Responds with the callback URL for
/// the challenge image, or `logined` if the account is already authorized.
pub async fn login(
    State(state): State<AppState>,
    Host(host): Host,
    Query(query): Query<PhoneQuery>,
) -> Result<Json<LoginResponse>, ApiError> {
    let base = format!("http://{host}");
    let outcome = state.login.begin_login(&query.phone, &base).await?;
    Ok(Json(outcome.into()))
}

/// Serve the current QR challenge as a PNG. Clients poll this while the user
/// scans; every call may rotate the challenge token.
pub async fn qr_code(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let png = state.login.challenge_png(&phone).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], png))
}

/// Poll the authorization state for a phone. Always responds 200; an unknown
/// phone reports `error` rather than failing.
pub async fn check_login(
    State(state): State<AppState>,
    Query(query): Query<PhoneQuery>,
) -> Json<CheckLoginResponse> {
    let response = match state.login.check_authorization(&query.phone).await {
        Ok(true) => CheckLoginResponse {
            status: "logined",
            detail: None,
        },
        Ok(false) => CheckLoginResponse {
            status: "waiting_qr_login",
            detail: None,
        },
        Err(Error::SessionNotFound(_)) => CheckLoginResponse {
            status: "error",
            detail: Some("Client not found".into()),
        },
        Err(e) => CheckLoginResponse {
            status: "error",
            detail: Some(e.to_string()),
        },
    };
    Json(response)
}

/// Fetch the last messages exchanged with a counterpart.
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state
        .conversations
        .list_recent(&query.phone, &query.uname, DEFAULT_HISTORY_LIMIT)
        .await?;
    Ok(Json(MessagesResponse { messages }))
}

/// Send a text message.
pub async fn send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendStatus>, ApiError> {
    state
        .conversations
        .send_text(&request.phone, &request.username, &request.message_text)
        .await?;
    Ok(Json(SendStatus::ok()))
}

/// Send an uploaded file as a document attachment.
pub async fn send_media(
    State(state): State<AppState>,
    Query(query): Query<MediaQuery>,
    mut multipart: Multipart,
) -> Result<Json<SendStatus>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| Error::InvalidRequest("missing media file field".into()))?;
    state
        .conversations
        .send_media(&query.phone, &query.username, &bytes, &file_name)
        .await?;
    Ok(Json(SendStatus::ok()))
}

/// Scrape product search results.
pub async fn wild_search(
    State(state): State<AppState>,
    Query(query): Query<WildQuery>,
) -> Result<Json<ProductsResponse>, ApiError> {
    let products = state.products.search(&query.query).await?;
    Ok(Json(ProductsResponse { products }))
}

#[derive(Deserialize)]
pub struct WildQuery {
    pub query: String,
}
