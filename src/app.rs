#![cfg(feature = "web")]

//! HTTP surface. Every form post updates the session and redirects back to
//! `/`, which re-runs the router and renders whatever page is now active.

use axum::{
    Form, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::{debug, error, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::animation::AnimationLoader;
use crate::auth::{self, SignUp};
use crate::chat::{self, CompletionBackend, OpenAiClient};
use crate::error::{DashboardError, Result};
use crate::export::{self, XLSX_CONTENT_TYPE};
use crate::feedback::{FeedbackRecord, FeedbackStore};
use crate::pages::{self, Templates};
use crate::profile;
use crate::router;
use crate::session::{NoticeKind, Page, SessionRegistry, SessionState};
use crate::settings::Settings;
use crate::summary::Dataset;
use crate::users::{COL_PASSWORD, UserStore};

pub const SESSION_COOKIE: &str = "session";

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared by every request.
pub struct AppState {
    pub settings: Settings,
    pub users: UserStore,
    pub feedback: FeedbackStore,
    pub sessions: SessionRegistry,
    pub templates: Templates,
    pub completions: Arc<dyn CompletionBackend>,
    pub animations: AnimationLoader,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        settings: Settings,
        completions: Arc<dyn CompletionBackend>,
        animations: AnimationLoader,
    ) -> Result<Self> {
        Ok(AppState {
            users: UserStore::new(settings.storage.users_file()),
            feedback: FeedbackStore::new(settings.storage.feedback_file()),
            sessions: SessionRegistry::new(),
            templates: Templates::new()?,
            completions,
            animations,
            settings,
        })
    }

    /// State wired to the real completion API and animation host.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let completions = Arc::new(OpenAiClient::new(&settings.openai)?);
        Self::new(settings, completions, AnimationLoader::new())
    }
}

#[derive(Deserialize)]
struct NavigateForm {
    page: String,
}

#[derive(Deserialize)]
struct SignInForm {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct SignUpForm {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct FeedbackForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    feedback: String,
}

#[derive(Deserialize)]
struct ChatForm {
    message: String,
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/navigate", post(navigate))
        .route("/signin", post(sign_in))
        .route("/signup", post(sign_up))
        .route("/logout", post(logout))
        .route("/profile", post(save_profile))
        .route("/profile/picture", get(profile_picture).post(upload_profile_picture))
        .route("/feedback", post(submit_feedback))
        .route("/chat/dataset", post(upload_dataset))
        .route("/chat", post(send_chat))
        .route("/admin/export/:table", get(admin_export))
        .nest_service("/static", ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(axum::middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(settings: Settings) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let bind = settings.server.bind.clone();
    let state = Arc::new(AppState::from_settings(settings)?);
    let app = build_router(state);

    let listener = TcpListener::bind(&bind).await?;
    info!("Listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Request logging middleware.
async fn log_requests(request: axum::extract::Request, next: axum::middleware::Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    info!("{} {} -> {}", method, path, response.status().as_u16());
    response
}

/// Finds the caller's session, starting a new one (and setting the cookie)
/// when the cookie is missing or stale.
fn session_id(state: &AppState, jar: CookieJar) -> (CookieJar, String) {
    let existing = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let id = state.sessions.resolve(existing.as_deref());
    if existing.as_deref() == Some(id.as_str()) {
        return (jar, id);
    }
    let cookie = Cookie::build((SESSION_COOKIE, id.clone()))
        .path("/")
        .http_only(true)
        .build();
    (jar.add(cookie), id)
}

fn back_home(jar: CookieJar) -> Response {
    (jar, Redirect::to("/")).into_response()
}

/// Runs blocking auth or store work against a copy of the session, on the
/// blocking pool and without the registry lock, then writes the copy's auth
/// state back. If the session logged in or out meanwhile, the copy is
/// discarded.
async fn run_blocking<F>(state: &SharedState, id: &str, success: &'static str, work: F)
where
    F: FnOnce(&AppState, &mut SessionState) -> Result<()> + Send + 'static,
{
    let Some(mut copy) = state.sessions.snapshot(id) else {
        return;
    };
    let epoch = copy.login_epoch();
    let app = Arc::clone(state);
    let outcome = tokio::task::spawn_blocking(move || {
        let result = work(&app, &mut copy);
        (copy, result)
    })
    .await;

    state.sessions.with(id, |s| match outcome {
        Ok(_) if s.login_epoch() != epoch => s.notify(
            NoticeKind::Error,
            "Your session changed while this was running. Please try again.",
        ),
        Ok((copy, result)) => {
            if result.is_ok() {
                s.adopt_auth(&copy);
            }
            report(s, result, success);
        }
        Err(e) => {
            error!("background task failed: {}", e);
            s.notify(NoticeKind::Error, "Something went wrong. Please try again.");
        }
    });
}

/// Reports `result` on the session as a success or error notice.
fn report(session: &mut SessionState, result: Result<()>, success: &str) {
    match result {
        Ok(()) => session.notify(NoticeKind::Success, success),
        Err(e) => session.notify(NoticeKind::Error, e.user_message()),
    }
}

async fn index(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let (jar, id) = session_id(&state, jar);
    let (page, session, notices) = state.sessions.with(&id, |s| {
        let page = router::resolve(s);
        let notices = s.take_notices();
        (page, s.clone(), notices)
    });

    match pages::render_page(&state, &session, page, notices).await {
        Ok(html) => (jar, Html(html)).into_response(),
        Err(e) => {
            error!("failed to render {}: {}", page, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

async fn navigate(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<NavigateForm>,
) -> Response {
    let (jar, id) = session_id(&state, jar);
    state.sessions.with(&id, |s| {
        let was_logged_in = s.logged_in();
        router::navigate(s, &form.page);
        if was_logged_in && !s.logged_in() {
            s.notify(NoticeKind::Success, "Logged out successfully!");
        }
    });
    back_home(jar)
}

async fn sign_in(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<SignInForm>,
) -> Response {
    let (jar, id) = session_id(&state, jar);
    run_blocking(&state, &id, "Login successful!", move |app, s| {
        auth::sign_in(&app.users, s, &form.email, &form.password)
    })
    .await;
    back_home(jar)
}

async fn sign_up(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<SignUpForm>,
) -> Response {
    let (jar, id) = session_id(&state, jar);
    run_blocking(
        &state,
        &id,
        "Sign up successful! Please sign in now.",
        move |app, s| {
            auth::sign_up(
                &app.users,
                s,
                SignUp {
                    name: &form.name,
                    email: &form.email,
                    password: &form.password,
                },
                &app.settings.admin.email,
            )
        },
    )
    .await;
    back_home(jar)
}

async fn logout(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let (jar, id) = session_id(&state, jar);
    state.sessions.with(&id, |s| {
        auth::logout(s);
        s.notify(NoticeKind::Success, "Logged out successfully!");
    });
    back_home(jar)
}

async fn save_profile(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let (jar, id) = session_id(&state, jar);
    let fields: Vec<(String, String)> = form.into_iter().collect();
    run_blocking(&state, &id, "Profile updated successfully!", move |app, s| {
        profile::save(&app.users, s, &fields)
    })
    .await;
    back_home(jar)
}

/// Pulls the first file field called `name` out of a multipart body.
async fn read_upload(multipart: &mut Multipart, name: &str) -> Result<Option<(String, Vec<u8>)>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DashboardError::Validation(format!("Upload failed: {}", e)))?
    {
        if field.name() != Some(name) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| DashboardError::Validation(format!("Upload failed: {}", e)))?;
        if bytes.is_empty() {
            return Ok(None);
        }
        return Ok(Some((file_name, bytes.to_vec())));
    }
    Ok(None)
}

async fn upload_profile_picture(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let (jar, id) = session_id(&state, jar);
    let Some(email) = state
        .sessions
        .snapshot(&id)
        .and_then(|s| s.current_user().map(str::to_string))
    else {
        return back_home(jar);
    };

    let result = match read_upload(&mut multipart, "picture").await {
        Ok(Some((file_name, bytes))) => profile::save_picture(
            &state.settings.storage.profile_pics_dir(),
            &email,
            &file_name,
            &bytes,
        )
        .map(|_| ()),
        Ok(None) => Err(DashboardError::Validation("Please choose an image to upload.".to_string())),
        Err(e) => Err(e),
    };
    state
        .sessions
        .with(&id, |s| report(s, result, "Profile picture updated!"));
    back_home(jar)
}

async fn profile_picture(State(state): State<SharedState>, jar: CookieJar) -> Response {
    let (jar, id) = session_id(&state, jar);
    let picture = state
        .sessions
        .snapshot(&id)
        .and_then(|s| s.current_user().map(str::to_string))
        .and_then(|email| profile::load_picture(&state.settings.storage.profile_pics_dir(), &email));

    match picture {
        Some(bytes) => (jar, [(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response(),
        None => (StatusCode::NOT_FOUND, jar, "No profile picture").into_response(),
    }
}

async fn submit_feedback(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<FeedbackForm>,
) -> Response {
    let (jar, id) = session_id(&state, jar);
    if !state.sessions.snapshot(&id).is_some_and(|s| s.logged_in()) {
        state.sessions.with(&id, |s| {
            router::resolve(s);
        });
        return back_home(jar);
    }

    let record = FeedbackRecord {
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        feedback: form.feedback,
    };
    run_blocking(&state, &id, "Thank you for your feedback!", move |app, _| {
        app.feedback.append(&record)
    })
    .await;
    back_home(jar)
}

async fn upload_dataset(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Response {
    let (jar, id) = session_id(&state, jar);
    if !state.sessions.snapshot(&id).is_some_and(|s| s.logged_in()) {
        return back_home(jar);
    }

    let parsed = match read_upload(&mut multipart, "dataset").await {
        Ok(Some((file_name, bytes))) => Dataset::from_upload(&file_name, &bytes),
        Ok(None) => Err(DashboardError::Validation("Please choose a file to upload.".to_string())),
        Err(e) => Err(e),
    };
    state.sessions.with(&id, |s| match parsed {
        Ok(dataset) => {
            s.notify(NoticeKind::Success, format!("Loaded {}.", dataset.file_name));
            s.dataset = Some(dataset);
        }
        Err(e) => s.notify(NoticeKind::Error, e.user_message()),
    });
    back_home(jar)
}

async fn send_chat(
    State(state): State<SharedState>,
    jar: CookieJar,
    Form(form): Form<ChatForm>,
) -> Response {
    let (jar, id) = session_id(&state, jar);
    let Some(session) = state.sessions.snapshot(&id).filter(|s| s.logged_in()) else {
        return back_home(jar);
    };
    let Some(dataset) = &session.dataset else {
        state.sessions.with(&id, |s| {
            s.notify(NoticeKind::Info, "Please upload a dataset to start the chatbot.")
        });
        return back_home(jar);
    };

    let question = form.message.trim().to_string();
    let answer = chat::ask(
        state.completions.as_ref(),
        &dataset.summary,
        &session.chat_history,
        &question,
    )
    .await;

    state.sessions.with(&id, |s| {
        // The session may have logged out, switched user or replaced the
        // dataset while the backend was answering.
        let same_dataset = s
            .dataset
            .as_ref()
            .is_some_and(|d| d.file_name == dataset.file_name && d.summary == dataset.summary);
        if s.login_epoch() != session.login_epoch() || !same_dataset {
            debug!("dropping chat reply for a session that has moved on");
            return;
        }
        match answer {
            Ok(reply) => s.chat_history.push_exchange(question, reply),
            Err(e) => s.notify(NoticeKind::Error, e.user_message()),
        }
    });
    back_home(jar)
}

async fn admin_export(
    State(state): State<SharedState>,
    jar: CookieJar,
    Path(table): Path<String>,
) -> Response {
    let (jar, id) = session_id(&state, jar);
    let role = state.sessions.snapshot(&id).and_then(|s| s.role());
    if !router::can_view(role, Page::AdminPanel) {
        return (StatusCode::FORBIDDEN, jar, "Access Denied").into_response();
    }

    let loaded = match table.as_str() {
        "users" => state
            .users
            .load_table()
            .map(|t| export::without_columns(&t, &[COL_PASSWORD])),
        "feedback" => state.feedback.load_table(),
        _ => return (StatusCode::NOT_FOUND, jar, "Not found").into_response(),
    };

    match loaded.and_then(|t| export::to_xlsx(&t, &table)) {
        Ok(bytes) => (
            jar,
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}.xlsx\"", table),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(DashboardError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, jar, "No such table yet").into_response()
        }
        Err(e) => {
            error!("export of {} failed: {}", table, e);
            (StatusCode::INTERNAL_SERVER_ERROR, jar, "Export failed").into_response()
        }
    }
}
