#![cfg(feature = "web")]

//! HTML rendering. Each page renders its body template; the layout then
//! wraps it with the navigation menu and any pending notices.

use handlebars::Handlebars;
use serde::Serialize;
use serde_json::{Value, json};

use crate::app::AppState;
use crate::error::{DashboardError, Result};
use crate::export::without_columns;
use crate::profile;
use crate::router;
use crate::session::{Notice, NoticeKind, Page, SessionState};
use crate::table::Table;
use crate::users::{COL_PASSWORD, Role};

const TEMPLATES: [(&str, &str); 10] = [
    ("layout", include_str!("templates/layout.hbs")),
    ("signin", include_str!("templates/signin.hbs")),
    ("signup", include_str!("templates/signup.hbs")),
    ("home", include_str!("templates/home.hbs")),
    ("dashboard", include_str!("templates/dashboard.hbs")),
    ("profile", include_str!("templates/profile.hbs")),
    ("project_content", include_str!("templates/project_content.hbs")),
    ("feedback", include_str!("templates/feedback.hbs")),
    ("chatbot", include_str!("templates/chatbot.hbs")),
    ("admin", include_str!("templates/admin.hbs")),
];

/// Sample Gini values for the map on the home page.
const SAMPLE_GINI: [(&str, f64); 7] = [
    ("United States", 41.4),
    ("India", 35.7),
    ("Brazil", 53.4),
    ("South Africa", 63.0),
    ("Germany", 31.7),
    ("Norway", 27.0),
    ("China", 38.5),
];

#[derive(Serialize)]
struct MenuEntry {
    title: &'static str,
    active: bool,
}

#[derive(Serialize)]
struct TableView<'a> {
    header: &'a [String],
    rows: &'a [Vec<String>],
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<&'a str>,
}

impl<'a> TableView<'a> {
    fn new(table: &'a Table) -> Self {
        TableView {
            header: &table.header,
            rows: &table.rows,
            file_name: None,
        }
    }
}

/// Compiled templates.
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut registry = Handlebars::new();
        for (name, source) in TEMPLATES {
            registry
                .register_template_string(name, source)
                .map_err(|e| DashboardError::Template(e.to_string()))?;
        }
        Ok(Templates { registry })
    }

    pub fn render(&self, name: &str, data: &Value) -> Result<String> {
        self.registry
            .render(name, data)
            .map_err(|e| DashboardError::Template(e.to_string()))
    }
}

/// JSON that is safe to drop into a `<script>` element.
fn script_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

async fn animation_data(state: &AppState, id: &str, url: &str) -> Result<Value> {
    Ok(match state.animations.load(url).await {
        Some(anim) => json!({ "animation": script_json(&anim)?, "animation_id": id }),
        None => json!({}),
    })
}

fn admin_table(load: Result<Table>, hidden: &[&str], notices: &mut Vec<Notice>) -> Option<Table> {
    match load {
        Ok(table) => Some(without_columns(&table, hidden)),
        Err(DashboardError::NotFound(_)) => None,
        Err(e) => {
            notices.push(Notice {
                kind: NoticeKind::Error,
                text: e.user_message(),
            });
            None
        }
    }
}

/// Renders `page` for `session`. `page` must already have gone through
/// [`router::resolve`].
pub async fn render_page(
    state: &AppState,
    session: &SessionState,
    page: Page,
    mut notices: Vec<Notice>,
) -> Result<String> {
    let settings = &state.settings;

    let (template, body_data) = match page {
        Page::SignIn => (
            "signin",
            animation_data(state, "signin", &settings.animations.signin).await?,
        ),
        Page::SignUp => (
            "signup",
            animation_data(state, "signup", &settings.animations.signup).await?,
        ),
        Page::Home | Page::Logout => {
            let mut data = animation_data(state, "home", &settings.animations.home).await?;
            let map: Vec<Value> = SAMPLE_GINI
                .iter()
                .map(|(country, gini)| json!({ "country": country, "gini": gini }))
                .collect();
            data["map_data"] = Value::String(script_json(&Value::Array(map))?);
            ("home", data)
        }
        Page::Dashboard => ("dashboard", json!({ "embed_url": settings.dashboard.embed_url })),
        Page::Profile => {
            let data = match profile::view(&state.users, session) {
                Ok(fields) => {
                    let has_picture = session
                        .current_user()
                        .map(|email| {
                            profile::picture_path(&settings.storage.profile_pics_dir(), email)
                                .exists()
                        })
                        .unwrap_or(false);
                    json!({ "profile": fields, "has_picture": has_picture })
                }
                Err(e) => {
                    notices.push(Notice {
                        kind: NoticeKind::Error,
                        text: e.user_message(),
                    });
                    json!({})
                }
            };
            ("profile", data)
        }
        Page::ProjectContent => ("project_content", json!({})),
        Page::Feedback => {
            let email = session.current_user().unwrap_or_default();
            let name = state
                .users
                .find_by_email(email)
                .ok()
                .flatten()
                .map(|u| u.name)
                .unwrap_or_default();
            ("feedback", json!({ "name": name, "email": email }))
        }
        Page::AiChatbot => {
            let data = match &session.dataset {
                Some(dataset) => {
                    let preview = dataset.preview();
                    let mut view = TableView::new(&preview);
                    view.file_name = Some(&dataset.file_name);
                    json!({
                        "dataset": view,
                        "history": session.chat_history.messages(),
                    })
                }
                None => json!({}),
            };
            ("chatbot", data)
        }
        Page::AdminPanel => {
            let data = if session.role() != Some(Role::Admin) {
                json!({ "denied": true })
            } else {
                let users = admin_table(state.users.load_table(), &[COL_PASSWORD], &mut notices);
                let feedback = admin_table(state.feedback.load_table(), &[], &mut notices);
                json!({
                    "users": users.as_ref().map(TableView::new),
                    "feedback": feedback.as_ref().map(TableView::new),
                })
            };
            ("admin", data)
        }
    };

    let body = state.templates.render(template, &body_data)?;
    let menu: Vec<MenuEntry> = router::menu(session)
        .into_iter()
        .map(|p| MenuEntry {
            title: p.title(),
            active: p == page,
        })
        .collect();

    state.templates.render(
        "layout",
        &json!({
            "title": page.title(),
            "menu": menu,
            "notices": notices,
            "current_user": session.current_user(),
            "needs_lottie": body_data.get("animation").is_some(),
            "needs_plotly": template == "home",
            "body": body,
        }),
    )
}
