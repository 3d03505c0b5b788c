/*!
# Global Income Inequality Analysis

A small web application around an inequality dashboard: visitors sign up and
sign in, browse an embedded BI dashboard, edit their profile, leave feedback
and ask a chatbot about a dataset they upload.

## Architecture

Every button press is a form post. The handler updates the caller's session,
redirects to `/`, and the router re-renders whichever page is now active.

### Session layer
- **Session State** ([`session`]) - per-browser context: auth state, active
  page, chat history, uploaded dataset, pending notices
- **Auth** ([`auth`]) - `LoggedOut`/`LoggedIn` transitions, Argon2id hashes
- **Router** ([`router`]) - role-gated menu, page fallback, Logout handling

### Data layer
- **Tables** ([`table`]) - CSV files with a header row, rewritten atomically
  under a per-table lock
- **Users** ([`users`]) and **Feedback** ([`feedback`]) stores on top of it

### Chatbot
- **Summary** ([`summary`]) - country / year / gini digest of an upload
- **Chat** ([`chat`]) - prompt assembly and the completion backend

### Web layer (feature `web`)
- **app** - axum routes and handlers
- **pages** - handlebars templates
- **export** - xlsx downloads for the admin panel
- **animation** - best-effort Lottie fetches

## Configuration

See [`settings::Settings`]. Everything has a default; override with
`dashboard.toml` or `DASHBOARD_*` environment variables.
*/

pub mod auth;
pub mod chat;
pub mod error;
pub mod feedback;
pub mod profile;
pub mod router;
pub mod session;
pub mod settings;
pub mod summary;
pub mod table;
pub mod users;

#[cfg(feature = "web")]
pub mod animation;
#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod export;
#[cfg(feature = "web")]
pub mod pages;

pub use error::{DashboardError, Result};
pub use session::{Page, SessionState};
pub use summary::generate_dashboard_summary;
