//! Navigation menu and page selection.
//!
//! The router never errors: a page the session may not see, or a name that
//! is not a page at all, sends the session to its default page instead.

use crate::auth;
use crate::session::{Page, SessionState};
use crate::users::Role;

const LOGGED_OUT_MENU: [Page; 2] = [Page::SignIn, Page::SignUp];

const LOGGED_IN_MENU: [Page; 7] = [
    Page::Home,
    Page::Dashboard,
    Page::Profile,
    Page::ProjectContent,
    Page::Feedback,
    Page::AiChatbot,
    Page::Logout,
];

/// Policy check
///
/// # Arguments
/// * `role` - Role of the signed-in user, `None` for a logged-out session
/// * `page` - Page being asked for
///
/// # Returns
/// * `bool` - Whether the page may be shown and appears in the menu
pub fn can_view(role: Option<Role>, page: Page) -> bool {
    match role {
        None => LOGGED_OUT_MENU.contains(&page),
        Some(Role::Admin) => page == Page::AdminPanel || LOGGED_IN_MENU.contains(&page),
        Some(Role::User) => LOGGED_IN_MENU.contains(&page),
    }
}

/// Ordered menu for the session. Admins get Admin Panel just before Logout.
pub fn menu(session: &SessionState) -> Vec<Page> {
    match session.role() {
        None => LOGGED_OUT_MENU.to_vec(),
        Some(role) => {
            let mut pages = LOGGED_IN_MENU.to_vec();
            if can_view(Some(role), Page::AdminPanel) {
                pages.insert(pages.len() - 1, Page::AdminPanel);
            }
            pages
        }
    }
}

pub fn default_page(session: &SessionState) -> Page {
    if session.logged_in() {
        Page::Home
    } else {
        Page::SignIn
    }
}

/// Page to render for the session. Repairs `active_page` in place when it is
/// not permitted for the current role.
pub fn resolve(session: &mut SessionState) -> Page {
    let page = session.active_page();
    if can_view(session.role(), page) && page != Page::Logout {
        page
    } else {
        let fallback = default_page(session);
        session.set_active_page(fallback);
        fallback
    }
}

/// Handle a menu button press
///
/// Unknown titles and forbidden pages fall back to the default page; Logout
/// logs the session out.
///
/// # Arguments
/// * `session` - Session whose active page changes
/// * `title` - Button label as posted by the menu form
///
/// # Returns
/// * `Page` - The page that will be rendered next
pub fn navigate(session: &mut SessionState, title: &str) -> Page {
    match Page::from_title(title) {
        Some(Page::Logout) if session.logged_in() => {
            auth::logout(session);
        }
        Some(page) if can_view(session.role(), page) => {
            session.set_active_page(page);
        }
        _ => {
            let fallback = default_page(session);
            session.set_active_page(fallback);
        }
    }
    resolve(session)
}
