//! Template environment and page rendering.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use minijinja::{Environment, Value, context};
use tracing::error;

use cardbank_ledger::Account;

use crate::app::AppState;
use crate::app::dto::AccountView;
use crate::context::SessionHandle;

const TEMPLATES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../../templates/layout.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("about.html", include_str!("../../templates/about.html")),
    ("services.html", include_str!("../../templates/services.html")),
    ("contact.html", include_str!("../../templates/contact.html")),
    ("contact_success.html", include_str!("../../templates/contact_success.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("register.html", include_str!("../../templates/register.html")),
    ("dashboard.html", include_str!("../../templates/dashboard.html")),
    ("transfer.html", include_str!("../../templates/transfer.html")),
    ("payment.html", include_str!("../../templates/payment.html")),
    ("deposit.html", include_str!("../../templates/deposit.html")),
    ("recharge.html", include_str!("../../templates/recharge.html")),
    ("recharge_success.html", include_str!("../../templates/recharge_success.html")),
    ("transaction_history.html", include_str!("../../templates/transaction_history.html")),
    ("soon.html", include_str!("../../templates/soon.html")),
    ("error.html", include_str!("../../templates/error.html")),
];

/// Compiled templates. `.html` templates are auto-escaped.
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn render(&self, name: &str, ctx: Value) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}

/// Render a full page. Pending flashes are consumed and shown; `user`
/// (if any) drives the signed-in navigation.
pub fn page(
    state: &AppState,
    session: &SessionHandle,
    user: Option<&Account>,
    template: &str,
    ctx: Value,
) -> Response {
    let ctx = context! {
        flashes => session.take_flashes(),
        logged_in => session.user_id().is_some(),
        user => user.map(AccountView::from),
        ..ctx
    };
    render_with_status(state, StatusCode::OK, template, ctx)
}

pub fn render_with_status(
    state: &AppState,
    status: StatusCode,
    template: &str,
    ctx: Value,
) -> Response {
    match state.views.render(template, ctx) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, template, "template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
