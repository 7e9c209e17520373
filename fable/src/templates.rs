//! HTML rendering via minijinja over embedded templates.

use axum::response::Html;
use minijinja::Environment;

use crate::errors::Error;

/// Build the template environment with all embedded page templates.
pub fn environment() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("enter_keys.html", include_str!("../templates/enter_keys.html"))?;
    env.add_template("index.html", include_str!("../templates/index.html"))?;
    env.add_template("book.html", include_str!("../templates/book.html"))?;
    env.add_template("saved.html", include_str!("../templates/saved.html"))?;
    Ok(env)
}

/// Render a named template with the given context.
pub fn render(env: &Environment<'static>, name: &str, ctx: minijinja::Value) -> Result<Html<String>, Error> {
    let template = env.get_template(name).map_err(|e| Error::Internal {
        operation: format!("load template {name}: {e}"),
    })?;
    let html = template.render(ctx).map_err(|e| Error::Internal {
        operation: format!("render template {name}: {e}"),
    })?;
    Ok(Html(html))
}
