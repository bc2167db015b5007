//! Directory listing served when a request names a folder with no index page.

use askama::Template;
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Characters escaped when a file name is used as a single URL path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Root directory the listing is rendered from
#[derive(Clone)]
pub struct ListingRoot(pub Arc<PathBuf>);

/// Fallback for requests the file service could not answer with a file.
///
/// Directories get an HTML listing of their entries; anything else is a 404.
pub async fn directory_listing(State(ListingRoot(root)): State<ListingRoot>, uri: Uri) -> Response {
    let Some(dir) = resolve(&root, uri.path()) else {
        return not_found();
    };

    if !dir.is_dir() {
        return not_found();
    }

    if !uri.path().ends_with('/') {
        return Redirect::permanent(&format!("{}/", uri.path())).into_response();
    }

    let mut entries = match read_entries(&dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Error reading directory {}: {e}", dir.display());
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error reading directory").into_response();
        }
    };
    entries.sort();

    match render_listing(&entries) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Template rendering error: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Template rendering error").into_response()
        }
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "404 page not found").into_response()
}

/// Map a request path onto `root`, refusing anything that climbs out of it
fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    let relative = Path::new(decoded.trim_start_matches('/'));

    let mut resolved = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(resolved)
}

/// Entry names in `dir`, with a trailing `/` on directories
async fn read_entries(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type().await.is_ok_and(|file_type| file_type.is_dir()) {
            name.push('/');
        }
        entries.push(name);
    }
    Ok(entries)
}

/// One row of the listing page
struct ListingEntry {
    href: String,
    name: String,
}

impl ListingEntry {
    fn new(name: &str) -> Self {
        let (base, slash) = match name.strip_suffix('/') {
            Some(base) => (base, "/"),
            None => (name, ""),
        };
        Self {
            href: format!("{}{slash}", utf8_percent_encode(base, SEGMENT)),
            name: name.to_owned(),
        }
    }
}

#[derive(Template)]
#[template(path = "listing.html")]
struct ListingTemplate {
    entries: Vec<ListingEntry>,
}

fn render_listing(entries: &[String]) -> askama::Result<String> {
    let template = ListingTemplate {
        entries: entries.iter().map(|name| ListingEntry::new(name)).collect(),
    };
    template.render()
}
