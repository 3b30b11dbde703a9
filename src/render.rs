// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTML pages.

use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};
use std::fmt::Write;

/// Escape text for use in HTML content and attribute values.
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Coarse relative age, e.g. `42s ago`, `3h ago`.
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - created_at).num_seconds().max(0);
    match seconds {
        s if s < 60 => format!("{}s ago", s),
        s if s < 3600 => format!("{}m ago", s / 60),
        s if s < 86400 => format!("{}h ago", s / 3600),
        s => format!("{}d ago", s / 86400),
    }
}

/// Editor page.
pub fn index_page() -> String {
    let mut html = head(
        "Paste",
        r#"<meta name="description" content="Anonymously share code snippets.">"#,
        &[
            r#"<link rel="stylesheet" href="/css/toastify.min.css">"#,
            r#"<link rel="stylesheet" href="/css/style.css">"#,
            r#"<script src="/js/toastify.min.js"></script>"#,
            r#"<script src="/js/index.js" defer></script>"#,
        ],
    );
    html.push_str(concat!(
        "<body>",
        r#"<nav id="nav"><div><h1 id="title"><a href="/">Paste</a></h1></div>"#,
        r#"<div><button id="save">Save</button></div></nav>"#,
        r#"<textarea id="content" name="content" placeholder="Enter text here..." wrap="off" autofocus></textarea>"#,
        "</body></html>",
    ));
    html
}

/// Page showing a stored paste.
pub fn paste_page(id: &str, created_at: DateTime<Utc>, content: &str, now: DateTime<Utc>) -> String {
    let created_at = created_at
        .duration_round(TimeDelta::seconds(1))
        .unwrap_or(created_at);
    let rfc3339 = created_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let lines = content.matches('\n').count() + 1;
    let id = escape(id);

    let mut html = head(
        "Paste",
        "",
        &[
            r#"<link rel="stylesheet" href="/css/vs.min.css" media="(prefers-color-scheme: light), (prefers-color-scheme: no-preference)">"#,
            r#"<link rel="stylesheet" href="/css/vs2015.min.css" media="(prefers-color-scheme: dark)">"#,
            r#"<link rel="stylesheet" href="/css/style.css">"#,
            r#"<script src="/js/highlight.min.js"></script>"#,
            r#"<script src="/js/view.js" defer></script>"#,
        ],
    );

    let _ = write!(
        html,
        concat!(
            "<body>",
            r#"<nav id="nav"><div><h1 id="title"><a href="/">Paste</a></h1></div>"#,
            r#"<div id="metadata"><a id="new" href="/">New</a><a id="raw" href="/raw/{id}">Raw</a>"#,
            r#"<time id="created-at" datetime="{rfc}" title="{rfc}">{ago}</time> - {lines} line{plural}</div>"#,
            "</nav>",
            r#"<pre id="content">{content}</pre>"#,
            "</body></html>",
        ),
        id = id,
        rfc = rfc3339,
        ago = time_ago(created_at, now),
        lines = lines,
        plural = if lines == 1 { "" } else { "s" },
        content = escape(content),
    );
    html
}

fn head(title: &str, meta: &str, links: &[&str]) -> String {
    let mut html = String::from(concat!(
        "<!doctype html><html lang=\"en\"><head>",
        "<meta charset=\"utf-8\">",
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">",
    ));
    html.push_str(meta);
    let _ = write!(html, "<title>{}</title>", escape(title));
    for link in links {
        html.push_str(link);
    }
    html.push_str("</head>");
    html
}
