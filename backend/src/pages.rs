use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use shared::{Notice, ResultViewParams, human_size};
use std::collections::BTreeSet;

use crate::gateway::models::{CONFIDENCE_FIELD, FILE_FIELD, MODEL_FIELD};

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} · SDSS Galaxy Classification</title>
</head>
<body>
<header><nav><a href="/">Home</a> <a href="/input">Classify</a></nav></header>
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        body = body
    )
}

pub fn html(status: StatusCode, page: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(page)
}

pub fn landing() -> String {
    layout(
        "Home",
        r#"<h1>SDSS Galaxy Classification</h1>
<p>Upload an image of a galaxy and pick a model and confidence threshold.</p>
<p><a href="/input">Start classifying</a></p>"#,
    )
}

pub fn input_form(
    notices: &[Notice],
    allowed_extensions: &BTreeSet<String>,
    max_bytes: u64,
) -> String {
    let notices_html = if notices.is_empty() {
        String::new()
    } else {
        let items: String = notices
            .iter()
            .map(|n| {
                format!(
                    "<li class=\"notice notice-{}\">{}</li>\n",
                    n.as_ref(),
                    escape(&n.to_string())
                )
            })
            .collect();
        format!("<ul class=\"notices\">\n{}</ul>\n", items)
    };

    let accept = allowed_extensions
        .iter()
        .map(|e| format!(".{}", e))
        .collect::<Vec<_>>()
        .join(",");

    let body = format!(
        r#"<h1>Upload a galaxy image</h1>
{notices_html}<form action="/upload" method="post" enctype="multipart/form-data">
<label>Image <input type="file" name="{file_field}" accept="{accept}"></label>
<p>Accepted: {accepted}. Maximum size {limit}.</p>
<label>Confidence threshold <input type="number" name="{confidence_field}" min="0" max="1" step="0.05" value="{confidence}"></label>
<label>Model <input type="text" name="{model_field}" value="{model}"></label>
<button type="submit">Classify</button>
</form>"#,
        notices_html = notices_html,
        file_field = FILE_FIELD,
        accept = escape(&accept),
        accepted = escape(&accept.replace(',', ", ")),
        limit = human_size(max_bytes),
        confidence_field = CONFIDENCE_FIELD,
        confidence = shared::DEFAULT_CONFIDENCE,
        model_field = MODEL_FIELD,
        model = shared::DEFAULT_MODEL,
    );
    layout("Upload", &body)
}

pub fn results(params: &ResultViewParams) -> String {
    let image = if params.filename.is_empty() {
        "<p class=\"no-image\">No image uploaded.</p>".to_string()
    } else {
        format!(
            "<img src=\"/uploads/{}\" alt=\"Uploaded galaxy\">",
            escape(&urlencoding::encode(&params.filename))
        )
    };

    let body = format!(
        r#"<h1>Classification results</h1>
{image}
<dl>
<dt>Uploaded image</dt><dd class="uploaded-image">{filename}</dd>
<dt>Confidence threshold</dt><dd class="confidence-threshold">{confidence}</dd>
<dt>Model</dt><dd class="selected-model">{model}</dd>
</dl>
<p><a href="/input">Classify another image</a></p>"#,
        image = image,
        filename = escape(&params.filename),
        confidence = escape(&params.confidence),
        model = escape(&params.model),
    );
    layout("Results", &body)
}
