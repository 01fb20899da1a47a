//! # Search Page
//!
//! Server-rendered HTML for `/search`, unstyled.
//!
//! - Source tabs, then a prompt until the query has two characters.
//! - A results summary, the image grid and pagination on success.
//! - The empty state when a provider returns nothing.
//! - An error box carrying the error's message otherwise.
//!
//! Each grid entry links to `/api/lgtm` for the chosen image.

use std::{fmt::Write, sync::Arc};

use axum::{
    extract::{self, Query},
    response::Html,
};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use serde::Deserialize;
use shared::{Image, ImageSource, SearchResult};
use url::form_urlencoded::byte_serialize;

use crate::{
    routes::run_search,
    state::State,
    validation::{MIN_QUERY_CHARS, RawSearchParams},
};

const MAX_VISIBLE_PAGES: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub query: Option<String>,
    pub source: Option<String>,
    pub page: Option<String>,
}

pub async fn search_page(
    extract::State(state): extract::State<Arc<State>>,
    Query(params): Query<PageParams>,
) -> Html<String> {
    let source = params
        .source
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(ImageSource::Unsplash);
    let query = params.query.clone().unwrap_or_default();

    let mut body = String::new();
    body.push_str("<h1>画像を検索</h1>\n");
    body.push_str(&search_form(&query, source));
    body.push_str(&tabs(&query, source));

    if query.trim().chars().count() < MIN_QUERY_CHARS {
        body.push_str(&prompt());
        return Html(document(&body));
    }

    let raw = RawSearchParams {
        query: Some(query),
        page: params.page.clone(),
        ..Default::default()
    };

    match run_search(&state, source, &raw).await {
        Ok((result, _)) => body.push_str(&results(&result)),
        Err(e) => body.push_str(&error_box(&e.to_string())),
    }

    Html(document(&body))
}

fn document(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"ja\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>LGTM Generator</title>\n</head>\n<body>\n<main>\n{body}</main>\n</body>\n</html>\n"
    )
}

fn search_form(query: &str, source: ImageSource) -> String {
    format!(
        "<form action=\"/search\" method=\"get\" role=\"search\">\n\
         <input type=\"hidden\" name=\"source\" value=\"{}\">\n\
         <input type=\"search\" name=\"query\" value=\"{}\" placeholder=\"画像を検索...\" aria-label=\"検索キーワード\">\n\
         <button type=\"submit\">検索</button>\n</form>\n",
        source,
        attr(query)
    )
}

fn tabs(query: &str, current: ImageSource) -> String {
    let mut html = String::from("<nav role=\"tablist\">\n");
    for source in ImageSource::ALL {
        let _ = writeln!(
            html,
            "<a role=\"tab\" aria-selected=\"{}\" href=\"{}\">{}</a>",
            source == current,
            page_href(query, source, 1),
            source.label()
        );
    }
    html.push_str("</nav>\n");
    html
}

fn prompt() -> String {
    "<section class=\"prompt\">\n<p>検索キーワードを入力してください</p>\n\
     <p>2文字以上で検索できます</p>\n</section>\n"
        .to_string()
}

fn error_box(message: &str) -> String {
    format!(
        "<section role=\"alert\" class=\"error\">\n<h2>エラーが発生しました</h2>\n<p>{}</p>\n</section>\n",
        text(message)
    )
}

fn results(result: &SearchResult) -> String {
    if result.images.is_empty() {
        return "<section class=\"empty\">\n<p>画像が見つかりませんでした</p>\n\
                <p>別のキーワードで検索してみてください</p>\n</section>\n"
            .to_string();
    }

    let mut html = format!(
        "<p class=\"summary\">{} 件の検索結果 - ページ {} / {}</p>\n",
        group_thousands(result.total_results),
        result.page,
        result.total_pages
    );

    html.push_str("<ul role=\"list\" class=\"grid\">\n");
    for image in &result.images {
        html.push_str(&card(image));
    }
    html.push_str("</ul>\n");

    html.push_str(&pagination(&result.query, result.source, result.page, result.total_pages));
    html
}

fn card(image: &Image) -> String {
    let alt = image
        .alt
        .as_deref()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Photo by {}", image.photographer));
    let lgtm_href = format!("/api/lgtm?url={}", encode(&image.url));

    format!(
        "<li role=\"listitem\">\n<a href=\"{}\"><img src=\"{}\" alt=\"{}\" width=\"{}\" height=\"{}\" loading=\"lazy\"></a>\n\
         <p><a href=\"{}\">{}</a> / <a href=\"{}\">{}</a></p>\n</li>\n",
        attr(&lgtm_href),
        attr(&image.thumbnail_url),
        attr(&alt),
        image.width,
        image.height,
        attr(image.photographer_url.as_deref().unwrap_or(&image.source_url)),
        text(&image.photographer),
        attr(&image.source_url),
        image.source.label()
    )
}

fn pagination(query: &str, source: ImageSource, current: u32, total: u32) -> String {
    if total <= 1 {
        return String::new();
    }

    let mut html = String::from("<nav aria-label=\"ページネーション\">\n");

    if current > 1 {
        let _ = writeln!(
            html,
            "<a rel=\"prev\" href=\"{}\">前へ</a>",
            page_href(query, source, current - 1)
        );
    }

    for item in page_numbers(current, total) {
        match item {
            PageItem::Page(page) if page == current => {
                let _ = writeln!(html, "<span aria-current=\"page\">{page}</span>");
            }
            PageItem::Page(page) => {
                let _ = writeln!(html, "<a href=\"{}\">{page}</a>", page_href(query, source, page));
            }
            PageItem::Ellipsis => html.push_str("<span>...</span>\n"),
        }
    }

    if current < total {
        let _ = writeln!(
            html,
            "<a rel=\"next\" href=\"{}\">次へ</a>",
            page_href(query, source, current + 1)
        );
    }

    html.push_str("</nav>\n");
    html
}

/// At most seven entries: the first and last page, a window around `current`,
/// and ellipses for the gaps.
pub fn page_numbers(current: u32, total: u32) -> Vec<PageItem> {
    use PageItem::{Ellipsis, Page};

    if total <= MAX_VISIBLE_PAGES {
        return (1..=total).map(Page).collect();
    }

    if current <= 3 {
        let mut items: Vec<PageItem> = (1..=5).map(Page).collect();
        items.extend([Ellipsis, Page(total)]);
        items
    } else if current >= total - 2 {
        let mut items = vec![Page(1), Ellipsis];
        items.extend((total - 4..=total).map(Page));
        items
    } else {
        let mut items = vec![Page(1), Ellipsis];
        items.extend((current - 1..=current + 1).map(Page));
        items.extend([Ellipsis, Page(total)]);
        items
    }
}

fn page_href(query: &str, source: ImageSource, page: u32) -> String {
    attr(&format!(
        "/search?query={}&source={}&page={}",
        encode(query),
        source,
        page
    ))
    .into_owned()
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    grouped
}
