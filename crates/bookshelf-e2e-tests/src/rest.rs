use anyhow::Result;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::info;

use crate::{TestServer, extend_url};

/// Rendered page, as produced by the JSON renderer
pub struct View {
    pub status: StatusCode,
    pub name: String,
    pub data: Value,
}

pub async fn get_view(server: &TestServer, url: Url) -> Result<View> {
    let response = server.client.get(url).send().await?;
    into_view(response).await
}

pub async fn into_view(response: reqwest::Response) -> Result<View> {
    let status = response.status();
    let body: Value = response.json().await?;
    info!("View response {status}: {body}");
    Ok(View {
        status,
        name: body["view"].as_str().unwrap_or_default().to_string(),
        data: body["data"].clone(),
    })
}

pub async fn submit_book(
    server: &TestServer,
    url: Url,
    title: &str,
    author: &str,
    genre: &str,
    year: &str,
) -> Result<reqwest::Response> {
    let form = [
        ("title", title),
        ("author", author),
        ("genre", genre),
        ("year", year),
    ];
    let response = server.client.post(url).form(&form).send().await?;
    Ok(response)
}

/// Creates a book and checks the client is sent back to the listing
pub async fn create_book(
    server: &TestServer,
    title: &str,
    author: &str,
    genre: &str,
    year: i32,
) -> Result<()> {
    let response = submit_book(
        server,
        server.url("new"),
        title,
        author,
        genre,
        &year.to_string(),
    )
    .await?;
    assert_eq!(StatusCode::SEE_OTHER, response.status());
    assert_eq!(Some("/"), location(&response));
    Ok(())
}

pub async fn listing_page(server: &TestServer, page: u32) -> Result<View> {
    let url = extend_url(&server.base_url, format!("page/{page}"));
    get_view(server, url).await
}

pub async fn search_page(server: &TestServer, page: u32, query: &str) -> Result<View> {
    let mut url = extend_url(&server.base_url, format!("search/page/{page}"));
    url.query_pairs_mut().append_pair("query", query);
    get_view(server, url).await
}

pub fn location(response: &reqwest::Response) -> Option<&str> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub fn book_ids(view: &View) -> Vec<i64> {
    view.data["books"]
        .as_array()
        .map(|books| books.iter().filter_map(|b| b["id"].as_i64()).collect())
        .unwrap_or_default()
}
