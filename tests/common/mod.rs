#![allow(dead_code)]

use async_trait::async_trait;
use brainrot_db::api::transport::{HttpResponse, HttpTransport};
use brainrot_db::config::BuilderConfig;
use brainrot_db::error::{AppError, AppResult};
use bytes::Bytes;
use image::{ImageBuffer, ImageFormat, Rgba};
use reqwest::{Method, StatusCode};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Mutex;
use tokio::time::Instant;

pub const BASE: &str = "https://wiki.test";

#[derive(Debug, Clone)]
pub enum Reply {
    Ok {
        status: u16,
        content_type: Option<&'static str>,
        body: Bytes,
    },
    ConnectionReset,
}

impl Reply {
    pub fn status(status: u16) -> Self {
        Reply::Ok {
            status,
            content_type: Some("text/html"),
            body: Bytes::new(),
        }
    }

    pub fn html(body: impl Into<String>) -> Self {
        Reply::Ok {
            status: 200,
            content_type: Some("text/html; charset=utf-8"),
            body: Bytes::from(body.into()),
        }
    }

    pub fn png(body: Vec<u8>) -> Self {
        Reply::Ok {
            status: 200,
            content_type: Some("image/png"),
            body: Bytes::from(body),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub url: String,
    pub at: Instant,
}

/// In-memory wiki. Each URL replays its replies in order and then repeats the last one;
/// unknown URLs answer 404, and search pages answer with an empty result list.
#[derive(Default)]
pub struct FakeWiki {
    routes: Mutex<HashMap<String, Vec<Reply>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeWiki {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, replies: Vec<Reply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), replies);
        self
    }

    pub fn page(self, url: &str, html: &str) -> Self {
        self.route(url, vec![Reply::html(html)])
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.url == url).collect()
    }

    fn next_reply(&self, url: &str) -> Option<Reply> {
        let mut routes = self.routes.lock().unwrap();
        let replies = routes.get_mut(url)?;
        if replies.len() > 1 {
            Some(replies.remove(0))
        } else {
            replies.first().cloned()
        }
    }
}

#[async_trait]
impl HttpTransport for FakeWiki {
    async fn execute(&self, method: Method, url: &str) -> AppResult<HttpResponse> {
        self.calls.lock().unwrap().push(Call {
            method: method.clone(),
            url: url.to_string(),
            at: Instant::now(),
        });

        let reply = match self.next_reply(url) {
            Some(reply) => reply,
            None if url.contains("Special:Search") => Reply::html("<ul class=\"results\"></ul>"),
            None => Reply::status(404),
        };

        match reply {
            Reply::ConnectionReset => Err(AppError::transient(url, 1, "connection reset by peer")),
            Reply::Ok {
                status,
                content_type,
                body,
            } => Ok(HttpResponse {
                status: StatusCode::from_u16(status).unwrap(),
                final_url: url.to_string(),
                content_type: content_type.map(str::to_string),
                content_length: Some(body.len() as u64),
                body: if method == Method::HEAD { Bytes::new() } else { body },
            }),
        }
    }
}

pub fn test_config(root: &Path) -> BuilderConfig {
    BuilderConfig {
        base_url: BASE.to_string(),
        output_dir: root.join("databases"),
        images_dir: root.join("images"),
        rate_limit_delay_secs: 0.5,
        include_timestamp: false,
        workers: 2,
        ..Default::default()
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_pixel(width, height, Rgba([200, 40, 90, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn page_url(title: &str) -> String {
    format!("{}/wiki/{}", BASE, title)
}

pub fn image_url(file: &str) -> String {
    format!(
        "https://static.wikia.nocookie.net/brainrot/images/a/ab/{}/revision/latest?cb=20250101",
        file
    )
}

/// Character page with a portable infobox, a primary-slot portrait and cost/income rows.
pub fn character_page(name: &str, file: &str, cost: &str, income: &str) -> String {
    let thumb = image_url(file).replace(
        "/revision/latest?",
        "/revision/latest/scale-to-width-down/268?",
    );
    format!(
        r#"<html><body>
        <aside class="portable-infobox">
          <h2 class="pi-title">{name}</h2>
          <figure class="pi-item pi-image" data-source="image1">
            <a href="{full}"><img src="{thumb}" alt="{name}" data-image-name="{file}"></a>
          </figure>
          <div class="pi-item pi-data"><h3 class="pi-data-label">Cost</h3><div class="pi-data-value">{cost}</div></div>
          <div class="pi-item pi-data"><h3 class="pi-data-label">Income</h3><div class="pi-data-value">{income}</div></div>
        </aside>
        <img src="https://static.wikia.nocookie.net/brainrot/images/1/10/Site-logo.png">
        </body></html>"#,
        name = name,
        file = file,
        full = image_url(file),
        thumb = thumb,
        cost = cost,
        income = income
    )
}
