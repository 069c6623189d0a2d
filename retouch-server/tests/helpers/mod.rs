//! Shared fixtures for integration tests: a generation-service test
//! double and a local HTTP server handing out source images.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use axum::{routing::get, Router};
use image::{Rgb, RgbImage};

use retouch_common::types::GeneratedImage;
use retouch_common::{Error, Result};
use retouch_server::services::generation::GenerationService;

/// Generation service test double: records every call, optionally
/// fails with a configured remote-service error.
#[derive(Default)]
pub struct MockGeneration {
    fail: Option<(u16, String)>,
    pub generates: Mutex<Vec<String>>,
    pub edits: Mutex<Vec<(Vec<u8>, String)>>,
    pub varies: Mutex<Vec<Vec<u8>>>,
}

impl MockGeneration {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing(status: u16, payload: &str) -> Self {
        Self {
            fail: Some((status, payload.to_string())),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<()> {
        if let Some((status, payload)) = &self.fail {
            return Err(Error::RemoteService {
                status: Some(*status),
                payload: payload.clone(),
            });
        }
        Ok(())
    }

    fn results() -> Vec<GeneratedImage> {
        vec![GeneratedImage {
            url: "https://img.example/result.png".to_string(),
        }]
    }
}

#[async_trait]
impl GenerationService for MockGeneration {
    async fn generate(&self, prompt: &str) -> Result<Vec<GeneratedImage>> {
        self.check()?;
        self.generates.lock().unwrap().push(prompt.to_string());
        Ok(Self::results())
    }

    async fn edit(&self, image_png: Vec<u8>, prompt: &str) -> Result<Vec<GeneratedImage>> {
        self.check()?;
        self.edits
            .lock()
            .unwrap()
            .push((image_png, prompt.to_string()));
        Ok(Self::results())
    }

    async fn vary(&self, image_png: Vec<u8>) -> Result<Vec<GeneratedImage>> {
        self.check()?;
        self.varies.lock().unwrap().push(image_png);
        Ok(Self::results())
    }
}

/// Encode an opaque RGB PNG of the given size and fill color
pub fn rgb_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb(color));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

/// Serve `bytes` at `/source.png` on an ephemeral local port.
///
/// Returns the full source URL; any other path on the server answers
/// 404, which the fetch-failure tests rely on.
pub async fn spawn_image_server(bytes: Vec<u8>) -> String {
    let app = Router::new().route(
        "/source.png",
        get(move || {
            let bytes = bytes.clone();
            async move { bytes }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/source.png", addr)
}
