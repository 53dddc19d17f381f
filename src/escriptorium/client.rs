use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::multipart::{Form, Part as FormPart};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::EscriptoriumConfig;
use crate::escriptorium::{DocumentHost, Part};

#[derive(Debug, Clone)]
enum Credentials {
    Token(String),
    Basic { username: String, password: String },
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Page<T> {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<T>,
}

/// Client for the eScriptorium REST API.
#[derive(Debug, Clone)]
pub struct EscriptoriumClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl EscriptoriumClient {
    pub fn from_config(config: &EscriptoriumConfig) -> Result<Self> {
        let base_url = config
            .url
            .clone()
            .filter(|url| !url.is_empty())
            .context("no eScriptorium url configured")?;
        let credentials = match (&config.token, &config.username, &config.password) {
            (Some(token), _, _) => Credentials::Token(token.clone()),
            (None, Some(username), Some(password)) => Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            },
            _ => anyhow::bail!("eScriptorium needs either a token or a username and password"),
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// Whether `url` points at the configured instance.
    fn is_own(&self, url: &str) -> bool {
        url.strip_prefix(&self.base_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'))
    }

    /// Credentials only go to the configured instance, never to hosts named in
    /// API payloads.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        if self.is_own(url) {
            self.authorize(request)
        } else {
            debug!(%url, "sending request without credentials");
            request
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Token(token) => request.header("Authorization", format!("Token {token}")),
            Credentials::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }
}

impl DocumentHost for EscriptoriumClient {
    fn list_parts(&self, document: u64) -> Result<Vec<Part>> {
        let mut parts = Vec::new();
        let mut next = Some(self.url(&format!("api/documents/{document}/parts/")));
        while let Some(url) = next.take() {
            debug!(%url, "listing document parts");
            let page: Page<Part> = self
                .request(Method::GET, &url)
                .send()
                .with_context(|| format!("failed to reach {url}"))?
                .error_for_status()
                .with_context(|| format!("failed to list parts of document {document}"))?
                .json()
                .context("failed to parse part listing")?;
            parts.extend(page.results);
            next = page.next;
        }
        Ok(parts)
    }

    fn fetch_image(&self, part: &Part) -> Result<Vec<u8>> {
        let uri = part
            .image
            .as_ref()
            .map(|image| image.uri.as_str())
            .with_context(|| format!("part {} has no image", part.pk))?;
        let url = self.url(uri);
        let bytes = self
            .request(Method::GET, &url)
            .send()
            .with_context(|| format!("failed to reach {url}"))?
            .error_for_status()
            .with_context(|| format!("failed to download image of part {}", part.pk))?
            .bytes()
            .context("failed to read image body")?;
        Ok(bytes.to_vec())
    }

    fn upload_layout(
        &self,
        document: u64,
        transcription: &str,
        file_name: &str,
        alto: String,
    ) -> Result<()> {
        let url = self.url(&format!("api/documents/{document}/imports/"));
        let file = FormPart::text(alto)
            .file_name(file_name.to_string())
            .mime_str("application/xml")?;
        let form = Form::new()
            .text("name", transcription.to_string())
            .text("override", "true")
            .part("upload_file", file);

        self.request(Method::POST, &url)
            .multipart(form)
            .send()
            .with_context(|| format!("failed to reach {url}"))?
            .error_for_status()
            .with_context(|| format!("failed to import {file_name} into document {document}"))?;
        info!(document, transcription, file_name, "uploaded ALTO");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EscriptoriumConfig {
        EscriptoriumConfig {
            url: Some("https://escriptorium.example.org/".to_string()),
            token: Some("t0k3n".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn resolves_relative_and_absolute_urls() {
        let client = EscriptoriumClient::from_config(&config()).unwrap();
        assert_eq!(
            client.url("/media/documents/1/page.jpg"),
            "https://escriptorium.example.org/media/documents/1/page.jpg"
        );
        assert_eq!(
            client.url("https://cdn.example.org/page.jpg"),
            "https://cdn.example.org/page.jpg"
        );
    }

    #[test]
    fn credentials_stay_on_the_configured_host() {
        let client = EscriptoriumClient::from_config(&config()).unwrap();
        assert!(client.is_own(&client.url("api/documents/3/parts/")));
        assert!(client.is_own("https://escriptorium.example.org/api/documents/3/parts/?page=2"));
        assert!(!client.is_own("https://cdn.example.org/page.jpg"));
        assert!(!client.is_own("https://escriptorium.example.org.evil.test/media/a.jpg"));
    }

    #[test]
    fn requires_credentials() {
        let mut cfg = config();
        cfg.token = None;
        assert!(EscriptoriumClient::from_config(&cfg).is_err());
        cfg.username = Some("user".to_string());
        cfg.password = Some("pass".to_string());
        assert!(EscriptoriumClient::from_config(&cfg).is_ok());
    }

    #[test]
    fn decodes_paginated_listing() {
        let json = r#"{"count":2,"next":"https://e.org/api/documents/3/parts/?page=2",
            "results":[{"pk":7,"filename":"a.jpg","image":{"uri":"/media/a.jpg","size":[10,10]},"title":""}]}"#;
        let page: Page<Part> = serde_json::from_str(json).unwrap();
        assert_eq!(page.results[0].pk, 7);
        assert_eq!(page.results[0].image.as_ref().unwrap().uri, "/media/a.jpg");
        assert!(page.next.is_some());
    }

    #[test]
    fn last_page_without_results_decodes_empty() {
        let page: Page<Part> = serde_json::from_str(r#"{"next":null}"#).unwrap();
        assert!(page.results.is_empty());
        assert!(page.next.is_none());
    }
}
