use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use super::{UpstreamClient, UpstreamError};
use crate::{config::CatalogConfig, normalize};

/// [`UpstreamClient`] over HTTP using the shared reqwest client.
#[derive(Clone)]
pub struct HttpUpstream {
    client: Client,
    openrouter_api_url: String,
    huggingface_api_url: String,
    huggingface_site_url: String,
    huggingface_token: Option<String>,
}

impl std::fmt::Debug for HttpUpstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUpstream")
            .field("openrouter_api_url", &self.openrouter_api_url)
            .field("huggingface_api_url", &self.huggingface_api_url)
            .field("huggingface_site_url", &self.huggingface_site_url)
            .field("huggingface_token", &self.huggingface_token.as_ref().map(|_| "****"))
            .finish()
    }
}

impl HttpUpstream {
    pub fn new(client: Client, config: &CatalogConfig) -> Self {
        Self {
            client,
            openrouter_api_url: config.openrouter.api_url.clone(),
            huggingface_api_url: config.huggingface.api_url.trim_end_matches('/').to_string(),
            huggingface_site_url: config.huggingface.site_url.trim_end_matches('/').to_string(),
            huggingface_token: config.huggingface.api_token(),
        }
    }

    async fn get_json(&self, url: &str, bearer: Option<&str>) -> Result<Value, UpstreamError> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| UpstreamError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| UpstreamError::Decode {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstream {
    #[tracing::instrument(name = "upstream.openrouter.list", skip(self))]
    async fn fetch_openrouter_models(&self) -> Vec<Value> {
        match self.get_json(&self.openrouter_api_url, None).await {
            Ok(mut body) => match body.get_mut("data").map(Value::take) {
                Some(Value::Array(models)) => models,
                _ => {
                    tracing::warn!("OpenRouter listing has no data array");
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch OpenRouter models");
                Vec::new()
            }
        }
    }

    #[tracing::instrument(name = "upstream.huggingface.list", skip(self))]
    async fn fetch_huggingface_models(&self) -> Vec<Value> {
        match self.get_json(&self.huggingface_api_url, None).await {
            Ok(Value::Array(models)) => models,
            Ok(_) => {
                tracing::warn!("Hugging Face listing is not an array");
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to fetch Hugging Face models");
                Vec::new()
            }
        }
    }

    async fn fetch_huggingface_model(&self, model_id: &str) -> Option<Value> {
        let url = format!("{}/{}", self.huggingface_api_url, model_id);
        match self.get_json(&url, self.huggingface_token.as_deref()).await {
            Ok(detail) if detail.is_object() => Some(detail),
            Ok(_) => {
                tracing::warn!(model_id, "Hugging Face model detail is not an object");
                None
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(model_id, "Hugging Face model not found");
                None
            }
            Err(e) => {
                tracing::warn!(model_id, error = %e, "Failed to fetch Hugging Face model detail");
                None
            }
        }
    }

    #[tracing::instrument(name = "upstream.huggingface.readme", skip(self))]
    async fn fetch_huggingface_readme(
        &self,
        model_id: &str,
    ) -> Result<Option<String>, UpstreamError> {
        let url = format!(
            "{}/{}/resolve/main/README.md",
            self.huggingface_site_url, model_id
        );

        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|source| UpstreamError::Transport {
                    url: url.clone(),
                    source,
                })?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(model_id, "Model has no README");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let markdown = response.text().await.map_err(|e| UpstreamError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let markdown =
            normalize::rewrite_readme_links(&markdown, &self.huggingface_site_url, model_id);
        Ok(Some(normalize::render_markdown(&markdown)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    use super::*;

    fn upstream_for(server: &MockServer) -> HttpUpstream {
        let mut config = CatalogConfig::default();
        config.openrouter.api_url = format!("{}/api/v1/models", server.uri());
        config.huggingface.api_url = format!("{}/api/models", server.uri());
        config.huggingface.site_url = server.uri();
        config.huggingface.api_token_env = None;
        HttpUpstream::new(Client::new(), &config)
    }

    #[tokio::test]
    async fn test_openrouter_listing_returns_data_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "openai/gpt-4o"}, {"id": "anthropic/claude-3"}]
            })))
            .mount(&server)
            .await;

        let models = upstream_for(&server).fetch_openrouter_models().await;
        assert_eq!(models.len(), 2);
        assert_eq!(models[0]["id"], "openai/gpt-4o");
    }

    #[tokio::test]
    async fn test_openrouter_listing_without_data_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
            .mount(&server)
            .await;

        assert!(upstream_for(&server).fetch_openrouter_models().await.is_empty());
    }

    #[tokio::test]
    async fn test_listing_failures_degrade_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/models"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/models"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let upstream = upstream_for(&server);
        assert!(upstream.fetch_openrouter_models().await.is_empty());
        assert!(upstream.fetch_huggingface_models().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_upstream_degrades_to_empty() {
        let mut config = CatalogConfig::default();
        config.openrouter.api_url = "http://127.0.0.1:9/api/v1/models".to_string();
        config.huggingface.api_token_env = None;
        let upstream = HttpUpstream::new(Client::new(), &config);
        assert!(upstream.fetch_openrouter_models().await.is_empty());
    }

    #[tokio::test]
    async fn test_huggingface_detail_uses_slashed_id_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/models/meta-llama/Llama-3-8B"))
            .and(header("authorization", "Bearer hf_test"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "meta-llama/Llama-3-8B", "likes": 5000})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut upstream = upstream_for(&server);
        upstream.huggingface_token = Some("hf_test".to_string());

        let detail = upstream
            .fetch_huggingface_model("meta-llama/Llama-3-8B")
            .await
            .unwrap();
        assert_eq!(detail["likes"], 5000);
    }

    #[tokio::test]
    async fn test_huggingface_detail_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/models/gone/model"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(
            upstream_for(&server)
                .fetch_huggingface_model("gone/model")
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_readme_rendered_with_absolute_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/org/model/resolve/main/README.md"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("# Model\n\n![arch](./arch.png) see [blog](/blog/post)\n"),
            )
            .mount(&server)
            .await;

        let html = upstream_for(&server)
            .fetch_huggingface_readme("org/model")
            .await
            .unwrap()
            .unwrap();

        assert!(html.contains("<h1>Model</h1>"));
        assert!(html.contains(&format!(
            r#"src="{}/org/model/resolve/main/arch.png""#,
            server.uri()
        )));
        assert!(html.contains(&format!(r#"href="{}/blog/post""#, server.uri())));
    }

    #[tokio::test]
    async fn test_readme_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/org/model/resolve/main/README.md"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let readme = upstream_for(&server)
            .fetch_huggingface_readme("org/model")
            .await
            .unwrap();
        assert!(readme.is_none());
    }

    #[tokio::test]
    async fn test_readme_server_error_is_err() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/org/model/resolve/main/README.md"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = upstream_for(&server)
            .fetch_huggingface_readme("org/model")
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 500, .. }));
    }
}
