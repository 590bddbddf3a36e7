use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::domain::entity::Entity;
use crate::domain::ports::EntityRepository;
use crate::domain::value_objects::EntityId;
use crate::infrastructure::config::ApiConfig;
use crate::infrastructure::http::auth::token_provider;
use crate::infrastructure::http::client::ApiClient;

/// Collection path of listings on the API.
const LISTINGS_PATH: &str = "agistments";

/// [`EntityRepository`] backed by the listings REST API.
pub struct HttpListingRepository<E> {
    client: ApiClient,
    _entity: PhantomData<fn() -> E>,
}

impl<E> HttpListingRepository<E> {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }
}

/// Build an authenticated repository from the API configuration.
pub fn connect<E: Entity>(cfg: &ApiConfig) -> Result<HttpListingRepository<E>> {
    let tokens = token_provider(cfg)?;
    let client = ApiClient::new(cfg.clone(), Arc::from(tokens))
        .with_context(|| format!("Failed to build API client for {}", cfg.base_url))?;
    Ok(HttpListingRepository::new(client))
}

#[async_trait]
impl<E: Entity> EntityRepository<E> for HttpListingRepository<E> {
    async fn get(&self, id: &EntityId) -> Result<E> {
        let path = format!("{}/{}", LISTINGS_PATH, id);
        self.client
            .send_json(Method::GET, &path, None, &CancellationToken::new())
            .await
            .with_context(|| format!("Failed to load listing {}", id))
    }

    async fn create(&self, entity: &E) -> Result<E> {
        let body = serde_json::to_value(entity)?;
        self.client
            .send_json(Method::POST, LISTINGS_PATH, Some(&body), &CancellationToken::new())
            .await
            .context("Failed to create listing")
    }

    async fn update(&self, id: &EntityId, partial: &Value, cancel: &CancellationToken) -> Result<E> {
        let path = format!("{}/{}", LISTINGS_PATH, id);
        self.client
            .send_json(Method::PUT, &path, Some(partial), cancel)
            .await
            .with_context(|| format!("Failed to update listing {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agistment::Agistment;
    use crate::infrastructure::http::auth::StaticToken;
    use crate::infrastructure::http::client::test_server;
    use serde_json::json;

    fn repo(base_url: String) -> HttpListingRepository<Agistment> {
        let cfg = ApiConfig {
            base_url,
            token: "t0".into(),
            refresh_url: None,
            timeout_secs: 5,
        };
        let client = ApiClient::new(cfg, Arc::new(StaticToken("t0".into()))).unwrap();
        HttpListingRepository::new(client)
    }

    #[tokio::test]
    async fn update_puts_partial_to_listing_path() {
        let mut saved = Agistment::default();
        saved.id = EntityId::new("a1");
        saved.basic_info.name = "Barn A".into();
        saved.basic_info.property_size = 12;
        let (base_url, log) =
            test_server::serve(vec![(200, serde_json::to_string(&saved).unwrap())]).await;

        let partial = json!({ "basicInfo": { "name": "Barn A", "propertySize": 12 } });
        let entity = repo(base_url)
            .update(&EntityId::new("a1"), &partial, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(entity, saved);
        let log = log.lock().unwrap();
        assert_eq!(log[0].target, "PUT /agistments/a1");
        assert_eq!(log[0].authorization.as_deref(), Some("Bearer t0"));
        let sent: Value = serde_json::from_str(&log[0].body).unwrap();
        assert_eq!(sent, partial);
    }

    #[tokio::test]
    async fn create_posts_to_collection() {
        let mut created = Agistment::default();
        created.id = EntityId::new("srv-9");
        let (base_url, log) =
            test_server::serve(vec![(200, serde_json::to_string(&created).unwrap())]).await;

        let entity = repo(base_url).create(&Agistment::default()).await.unwrap();

        assert_eq!(entity.id, EntityId::new("srv-9"));
        assert_eq!(log.lock().unwrap()[0].target, "POST /agistments");
    }
}
