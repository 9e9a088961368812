//! Model API
//!
//! CRUD orchestration for one backend model. Single-item calls issue exactly
//! one request; bulk calls fan out one unit per item (see [`super::bulk`])
//! and report per-item outcomes keyed by identity.

use super::bulk::{fan_out, BulkOptions};
use super::client::{Client, Request};
use super::export::{self, ExportModel};
use super::transport::{Response, ResponseList};
use crate::common::{Outcome, StatusList};
use crate::error::{Error, Result};
use crate::model::{self, Meta, Resource};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

/// Handler for one backend model
pub struct ModelApi<R> {
    client: Arc<Client>,
    name: String,
    options: BulkOptions,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ModelApi<R> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            name: self.name.clone(),
            options: self.options.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> ModelApi<R> {
    pub fn new(client: Client) -> Self {
        let name = client.context().model.clone();
        Self {
            client: Arc::new(client),
            name,
            options: BulkOptions::default(),
            _resource: PhantomData,
        }
    }

    /// Tuning applied to every bulk call
    pub fn with_options(mut self, options: BulkOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &BulkOptions {
        &self.options
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetch all objects
    pub async fn get(&self) -> Result<Vec<R>> {
        self.get_filtered(None).await
    }

    /// Fetch all objects, then keep those matching `filter`
    pub async fn get_filtered(&self, filter: Option<&R>) -> Result<Vec<R>> {
        let response = self.client.get(Request::default()).await;
        if !response.success {
            return Err(Error::transport(response.status_code, response.message));
        }

        let resources: Vec<R> = response.decode()?.unwrap_or_default();
        tracing::debug!("Fetched {} {} objects", resources.len(), self.name);
        Ok(model::filter(&resources, filter))
    }

    /// Create an object on the backend
    pub async fn create(&self, resource: &R) -> Result<()> {
        let body = serde_json::to_value(resource).map_err(|e| Error::Parse(e.to_string()))?;
        self.client
            .post(Request::default().with_body(body))
            .await
            .into_result()?;
        Ok(())
    }

    /// Delete one object
    pub async fn delete(&self, resource: &R) -> Response {
        delete_one(&self.client, resource.key()).await
    }

    /// Delete objects concurrently
    pub async fn delete_many(&self, resources: &[R]) -> ResponseList {
        let results = ResponseList::new();
        let items = resources.iter().map(|r| (r.key(), r.key())).collect();
        let client = Arc::clone(&self.client);

        fan_out(items, &self.options, &results, move |key| {
            let client = Arc::clone(&client);
            async move { delete_one(&client, key).await }
        })
        .await;

        tracing::info!(
            "Deleted {}/{} {} objects",
            results.successes(),
            results.size(),
            self.name
        );
        results
    }

    /// Replace one object with its local state
    pub async fn update(&self, resource: &R) -> Response {
        update_one(&self.client, resource).await
    }

    /// Update objects concurrently
    ///
    /// Objects whose key has a failed entry in `statuses` are skipped: no
    /// request is sent and the prior failure message is recorded instead.
    pub async fn update_many(
        &self,
        resources: &[R],
        statuses: Option<&StatusList>,
    ) -> ResponseList {
        let results = ResponseList::new();
        let mut pending = Vec::with_capacity(resources.len());

        for resource in resources {
            let key = resource.key();
            match statuses.and_then(|s| s.get(&key)) {
                Some(prior) if !prior.success() => {
                    tracing::debug!("Skipping update of {}: {}", key, prior.message());
                    results.insert(key, Response::skipped(prior.message()));
                }
                _ => pending.push((key, resource.clone())),
            }
        }

        let client = Arc::clone(&self.client);
        fan_out(pending, &self.options, &results, move |resource: R| {
            let client = Arc::clone(&client);
            async move { update_one(&client, &resource).await }
        })
        .await;

        tracing::info!(
            "Updated {}/{} {} objects",
            results.successes(),
            results.size(),
            self.name
        );
        results
    }

    /// Objects matching `filter`, in input order
    pub fn list_filter(&self, resources: &[R], filter: Option<&R>) -> Vec<R> {
        model::filter(resources, filter)
    }

    /// Evaluate the filter on one task per object; matches keep input order
    pub async fn list_filter_concurrent(&self, resources: &[R], filter: Option<&R>) -> Vec<R> {
        let filter = Arc::new(filter.cloned());
        let handles: Vec<_> = resources
            .iter()
            .cloned()
            .map(|resource| {
                let filter = Arc::clone(&filter);
                tokio::spawn(async move {
                    let matched = resource.valid_for_filter(Option::as_ref(&*filter));
                    matched.then_some(resource)
                })
            })
            .collect();

        futures::future::join_all(handles)
            .await
            .into_iter()
            .filter_map(|joined| joined.ok().flatten())
            .collect()
    }

    /// Apply a partial update to copies of `resources`
    ///
    /// Inputs are left untouched. Returns the updated copies, in input order,
    /// with a status per object describing the merge outcome.
    pub async fn list_update(&self, resources: &[R], meta: &Meta<R>) -> (Vec<R>, StatusList) {
        let results = StatusList::new();
        let slots: Vec<Arc<Mutex<R>>> = resources
            .iter()
            .map(|r| Arc::new(Mutex::new(r.clone())))
            .collect();
        let items = resources
            .iter()
            .zip(&slots)
            .map(|(r, slot)| (r.key(), Arc::clone(slot)))
            .collect();
        let meta = Arc::new(meta.clone());

        fan_out(items, &self.options, &results, move |slot: Arc<Mutex<R>>| {
            let meta = Arc::clone(&meta);
            async move {
                let mut dest = slot.lock().unwrap_or_else(PoisonError::into_inner);
                dest.update(&meta)
            }
        })
        .await;

        let updated = slots
            .iter()
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
            .collect();
        (updated, results)
    }

    /// Render objects as a table
    pub fn export(&self, model: &ExportModel<'_, R>) -> Result<()> {
        export::export(model)
    }
}

async fn delete_one(client: &Client, key: String) -> Response {
    client.delete(Request::for_id(key)).await
}

async fn update_one<R: Resource>(client: &Client, resource: &R) -> Response {
    let body = match serde_json::to_value(resource) {
        Ok(body) => body,
        Err(e) => return Response::from_result("", Err(&Error::Parse(e.to_string()))),
    };
    client
        .put(Request::for_id(resource.key()).with_body(body))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::Context;
    use crate::api::transport::{HttpRequest, Method, Transport, NON_OK_STATUS};
    use crate::model::Model;
    use async_trait::async_trait;
    use serde_json::json;

    /// In-memory transport: records every request and answers with `reply`
    struct MockTransport {
        reply: Response,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl MockTransport {
        fn replying(reply: Response) -> Arc<Self> {
            Arc::new(Self {
                reply,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<HttpRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: HttpRequest) -> Response {
            self.sent.lock().unwrap().push(request);
            self.reply.clone()
        }
    }

    fn api(transport: &Arc<MockTransport>) -> ModelApi<Model> {
        let context = Context::new("http://backend.test", "users", "t0ken");
        ModelApi::new(Client::new(context, transport.clone()))
    }

    fn mixed() -> Vec<Model> {
        (1..=12)
            .map(|id| {
                let role = if id % 3 == 0 { "admin" } else { "user" };
                Model::new(id).with("role", role)
            })
            .collect()
    }

    #[tokio::test]
    async fn test_list_filter_concurrent_keeps_input_order() {
        let transport = MockTransport::replying(Response::ok(None));
        let api = api(&transport);
        let models = mixed();
        let admins = Model::default().with("role", "admin");

        let sequential = api.list_filter(&models, Some(&admins));
        let concurrent = api.list_filter_concurrent(&models, Some(&admins)).await;
        assert_eq!(concurrent, sequential);
        let ids: Vec<i64> = concurrent.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![3, 6, 9, 12]);

        let everything = api.list_filter_concurrent(&models, None).await;
        assert_eq!(everything, models);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_update_failure_is_reported_verbatim() {
        let transport = MockTransport::replying(Response::failure(500, NON_OK_STATUS));
        let api = api(&transport);

        let response = api.update(&Model::new(4).with("name", "x")).await;
        assert!(!response.success);
        assert_eq!(response.status_code, 500);
        assert_eq!(response.message, NON_OK_STATUS);
        assert!(!response.skipped);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::Put);
        assert_eq!(sent[0].url, "http://backend.test/users/4");
        assert_eq!(sent[0].token, "t0ken");
        assert_eq!(sent[0].body, Some(json!({"id": 4, "name": "x"})));
    }

    #[tokio::test]
    async fn test_delete_sends_one_request() {
        let transport = MockTransport::replying(Response::ok(None));
        let api = api(&transport);

        let response = api.delete(&Model::new(9)).await;
        assert!(response.success);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::Delete);
        assert_eq!(sent[0].url, "http://backend.test/users/9");
        assert_eq!(sent[0].body, None);
    }

    #[tokio::test]
    async fn test_delete_failure_message_is_kept() {
        let transport = MockTransport::replying(Response::failure(404, "gone"));
        let response = api(&transport).delete(&Model::new(9)).await;
        assert_eq!(response.status_code, 404);
        assert_eq!(response.message, "gone");
    }

    #[tokio::test]
    async fn test_create_failure_becomes_transport_error() {
        let transport = MockTransport::replying(Response::failure(409, NON_OK_STATUS));
        let err = api(&transport)
            .create(&Model::default().with("name", "dup"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { status_code: 409, .. }));
        assert_eq!(err.to_string(), NON_OK_STATUS);
        assert_eq!(transport.sent()[0].method, Method::Post);
    }

    #[tokio::test]
    async fn test_update_many_sends_nothing_for_prior_failures() {
        let transport = MockTransport::replying(Response::ok(None));
        let api = api(&transport);
        let items: Vec<Model> = (1..=3).map(Model::new).collect();
        let statuses = StatusList::new();
        statuses.insert("2", crate::common::Status::no_change());

        let results = api.update_many(&items, Some(&statuses)).await;
        assert_eq!(results.size(), 3);
        assert_eq!(results.successes(), 2);

        let mut urls: Vec<String> = transport.sent().into_iter().map(|r| r.url).collect();
        urls.sort();
        assert_eq!(
            urls,
            vec!["http://backend.test/users/1", "http://backend.test/users/3"]
        );
    }
}
