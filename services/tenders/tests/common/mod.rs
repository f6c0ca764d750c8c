#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::RouterIntoService;
use chrono::Utc;
use std::sync::Arc;
use tender_common::ids::{EmployeeId, OrganizationId};
use tenders::app::{AppState, build_router};
use tenders::directory::Directory;
use tenders::directory::memory::InMemoryDirectory;
use tenders::model::{Employee, Organization, OrganizationType};
use tenders::store::memory::InMemoryTenderStore;
use tower::ServiceExt;

pub type App = RouterIntoService<Body, ()>;

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub async fn send(app: &App, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    (status, read_json(response).await)
}

pub fn create_request(
    org: OrganizationId,
    creator: &str,
    name: &str,
    service: &str,
) -> Request<Body> {
    let body = serde_json::json!({
        "name": name,
        "description": format!("{name} description"),
        "serviceType": service,
        "organizationId": org.to_string(),
        "creatorUsername": creator,
    });
    Request::builder()
        .method("POST")
        .uri("/api/tenders/new")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// Create a tender through the API and return the response body.
pub async fn create(
    app: &App,
    org: OrganizationId,
    creator: &str,
    name: &str,
    service: &str,
) -> serde_json::Value {
    let (status, body) = send(app, create_request(org, creator, name, service)).await;
    assert_eq!(status, StatusCode::OK, "create failed: {body}");
    body
}

pub fn id_of(tender: &serde_json::Value) -> String {
    tender["id"].as_str().expect("id").to_string()
}

/// Two organizations and four employees:
/// - `alice` and `bob` are responsible for Acme.
/// - `carol` is responsible for Globex.
/// - `dave` belongs to no organization.
pub struct Fixture {
    pub store: InMemoryTenderStore,
    pub directory: InMemoryDirectory,
    pub acme: OrganizationId,
    pub globex: OrganizationId,
}

pub fn employee(username: &str) -> Employee {
    Employee {
        id: EmployeeId::new(),
        username: username.to_string(),
        first_name: username.to_string(),
        last_name: String::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn organization(name: &str) -> Organization {
    Organization {
        id: OrganizationId::new(),
        name: name.to_string(),
        description: String::new(),
        organization_type: OrganizationType::LLC,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

impl Fixture {
    pub async fn new() -> Self {
        let directory = InMemoryDirectory::new();
        let acme = organization("Acme");
        let globex = organization("Globex");
        directory.add_organization(acme.clone()).await;
        directory.add_organization(globex.clone()).await;
        for (name, org) in [
            ("alice", Some(acme.id)),
            ("bob", Some(acme.id)),
            ("carol", Some(globex.id)),
            ("dave", None),
        ] {
            let person = employee(name);
            directory.add_employee(person.clone()).await;
            if let Some(org) = org {
                directory.add_responsible(person.id, org).await;
            }
        }
        Self {
            store: InMemoryTenderStore::new(),
            directory,
            acme: acme.id,
            globex: globex.id,
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            store: Arc::new(self.store.clone()),
            directory: Arc::new(self.directory.clone()),
        }
    }

    pub fn app(&self) -> App {
        build_router(self.state()).into_service()
    }

    /// Router over the fixture store with `directory` in front of it.
    pub fn app_with_directory(&self, directory: Arc<dyn Directory>) -> App {
        build_router(AppState {
            store: Arc::new(self.store.clone()),
            directory,
        })
        .into_service()
    }
}
