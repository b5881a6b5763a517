//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p uploads-api`.

pub mod fixtures;

use axum_test::TestServer;
use object_store::memory::InMemory;
use std::sync::Arc;
use tempfile::TempDir;
use uploads_api::setup::routes;
use uploads_api::state::AppState;
use uploads_core::Config;
use uploads_services::StorageGateway;
use uploads_storage::{LocalStorage, S3Storage};

/// Test application: server plus owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

fn build_server(config: &Config, gateway: StorageGateway) -> TestServer {
    let state = Arc::new(AppState::new(config.clone(), gateway));
    let app = routes::setup_routes(config, state).expect("Failed to setup routes");
    TestServer::new(app.into_make_service()).expect("Failed to create test server")
}

/// Setup test app backed by local storage in a temporary directory.
pub async fn setup_local_app() -> TestApp {
    setup_local_app_with(|_| {}).await
}

/// Same as `setup_local_app`, letting the test adjust the configuration first.
pub async fn setup_local_app_with(adjust: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut config = Config::local(temp_dir.path());
    adjust(&mut config);

    let storage = LocalStorage::new(temp_dir.path())
        .await
        .expect("Failed to create local storage");
    let server = build_server(&config, StorageGateway::new(Arc::new(storage)));

    TestApp { server, temp_dir }
}

/// Setup test app whose S3 backend is an in-memory object store.
pub fn setup_s3_app() -> TestServer {
    let config = Config::local("unused");
    let storage = S3Storage::with_store(Arc::new(InMemory::new()), "test-bucket");
    build_server(&config, StorageGateway::new(Arc::new(storage)))
}
