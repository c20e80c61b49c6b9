//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use acton_data::entity::{Entity, FieldAccess, FieldValue};
use acton_data::query::QueryError;
use acton_data::store::{ChangeDescriptor, DataContext, MemoryStore, StoreProvider};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Install a test subscriber once; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acton_data=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestUser {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub active: bool,
    pub age: i64,
}

impl Entity for TestUser {
    type Id = i64;

    fn id(&self) -> i64 {
        self.id
    }

    fn entity_name() -> &'static str {
        "TestUser"
    }
}

impl FieldAccess for TestUser {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.clone().into()),
            "email" => Some(self.email.clone().into()),
            "active" => Some(self.active.into()),
            "age" => Some(self.age.into()),
            _ => None,
        }
    }
}

pub fn user(id: i64, name: &str, active: bool, age: i64) -> TestUser {
    TestUser {
        id,
        name: name.to_string(),
        email: Some(format!("{name}@example.com")),
        active,
        age,
    }
}

/// The standard roster used across scenarios
pub fn roster() -> Vec<TestUser> {
    vec![
        user(1, "apple", true, 30),
        user(2, "banana", true, 25),
        user(3, "avocado", false, 40),
        user(4, "cherry", true, 35),
        user(5, "apricot", false, 22),
    ]
}

/// A context managing one user store
pub struct TestContext {
    pub users: Arc<MemoryStore<TestUser>>,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            users: Arc::new(MemoryStore::new()),
        }
    }

    pub fn seeded() -> Self {
        let context = Self::new();
        context.users.seed(roster());
        context
    }
}

impl DataContext for TestContext {
    fn tracked_changes(&self) -> Vec<ChangeDescriptor> {
        self.users.tracked_changes()
    }

    async fn save_changes(&self, cancellation: CancellationToken) -> Result<usize, QueryError> {
        self.users.save_changes(cancellation).await
    }

    fn discard_changes(&self) {
        self.users.discard_changes();
    }
}

impl StoreProvider<TestUser> for TestContext {
    type Store = MemoryStore<TestUser>;

    fn store(&self) -> Arc<MemoryStore<TestUser>> {
        Arc::clone(&self.users)
    }
}
