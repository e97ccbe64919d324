#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use user_crud_server::backend::{BackendFactory, UserBackend};
use user_crud_server::config::DatabaseConfig;
use user_crud_server::error::{AppError, AppResult};
use user_crud_server::models::{NewUser, User, UserUpdate};
use user_crud_server::startup;

/// Connected SQLite backend living in a temporary directory.
///
/// The directory is removed when the returned `TempDir` is dropped, so
/// callers keep it alive for the duration of the test.
pub async fn setup_sqlite_backend() -> Result<(Arc<dyn UserBackend>, TempDir), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let url = format!("sqlite:///{}", dir.path().join("users.db").display());
    let config = DatabaseConfig::relational("sqlite", url);

    let backend = startup::connect_backend(&config).await?;
    Ok((backend, dir))
}

/// Connected in-memory SQLite backend
pub async fn setup_memory_backend() -> Result<Arc<dyn UserBackend>, Box<dyn std::error::Error>> {
    let config = DatabaseConfig::relational("sqlite", "sqlite::memory:");
    let backend = BackendFactory::create(&config)?;
    backend.connect().await?;
    Ok(backend)
}

/// Router over a fresh file-based SQLite backend
pub async fn setup_test_app() -> Result<(Router, Arc<dyn UserBackend>, TempDir), Box<dyn std::error::Error>> {
    let (backend, dir) = setup_sqlite_backend().await?;
    let app = startup::build_router(backend.clone());
    Ok((app, backend, dir))
}

pub fn create_test_user_json(name: &str, email: &str, age: Option<i64>) -> Value {
    match age {
        Some(age) => json!({ "name": name, "email": email, "age": age }),
        None => json!({ "name": name, "email": email }),
    }
}

/// How [`FakeBackend`] fails every data operation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailureMode {
    None,
    Connection,
    Storage,
}

/// In-memory backend used to drive the error paths of the HTTP layer
pub struct FakeBackend {
    users: Mutex<Vec<User>>,
    failure: Mutex<FailureMode>,
    connected: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            failure: Mutex::new(FailureMode::None),
            connected: AtomicBool::new(true),
        }
    }

    pub fn failing(mode: FailureMode) -> Self {
        let backend = Self::new();
        backend.set_failure(mode);
        backend
    }

    pub fn set_failure(&self, mode: FailureMode) {
        *self.failure.lock().unwrap() = mode;
    }

    fn check(&self) -> AppResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(AppError::Connection("not connected".to_string()));
        }
        match *self.failure.lock().unwrap() {
            FailureMode::None => Ok(()),
            FailureMode::Connection => Err(AppError::Connection(
                "connection refused by fake host 10.0.0.1".to_string(),
            )),
            FailureMode::Storage => Err(AppError::Storage(
                "syntax error near SELEC in fake statement".to_string(),
            )),
        }
    }
}

#[async_trait]
impl UserBackend for FakeBackend {
    async fn connect(&self) -> AppResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> AppResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.check().is_ok()
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Duplicate("Email already registered".to_string()));
        }
        let created = User {
            id: (users.len() + 1).to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            age: user.age,
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn get_all_users(&self) -> AppResult<Vec<User>> {
        self.check()?;
        Ok(self.users.lock().unwrap().clone())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.check()?;
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, email: &str, update: &UserUpdate) -> AppResult<Option<User>> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let Some(index) = users.iter().position(|u| u.email == email) else {
            return Ok(None);
        };
        if let Some(new_email) = update.new_email() {
            if new_email != email && users.iter().any(|u| u.email == new_email) {
                return Err(AppError::Duplicate("Email already registered".to_string()));
            }
        }
        let user = &mut users[index];
        if let Some(Some(name)) = &update.name {
            user.name = name.clone();
        }
        if let Some(new_email) = update.new_email() {
            user.email = new_email.to_string();
        }
        if let Some(age) = update.age {
            user.age = age;
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, email: &str) -> AppResult<bool> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.email != email);
        Ok(users.len() < before)
    }
}

/// Router over a [`FakeBackend`]
pub fn setup_fake_app(backend: Arc<FakeBackend>) -> Router {
    startup::build_router(backend)
}

/// Behaviour every backend must share, regardless of engine
pub async fn exercise_backend(backend: &dyn UserBackend) {
    assert!(backend.health_check().await);

    let john = backend
        .create_user(&NewUser::new("John Doe", "john@example.com", Some(30)))
        .await
        .unwrap();
    assert!(!john.id.is_empty());
    assert_eq!(john.age, Some(30));

    let fetched = backend.get_user_by_email("john@example.com").await.unwrap();
    assert_eq!(fetched, Some(john.clone()));

    assert!(matches!(
        backend
            .create_user(&NewUser::new("Other John", "john@example.com", None))
            .await,
        Err(AppError::Duplicate(_))
    ));

    let unchanged = backend
        .update_user("john@example.com", &UserUpdate::default())
        .await
        .unwrap();
    assert_eq!(unchanged, Some(john.clone()));

    let updated = backend
        .update_user("john@example.com", &UserUpdate::default().age(31))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.age, Some(31));
    assert_eq!(updated.name, "John Doe");
    assert_eq!(updated.id, john.id);

    assert_eq!(
        backend
            .update_user("missing@example.com", &UserUpdate::default().age(1))
            .await
            .unwrap(),
        None
    );

    backend
        .create_user(&NewUser::new("Jane", "jane@example.com", None))
        .await
        .unwrap();
    assert_eq!(backend.get_all_users().await.unwrap().len(), 2);

    assert!(backend.delete_user("john@example.com").await.unwrap());
    assert!(!backend.delete_user("john@example.com").await.unwrap());
    assert_eq!(backend.get_user_by_email("john@example.com").await.unwrap(), None);
    assert_eq!(backend.get_all_users().await.unwrap().len(), 1);
}
