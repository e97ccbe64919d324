use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::backend::UserBackend;
use crate::error::{AppError, AppResult};
use crate::models::{NewUser, User, UserUpdate};

pub const USERS_COLLECTION: &str = "users";

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Clone)]
pub struct MongoBackendConfig {
    pub uri: String,
    pub database: String,
    /// Seconds to wait for a reachable server
    pub server_selection_timeout: u64,
}

impl MongoBackendConfig {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            server_selection_timeout: 5,
        }
    }

    pub fn with_server_selection_timeout(mut self, seconds: u64) -> Self {
        self.server_selection_timeout = seconds;
        self
    }
}

/// Document-store backend on MongoDB
///
/// Users live in the `users` collection with a unique index on `email`.
/// The driver's `_id` is only ever surfaced as the string `id` field.
pub struct MongoBackend {
    config: MongoBackendConfig,
    client: RwLock<Option<Client>>,
}

impl MongoBackend {
    pub fn new(config: MongoBackendConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
        }
    }

    async fn database(&self) -> AppResult<Database> {
        self.client
            .read()
            .await
            .as_ref()
            .map(|client| client.database(&self.config.database))
            .ok_or_else(|| AppError::Connection("MongoDB is not connected".to_string()))
    }

    async fn users(&self) -> AppResult<Collection<Document>> {
        Ok(users_collection(&self.database().await?))
    }

    async fn ensure_email_available(
        &self,
        users: &Collection<Document>,
        email: &str,
    ) -> AppResult<()> {
        let existing = users
            .find_one(doc! { "email": email })
            .await
            .map_err(|e| map_mongo_error(e, "look up user"))?;

        match existing {
            Some(_) => Err(AppError::Duplicate(
                "User with this email already exists".to_string(),
            )),
            None => Ok(()),
        }
    }
}

fn users_collection(database: &Database) -> Collection<Document> {
    database.collection::<Document>(USERS_COLLECTION)
}

#[async_trait]
impl UserBackend for MongoBackend {
    async fn connect(&self) -> AppResult<()> {
        let mut guard = self.client.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut options = ClientOptions::parse(&self.config.uri)
            .await
            .map_err(|e| AppError::Connection(format!("Invalid MongoDB URI: {}", e)))?;
        options.server_selection_timeout =
            Some(Duration::from_secs(self.config.server_selection_timeout));

        let client = Client::with_options(options)
            .map_err(|e| AppError::Connection(format!("Failed to create MongoDB client: {}", e)))?;
        let database = client.database(&self.config.database);

        database.run_command(doc! { "ping": 1 }).await.map_err(|e| {
            error!("Failed to connect to MongoDB: {}", e);
            AppError::Connection(format!("Failed to connect to MongoDB: {}", e))
        })?;

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        users_collection(&database)
            .create_index(email_index)
            .await
            .map_err(|e| AppError::Connection(format!("Failed to create email index: {}", e)))?;

        info!(
            "MongoDB connected successfully to database: {}",
            self.config.database
        );
        *guard = Some(client);
        Ok(())
    }

    async fn disconnect(&self) -> AppResult<()> {
        let client = self.client.write().await.take();
        if let Some(client) = client {
            client.shutdown().await;
            info!("MongoDB connection closed");
        }
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let Ok(database) = self.database().await else {
            return false;
        };
        database.run_command(doc! { "ping": 1 }).await.is_ok()
    }

    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        let users = self.users().await?;
        self.ensure_email_available(&users, &user.email).await?;

        let inserted = users
            .insert_one(new_user_document(user))
            .await
            .map_err(|e| map_mongo_error(e, "create user"))?;

        let created = users
            .find_one(doc! { "_id": inserted.inserted_id })
            .await
            .map_err(|e| map_mongo_error(e, "read created user"))?
            .ok_or_else(|| AppError::Storage("Created user could not be read back".to_string()))?;

        Ok(document_to_user(&created))
    }

    async fn get_all_users(&self) -> AppResult<Vec<User>> {
        let users = self.users().await?;

        let documents: Vec<Document> = users
            .find(doc! {})
            .await
            .map_err(|e| map_mongo_error(e, "list users"))?
            .try_collect()
            .await
            .map_err(|e| map_mongo_error(e, "list users"))?;

        Ok(documents.iter().map(document_to_user).collect())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users().await?;

        let document = users
            .find_one(doc! { "email": email })
            .await
            .map_err(|e| map_mongo_error(e, "fetch user"))?;

        Ok(document.as_ref().map(document_to_user))
    }

    async fn update_user(&self, email: &str, update: &UserUpdate) -> AppResult<Option<User>> {
        let users = self.users().await?;

        let Some(existing) = users
            .find_one(doc! { "email": email })
            .await
            .map_err(|e| map_mongo_error(e, "fetch user"))?
        else {
            return Ok(None);
        };

        if update.is_empty() {
            return Ok(Some(document_to_user(&existing)));
        }

        let set = update_document(update)?;

        if let Some(new_email) = update.new_email() {
            if new_email != email {
                self.ensure_email_available(&users, new_email).await?;
            }
        }

        users
            .update_one(doc! { "email": email }, doc! { "$set": set })
            .await
            .map_err(|e| map_mongo_error(e, "update user"))?;

        let current_email = update.new_email().unwrap_or(email);
        let updated = users
            .find_one(doc! { "email": current_email })
            .await
            .map_err(|e| map_mongo_error(e, "fetch user"))?;

        Ok(updated.as_ref().map(document_to_user))
    }

    async fn delete_user(&self, email: &str) -> AppResult<bool> {
        let users = self.users().await?;

        let result = users
            .delete_one(doc! { "email": email })
            .await
            .map_err(|e| map_mongo_error(e, "delete user"))?;

        Ok(result.deleted_count == 1)
    }
}

fn new_user_document(user: &NewUser) -> Document {
    doc! {
        "name": user.name.as_str(),
        "email": user.email.as_str(),
        "age": user.age.map(Bson::Int64).unwrap_or(Bson::Null),
    }
}

/// `$set` document for the supplied fields. Never touches `_id`.
fn update_document(update: &UserUpdate) -> AppResult<Document> {
    let mut set = Document::new();

    match &update.name {
        Some(Some(name)) => {
            set.insert("name", name.as_str());
        }
        Some(None) => return Err(AppError::Validation("name cannot be null".to_string())),
        None => {}
    }
    match &update.email {
        Some(Some(email)) => {
            set.insert("email", email.as_str());
        }
        Some(None) => return Err(AppError::Validation("email cannot be null".to_string())),
        None => {}
    }
    if let Some(age) = update.age {
        set.insert("age", age.map(Bson::Int64).unwrap_or(Bson::Null));
    }

    Ok(set)
}

/// Convert a stored document into a user, renaming `_id` to `id`
fn document_to_user(document: &Document) -> User {
    let id = match document.get("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(value)) => value.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let age = match document.get("age") {
        Some(Bson::Int32(value)) => Some(i64::from(*value)),
        Some(Bson::Int64(value)) => Some(*value),
        _ => None,
    };

    User {
        id,
        name: document.get_str("name").unwrap_or_default().to_string(),
        email: document.get_str("email").unwrap_or_default().to_string(),
        age,
    }
}

fn map_mongo_error(error: MongoError, context: &str) -> AppError {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE =>
        {
            AppError::Duplicate("User with this email already exists".to_string())
        }
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) => {
            AppError::Connection(format!("Failed to {}: {}", context, error))
        }
        _ => AppError::Storage(format!("Failed to {}: {}", context, error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    #[test]
    fn test_document_to_user_renames_id() {
        let oid = ObjectId::new();
        let document = doc! {
            "_id": oid,
            "name": "John Doe",
            "email": "john@example.com",
            "age": 30_i32,
        };

        let user = document_to_user(&document);
        assert_eq!(user.id, oid.to_hex());
        assert_eq!(user.name, "John Doe");
        assert_eq!(user.email, "john@example.com");
        assert_eq!(user.age, Some(30));
    }

    #[test]
    fn test_document_to_user_defaults_missing_fields() {
        let user = document_to_user(&doc! { "age": Bson::Null });
        assert_eq!(user.id, "");
        assert_eq!(user.name, "");
        assert_eq!(user.email, "");
        assert_eq!(user.age, None);
    }

    #[test]
    fn test_new_user_document() {
        let document = new_user_document(&NewUser::new("Ann", "ann@example.com", None));
        assert!(!document.contains_key("_id"));
        assert_eq!(document.get_str("email").unwrap(), "ann@example.com");
        assert_eq!(document.get("age"), Some(&Bson::Null));

        let document = new_user_document(&NewUser::new("Ann", "ann@example.com", Some(41)));
        assert_eq!(document.get_i64("age").unwrap(), 41);
    }

    #[test]
    fn test_update_document_only_has_supplied_fields() {
        let set = update_document(&UserUpdate::default().age(31)).unwrap();
        assert_eq!(set, doc! { "age": 31_i64 });

        let set = update_document(&UserUpdate::default().name("Jane").clear_age()).unwrap();
        assert_eq!(set, doc! { "name": "Jane", "age": Bson::Null });
    }

    #[test]
    fn test_update_document_rejects_null_email() {
        let update = UserUpdate {
            email: Some(None),
            ..UserUpdate::default()
        };
        assert!(matches!(update_document(&update), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_operations_require_connection() {
        let backend = MongoBackend::new(MongoBackendConfig::new(
            "mongodb://localhost:27017",
            "users_service",
        ));

        assert!(!backend.health_check().await);
        assert!(matches!(
            backend.get_all_users().await,
            Err(AppError::Connection(_))
        ));
        backend.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_to_connect() {
        let backend = MongoBackend::new(
            MongoBackendConfig::new("mongodb://127.0.0.1:1", "users_service")
                .with_server_selection_timeout(1),
        );

        assert!(matches!(backend.connect().await, Err(AppError::Connection(_))));
        assert!(!backend.health_check().await);
    }
}
