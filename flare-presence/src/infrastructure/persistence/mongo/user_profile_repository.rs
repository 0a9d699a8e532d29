use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Document, doc};
use mongodb::options::FindOneOptions;
use mongodb::{Client, Collection};

use super::statistic_repository::read_integer;
use crate::domain::repository::UserProfileRepository;

/// 从用户集合读取 `alertRange` 字段
pub struct MongoUserProfileRepository {
    collection: Collection<Document>,
    _client: Arc<Client>,
}

impl MongoUserProfileRepository {
    pub fn new(client: Arc<Client>, database: &str, collection: &str) -> Self {
        let collection = client
            .database(database)
            .collection::<Document>(collection);
        Self {
            collection,
            _client: client,
        }
    }
}

#[async_trait]
impl UserProfileRepository for MongoUserProfileRepository {
    async fn alert_range(&self, user_id: &str) -> Result<Option<i64>> {
        // 用户主键可能是 ObjectId，也可能是字符串
        let filter = match ObjectId::parse_str(user_id) {
            Ok(oid) => doc! {"_id": oid},
            Err(_) => doc! {"_id": user_id},
        };
        let options = FindOneOptions::builder()
            .projection(doc! {"alertRange": 1})
            .build();

        let document = self
            .collection
            .find_one(filter, options)
            .await
            .context("failed to load user profile")?;
        Ok(document.and_then(|doc| read_integer(&doc, "alertRange")))
    }
}
