use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{self, DateTime as BsonDateTime, Document, doc};
use mongodb::options::{FindOptions, IndexOptions, UpdateOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::debug;

use crate::domain::model::DailyStatistic;
use crate::domain::repository::DailyStatisticRepository;

/// 基于 MongoDB 的每日统计
///
/// 文档以 `{userId, createdDate}` 唯一，结算使用 `$inc` upsert，
/// 同一天的并发结算由存储端原子累加。
pub struct MongoDailyStatisticRepository {
    collection: Collection<Document>,
    _client: Arc<Client>,
}

impl MongoDailyStatisticRepository {
    pub async fn new(client: Arc<Client>, database: &str, collection: &str) -> Result<Self> {
        let collection = client
            .database(database)
            .collection::<Document>(collection);
        ensure_indexes(&collection).await?;

        Ok(Self {
            collection,
            _client: client,
        })
    }
}

async fn ensure_indexes(collection: &Collection<Document>) -> Result<()> {
    let day_index = IndexModel::builder()
        .keys(doc! {"userId": 1, "createdDate": 1})
        .options(
            IndexOptions::builder()
                .unique(true)
                .name(Some("uid_user_day".to_string()))
                .build(),
        )
        .build();
    collection
        .create_index(day_index, None::<mongodb::options::CreateIndexOptions>)
        .await
        .context("failed to create daily statistic index")?;
    Ok(())
}

fn to_statistic(document: Document) -> Result<DailyStatistic> {
    let user_id = document
        .get_str("userId")
        .context("daily statistic without userId")?
        .to_string();
    let created_date = document
        .get_str("createdDate")
        .context("daily statistic without createdDate")?
        .to_string();
    Ok(DailyStatistic {
        user_id,
        created_date,
        spent_time_second: read_integer(&document, "spentTimeSecond").unwrap_or(0),
        point: read_integer(&document, "point").unwrap_or(0),
    })
}

/// 兼容 int32 / int64 / double 存储的数值字段
pub(crate) fn read_integer(document: &Document, field: &str) -> Option<i64> {
    match document.get(field)? {
        bson::Bson::Int64(v) => Some(*v),
        bson::Bson::Int32(v) => Some(i64::from(*v)),
        bson::Bson::Double(v) => Some(v.round() as i64),
        _ => None,
    }
}

#[async_trait]
impl DailyStatisticRepository for MongoDailyStatisticRepository {
    async fn increment_or_insert(
        &self,
        user_id: &str,
        day: &str,
        delta_seconds: i64,
    ) -> Result<()> {
        let now = BsonDateTime::now();
        let filter = doc! {"userId": user_id, "createdDate": day};
        let update = doc! {
            "$inc": {"spentTimeSecond": delta_seconds},
            "$setOnInsert": {"point": 0_i64, "createdAt": now},
            "$set": {"updatedAt": now},
        };
        let options = UpdateOptions::builder().upsert(true).build();

        let result = self
            .collection
            .update_one(filter, update, options)
            .await
            .context("failed to upsert daily statistic")?;
        debug!(
            user_id = %user_id,
            day = %day,
            delta_seconds,
            inserted = result.upserted_id.is_some(),
            "Daily statistic incremented"
        );
        Ok(())
    }

    async fn find(&self, user_id: &str, day: &str) -> Result<Option<DailyStatistic>> {
        let document = self
            .collection
            .find_one(doc! {"userId": user_id, "createdDate": day}, None)
            .await
            .context("failed to load daily statistic")?;
        document.map(to_statistic).transpose()
    }

    async fn find_range(
        &self,
        user_id: &str,
        from_day: &str,
        to_day: &str,
    ) -> Result<Vec<DailyStatistic>> {
        let filter = doc! {
            "userId": user_id,
            "createdDate": {"$gte": from_day, "$lte": to_day},
        };
        let options = FindOptions::builder()
            .sort(doc! {"createdDate": 1})
            .build();

        let documents: Vec<Document> = self
            .collection
            .find(filter, options)
            .await
            .context("failed to query daily statistics")?
            .try_collect()
            .await
            .context("failed to read daily statistics cursor")?;
        documents.into_iter().map(to_statistic).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_statistic_accepts_mixed_number_types() {
        let document = doc! {
            "userId": "u1",
            "createdDate": "20261018",
            "spentTimeSecond": 120_i32,
            "point": 3.0_f64,
        };
        let statistic = to_statistic(document).unwrap();
        assert_eq!(statistic.spent_time_second, 120);
        assert_eq!(statistic.point, 3);

        assert!(to_statistic(doc! {"createdDate": "20261018"}).is_err());
    }
}
