//! DynamoDB VideoRepository.
//!
//! Table layout: partition key `video_id`; the full record as JSON in
//! `record`; `owner_id`, `upload_id` and `asset_id` copied out as top-level
//! attributes. Three global secondary indexes, `upload_id-index`,
//! `asset_id-index` and `owner_id-index`, project ALL attributes.

use crate::domain::video::{page_after, VideoCursor, VideoPatch, VideoRecord};
use crate::ports::repository::VideoRepository;
use crate::ports::BoxError;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use uuid::Uuid;

pub const UPLOAD_INDEX: &str = "upload_id-index";
pub const ASSET_INDEX: &str = "asset_id-index";
pub const OWNER_INDEX: &str = "owner_id-index";

type Item = HashMap<String, AttributeValue>;

/// DynamoRepository implements VideoRepository for AWS DynamoDB.
#[derive(Clone)]
pub struct DynamoRepository {
    client: Client,
    table_name: String,
}

fn to_item(record: &VideoRecord) -> Result<Item, serde_json::Error> {
    let mut item = Item::new();
    item.insert("video_id".into(), AttributeValue::S(record.id.to_string()));
    item.insert(
        "owner_id".into(),
        AttributeValue::S(record.owner_id.to_string()),
    );
    if let Some(upload_id) = &record.upload_id {
        item.insert("upload_id".into(), AttributeValue::S(upload_id.clone()));
    }
    if let Some(asset_id) = &record.asset_id {
        item.insert("asset_id".into(), AttributeValue::S(asset_id.clone()));
    }
    item.insert(
        "record".into(),
        AttributeValue::S(serde_json::to_string(record)?),
    );
    Ok(item)
}

fn from_item(item: &Item) -> Result<VideoRecord, BoxError> {
    let json = item
        .get("record")
        .and_then(|v| v.as_s().ok())
        .ok_or("item has no record attribute")?;
    Ok(serde_json::from_str(json)?)
}

impl DynamoRepository {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    async fn get(&self, id: Uuid) -> Result<Option<VideoRecord>, BoxError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("video_id", AttributeValue::S(id.to_string()))
            .send()
            .await?;
        resp.item.as_ref().map(from_item).transpose()
    }

    async fn query_index(
        &self,
        index: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Option<VideoRecord>, BoxError> {
        let resp = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(index)
            .key_condition_expression("#k = :v")
            .expression_attribute_names("#k", attribute)
            .expression_attribute_values(":v", AttributeValue::S(value.to_string()))
            .limit(1)
            .send()
            .await?;
        resp.items
            .unwrap_or_default()
            .first()
            .map(from_item)
            .transpose()
    }

    /// Every record of `owner_id`, following the query's pagination.
    async fn query_owner(&self, owner_id: Uuid) -> Result<Vec<VideoRecord>, BoxError> {
        let mut records = Vec::new();
        let mut start_key = None;
        loop {
            let resp = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(OWNER_INDEX)
                .key_condition_expression("owner_id = :v")
                .expression_attribute_values(":v", AttributeValue::S(owner_id.to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await?;
            for item in resp.items() {
                records.push(from_item(item)?);
            }
            match resp.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => return Ok(records),
            }
        }
    }

    /// Write the patched record back, unless it was deleted in the meantime.
    async fn patch_record(
        &self,
        record: Option<VideoRecord>,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError> {
        let Some(mut record) = record else {
            return Ok(None);
        };
        patch.apply(&mut record);

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(&record)?))
            .condition_expression("attribute_exists(video_id)")
            .send()
            .await;
        match result {
            Ok(_) => Ok(Some(record)),
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_record(
        &self,
        record: Option<VideoRecord>,
    ) -> Result<Option<VideoRecord>, BoxError> {
        let Some(record) = record else {
            return Ok(None);
        };
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("video_id", AttributeValue::S(record.id.to_string()))
            .send()
            .await?;
        Ok(Some(record))
    }
}

#[async_trait]
impl VideoRepository for DynamoRepository {
    async fn insert(&self, record: &VideoRecord) -> Result<(), BoxError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(record)?))
            .send()
            .await?;
        Ok(())
    }

    async fn find_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<VideoRecord>, BoxError> {
        Ok(self.get(id).await?.filter(|r| r.owner_id == owner_id))
    }

    async fn list_owned(
        &self,
        owner_id: Uuid,
        after: Option<VideoCursor>,
        limit: usize,
    ) -> Result<Vec<VideoRecord>, BoxError> {
        let records = self.query_owner(owner_id).await?;
        Ok(page_after(records, after, limit))
    }

    async fn find_by_upload_id(&self, upload_id: &str) -> Result<Option<VideoRecord>, BoxError> {
        self.query_index(UPLOAD_INDEX, "upload_id", upload_id).await
    }

    async fn update_by_upload_id(
        &self,
        upload_id: &str,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError> {
        let record = self.query_index(UPLOAD_INDEX, "upload_id", upload_id).await?;
        self.patch_record(record, patch).await
    }

    async fn update_by_asset_id(
        &self,
        asset_id: &str,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError> {
        let record = self.query_index(ASSET_INDEX, "asset_id", asset_id).await?;
        self.patch_record(record, patch).await
    }

    async fn update_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
        patch: &VideoPatch,
    ) -> Result<Option<VideoRecord>, BoxError> {
        let record = self.find_owned(id, owner_id).await?;
        self.patch_record(record, patch).await
    }

    async fn delete_by_upload_id(&self, upload_id: &str) -> Result<Option<VideoRecord>, BoxError> {
        let record = self.query_index(UPLOAD_INDEX, "upload_id", upload_id).await?;
        self.remove_record(record).await
    }

    async fn delete_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<VideoRecord>, BoxError> {
        let record = self.find_owned(id, owner_id).await?;
        self.remove_record(record).await
    }
}
