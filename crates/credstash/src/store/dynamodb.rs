//! DynamoDB credential store
//!
//! Table layout: `name` (hash key, S) and `version` (range key, S) plus the string
//! attributes `key`, `contents` and `hmac`. Because versions are zero-padded, a
//! descending query limited to one item returns the latest version.

use super::CredentialStore;
use crate::aws;
use async_trait::async_trait;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType,
    ScalarAttributeType, TableStatus,
};
use aws_sdk_dynamodb::Client;
use credstash_core::types::version::{self, ZERO_VERSION};
use credstash_core::{Credential, Error, Result, StashConfig};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info};

const NAME: &str = "name";
const VERSION: &str = "version";
const KEY: &str = "key";
const CONTENTS: &str = "contents";
const HMAC: &str = "hmac";

/// `name` is a DynamoDB reserved word and must be aliased in expressions
const NAME_ALIAS: &str = "#N";

/// Polls while waiting for a new table to become active
const TABLE_ACTIVE_POLLS: u32 = 60;
const TABLE_ACTIVE_INTERVAL: Duration = Duration::from_secs(1);

type Item = HashMap<String, AttributeValue>;

/// Credential store backed by a DynamoDB table
pub struct DynamoDbStore {
    client: Client,
    table: String,
}

impl DynamoDbStore {
    /// Create a DynamoDB store from configuration
    pub async fn new(config: &StashConfig) -> Self {
        let sdk_config = aws::load_sdk_config(config).await;
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);

        if let Some(endpoint_url) = &config.dynamodb_endpoint {
            debug!("Using custom DynamoDB endpoint: {}", endpoint_url);
            builder = builder.endpoint_url(endpoint_url);
        }

        Self {
            client: Client::from_conf(builder.build()),
            table: config.table.clone(),
        }
    }

    /// Wrap an already configured client
    pub fn from_client(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Get the table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Check if the table exists and is accessible
    pub async fn table_exists(&self) -> Result<bool> {
        match self
            .client
            .describe_table()
            .table_name(&self.table)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match e.into_service_error() {
                DescribeTableError::ResourceNotFoundException(_) => Ok(false),
                other => Err(Error::storage(format!(
                    "Failed to describe table {}: {}",
                    self.table, other
                ))),
            },
        }
    }

    /// Create the table if it doesn't exist and wait until it is active
    pub async fn create_table(&self) -> Result<()> {
        if self.table_exists().await? {
            debug!("Table {} already exists", self.table);
            return Ok(());
        }

        info!("Creating table: {}", self.table);

        self.client
            .create_table()
            .table_name(&self.table)
            .attribute_definitions(attribute_definition(NAME)?)
            .attribute_definitions(attribute_definition(VERSION)?)
            .key_schema(key_schema_element(NAME, KeyType::Hash)?)
            .key_schema(key_schema_element(VERSION, KeyType::Range)?)
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await
            .map_err(|e| {
                Error::storage(format!(
                    "Failed to create table {}: {}",
                    self.table,
                    e.into_service_error()
                ))
            })?;

        for _ in 0..TABLE_ACTIVE_POLLS {
            let resp = self
                .client
                .describe_table()
                .table_name(&self.table)
                .send()
                .await
                .map_err(|e| {
                    Error::storage(format!(
                        "Failed to describe table {}: {}",
                        self.table,
                        e.into_service_error()
                    ))
                })?;

            let status = resp.table.and_then(|t| t.table_status);
            if status == Some(TableStatus::Active) {
                info!("Created table {}", self.table);
                return Ok(());
            }
            tokio::time::sleep(TABLE_ACTIVE_INTERVAL).await;
        }

        Err(Error::storage(format!(
            "Table {} did not become active in time",
            self.table
        )))
    }

    /// Latest item for `name`, read with strong consistency
    async fn query_latest(&self, name: &str, projection: Option<&str>) -> Result<Option<Item>> {
        let resp = self
            .client
            .query()
            .table_name(&self.table)
            .limit(1)
            .scan_index_forward(false)
            .consistent_read(true)
            .key_condition_expression(format!("{} = :name", NAME_ALIAS))
            .expression_attribute_names(NAME_ALIAS, NAME)
            .expression_attribute_values(":name", AttributeValue::S(name.to_string()))
            .set_projection_expression(projection.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                Error::storage(format!(
                    "Failed to query {}: {}",
                    name,
                    e.into_service_error()
                ))
            })?;

        Ok(resp.items.and_then(|items| items.into_iter().next()))
    }

    /// Every stored version of `name` (key attributes only)
    async fn query_versions(&self, name: &str) -> Result<Vec<String>> {
        let mut versions = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let resp = self
                .client
                .query()
                .table_name(&self.table)
                .consistent_read(true)
                .key_condition_expression(format!("{} = :name", NAME_ALIAS))
                .expression_attribute_names(NAME_ALIAS, NAME)
                .expression_attribute_values(":name", AttributeValue::S(name.to_string()))
                .projection_expression(VERSION)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    Error::storage(format!(
                        "Failed to query versions of {}: {}",
                        name,
                        e.into_service_error()
                    ))
                })?;

            for item in resp.items() {
                versions.push(string_attr(item, VERSION)?);
            }

            match resp.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(versions)
    }
}

#[async_trait]
impl CredentialStore for DynamoDbStore {
    /// Paginated scan reduced to the maximum padded version per name. Every item is
    /// visited, so the result does not depend on scan order.
    async fn list_credentials(&self) -> Result<BTreeMap<String, String>> {
        debug!("Listing credentials in table {}", self.table);

        let mut highest: BTreeMap<String, String> = BTreeMap::new();
        let mut start_key: Option<Item> = None;

        loop {
            let resp = self
                .client
                .scan()
                .table_name(&self.table)
                .projection_expression(format!("{}, {}", NAME_ALIAS, VERSION))
                .expression_attribute_names(NAME_ALIAS, NAME)
                .consistent_read(true)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    Error::storage(format!(
                        "Failed to scan table {}: {}",
                        self.table,
                        e.into_service_error()
                    ))
                })?;

            for item in resp.items() {
                let name = string_attr(item, NAME)?;
                let version = string_attr(item, VERSION)?;
                keep_highest(&mut highest, name, version);
            }

            match resp.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        debug!("Found {} credentials", highest.len());
        Ok(highest)
    }

    async fn get(&self, name: &str) -> Result<Credential> {
        let item = self
            .query_latest(name, None)
            .await?
            .ok_or_else(|| Error::not_found(name))?;
        from_item(&item)
    }

    async fn get_at_version(&self, name: &str, version: &str) -> Result<Credential> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(NAME, AttributeValue::S(name.to_string()))
            .key(VERSION, AttributeValue::S(version.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| {
                Error::storage(format!(
                    "Failed to get {} at version {}: {}",
                    name,
                    version::unpad(version),
                    e.into_service_error()
                ))
            })?;

        match resp.item {
            Some(item) if !item.is_empty() => from_item(&item),
            _ => Err(Error::not_found_at(name, version::unpad(version))),
        }
    }

    async fn get_highest_version(&self, name: &str) -> Result<String> {
        match self.query_latest(name, Some(VERSION)).await? {
            Some(item) => string_attr(&item, VERSION),
            None => Ok(ZERO_VERSION.to_string()),
        }
    }

    async fn put(&self, credential: &Credential) -> Result<()> {
        debug!(
            "Storing {} version {} in table {}",
            credential.name,
            credential.unpadded_version(),
            self.table
        );

        let result = self
            .client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(to_item(credential)))
            .condition_expression(format!("attribute_not_exists({})", NAME_ALIAS))
            .expression_attribute_names(NAME_ALIAS, NAME)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match e.into_service_error() {
                PutItemError::ConditionalCheckFailedException(_) => Err(Error::duplicate_version(
                    &credential.name,
                    credential.unpadded_version(),
                )),
                other => Err(Error::storage(format!(
                    "Failed to put {}: {}",
                    credential.name, other
                ))),
            },
        }
    }

    async fn delete(&self, name: &str) -> Result<usize> {
        let versions = self.query_versions(name).await?;

        for version in &versions {
            self.client
                .delete_item()
                .table_name(&self.table)
                .key(NAME, AttributeValue::S(name.to_string()))
                .key(VERSION, AttributeValue::S(version.clone()))
                .send()
                .await
                .map_err(|e| {
                    Error::storage(format!(
                        "Failed to delete {} version {}: {}",
                        name,
                        version::unpad(version),
                        e.into_service_error()
                    ))
                })?;
            debug!("Deleted {} version {}", name, version::unpad(version));
        }

        info!("Deleted {} versions of {}", versions.len(), name);
        Ok(versions.len())
    }
}

impl std::fmt::Debug for DynamoDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbStore")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

fn attribute_definition(name: &str) -> Result<AttributeDefinition> {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .map_err(|e| Error::storage(format!("Invalid attribute definition {}: {}", name, e)))
}

fn key_schema_element(name: &str, key_type: KeyType) -> Result<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .map_err(|e| Error::storage(format!("Invalid key schema element {}: {}", name, e)))
}

fn keep_highest(highest: &mut BTreeMap<String, String>, name: String, version: String) {
    match highest.get(&name) {
        Some(current) if *current >= version => {}
        _ => {
            highest.insert(name, version);
        }
    }
}

fn to_item(credential: &Credential) -> Item {
    [
        (NAME, &credential.name),
        (VERSION, &credential.version),
        (KEY, &credential.key),
        (CONTENTS, &credential.contents),
        (HMAC, &credential.hmac),
    ]
    .into_iter()
    .map(|(attr, value)| (attr.to_string(), AttributeValue::S(value.clone())))
    .collect()
}

fn from_item(item: &Item) -> Result<Credential> {
    Ok(Credential {
        name: string_attr(item, NAME)?,
        version: string_attr(item, VERSION)?,
        key: string_attr(item, KEY)?,
        contents: string_attr(item, CONTENTS)?,
        hmac: string_attr(item, HMAC)?,
    })
}

fn string_attr(item: &Item, attr: &str) -> Result<String> {
    item.get(attr)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| Error::storage(format!("item is missing string attribute '{}'", attr)))
}
