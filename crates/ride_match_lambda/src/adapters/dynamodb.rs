//! DynamoDB-backed document store.
//!
//! One table per collection, keyed by the string attribute `id`. Handlers
//! call the store synchronously; each method bridges onto the async SDK
//! with `block_in_place`, which requires the multi-threaded runtime.

use std::collections::HashMap;
use std::future::Future;

use aws_sdk_dynamodb::types::{AttributeValue, TransactWriteItem, Update};
use serde_json::Value;

use ride_match_core::contract::{
    FIELD_ACCEPTED_AT, FIELD_ACTIVE_RIDE_ID, FIELD_ASSIGNED_VOLUNTEER_ID,
    FIELD_ASSIGNED_VOLUNTEER_NAME, FIELD_IS_AVAILABLE, FIELD_STATUS, RIDE_REQUESTS_COLLECTION,
    USERS_COLLECTION, VOLUNTEERS_COLLECTION,
};
use ride_match_core::model::RideStatus;

use super::attribute_json::{document_to_item, item_to_document, json_to_attribute, ID_ATTRIBUTE};
use super::document_store::{
    AssignmentClaim, ClaimOutcome, DocumentStore, FieldEquals, Fields, StoreError, StoredDocument,
};
use crate::config::TableNames;

const CONDITIONAL_CHECK_FAILED: &str = "ConditionalCheckFailed";

#[derive(Clone)]
pub struct DynamoDbDocumentStore {
    client: aws_sdk_dynamodb::Client,
    tables: TableNames,
}

impl DynamoDbDocumentStore {
    pub fn new(client: aws_sdk_dynamodb::Client, tables: TableNames) -> Self {
        Self { client, tables }
    }

    fn table_for(&self, collection: &str) -> Result<String, StoreError> {
        match collection {
            RIDE_REQUESTS_COLLECTION => Ok(self.tables.ride_requests.clone()),
            VOLUNTEERS_COLLECTION => Ok(self.tables.volunteers.clone()),
            USERS_COLLECTION => Ok(self.tables.users.clone()),
            other => Err(StoreError::Backend(format!("unknown collection '{other}'"))),
        }
    }
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

fn key_for(id: &str) -> HashMap<String, AttributeValue> {
    HashMap::from([(ID_ATTRIBUTE.to_string(), AttributeValue::S(id.to_string()))])
}

/// `SET #f0 = :v0, #f1 = :v1, ...` plus the placeholder maps it references.
struct SetExpression {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl SetExpression {
    fn from_fields(fields: &Fields) -> Self {
        let mut names = HashMap::new();
        let mut values = HashMap::new();
        let mut clauses = Vec::with_capacity(fields.len());
        for (index, (field, value)) in fields.iter().enumerate() {
            let name = format!("#f{index}");
            let placeholder = format!(":v{index}");
            clauses.push(format!("{name} = {placeholder}"));
            names.insert(name, field.clone());
            values.insert(placeholder, json_to_attribute(value));
        }
        Self {
            expression: format!("SET {}", clauses.join(", ")),
            names,
            values,
        }
    }

    fn with_condition(mut self, condition: &FieldEquals) -> (Self, String) {
        self.names.insert("#c0".to_string(), condition.field.clone());
        self.values
            .insert(":c0".to_string(), json_to_attribute(&condition.value));
        (self, "#c0 = :c0".to_string())
    }
}

fn filter_expression(
    filters: &[FieldEquals],
) -> (String, HashMap<String, String>, HashMap<String, AttributeValue>) {
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    let mut clauses = Vec::with_capacity(filters.len());
    for (index, filter) in filters.iter().enumerate() {
        let name = format!("#q{index}");
        let placeholder = format!(":q{index}");
        clauses.push(format!("{name} = {placeholder}"));
        names.insert(name, filter.field.clone());
        values.insert(placeholder, json_to_attribute(&filter.value));
    }
    (clauses.join(" AND "), names, values)
}

/// Available and not holding another ride.
const VOLUNTEER_FREE_CONDITION: &str =
    "#available = :true AND (attribute_not_exists(#ride) OR #ride = :null)";

fn claim_updates(
    tables: &TableNames,
    claim: &AssignmentClaim,
    accepted_at_ms: i64,
) -> Result<Vec<TransactWriteItem>, StoreError> {
    let ride_update = Update::builder()
        .table_name(&tables.ride_requests)
        .set_key(Some(key_for(&claim.ride_id)))
        .update_expression("SET #status = :accepted, #vid = :vid, #vname = :vname, #at = :at")
        .condition_expression("#status = :pending")
        .expression_attribute_names("#status", FIELD_STATUS)
        .expression_attribute_names("#vid", FIELD_ASSIGNED_VOLUNTEER_ID)
        .expression_attribute_names("#vname", FIELD_ASSIGNED_VOLUNTEER_NAME)
        .expression_attribute_names("#at", FIELD_ACCEPTED_AT)
        .expression_attribute_values(
            ":accepted",
            AttributeValue::S(RideStatus::Accepted.wire_name().to_string()),
        )
        .expression_attribute_values(
            ":pending",
            AttributeValue::S(RideStatus::Pending.wire_name().to_string()),
        )
        .expression_attribute_values(":vid", AttributeValue::S(claim.volunteer_id.clone()))
        .expression_attribute_values(":vname", AttributeValue::S(claim.volunteer_name.clone()))
        .expression_attribute_values(":at", AttributeValue::N(accepted_at_ms.to_string()))
        .build()
        .map_err(|error| StoreError::Backend(format!("invalid ride update: {error}")))?;

    let volunteer_update = Update::builder()
        .table_name(&tables.volunteers)
        .set_key(Some(key_for(&claim.volunteer_id)))
        .update_expression("SET #available = :false, #ride = :ride")
        .condition_expression(VOLUNTEER_FREE_CONDITION)
        .expression_attribute_names("#available", FIELD_IS_AVAILABLE)
        .expression_attribute_names("#ride", FIELD_ACTIVE_RIDE_ID)
        .expression_attribute_values(":false", AttributeValue::Bool(false))
        .expression_attribute_values(":true", AttributeValue::Bool(true))
        .expression_attribute_values(":null", AttributeValue::Null(true))
        .expression_attribute_values(":ride", AttributeValue::S(claim.ride_id.clone()))
        .build()
        .map_err(|error| StoreError::Backend(format!("invalid volunteer update: {error}")))?;

    Ok(vec![
        TransactWriteItem::builder().update(ride_update).build(),
        TransactWriteItem::builder().update(volunteer_update).build(),
    ])
}

impl DocumentStore for DynamoDbDocumentStore {
    fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let table = self.table_for(collection)?;
        let output = block_on(
            self.client
                .get_item()
                .table_name(table)
                .set_key(Some(key_for(id)))
                .consistent_read(true)
                .send(),
        )
        .map_err(|error| StoreError::Backend(format!("failed to read {collection}/{id}: {error}")))?;

        Ok(output
            .item()
            .and_then(item_to_document)
            .map(|(_, fields)| fields))
    }

    fn create(&self, collection: &str, fields: Value) -> Result<String, StoreError> {
        let table = self.table_for(collection)?;
        let Value::Object(fields) = fields else {
            return Err(StoreError::Backend(
                "documents must be JSON objects".to_string(),
            ));
        };
        let id = uuid::Uuid::new_v4().to_string();

        block_on(
            self.client
                .put_item()
                .table_name(table)
                .set_item(Some(document_to_item(&id, &fields)))
                .condition_expression("attribute_not_exists(#id)")
                .expression_attribute_names("#id", ID_ATTRIBUTE)
                .send(),
        )
        .map_err(|error| StoreError::Backend(format!("failed to create {collection} document: {error}")))?;

        Ok(id)
    }

    fn update_fields(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
        condition: Option<&FieldEquals>,
    ) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }
        let table = self.table_for(collection)?;

        let set = SetExpression::from_fields(fields);
        let (set, condition_expression) = match condition {
            Some(condition) => {
                let (set, clause) = set.with_condition(condition);
                (set, format!("attribute_exists(#id) AND {clause}"))
            }
            None => (set, "attribute_exists(#id)".to_string()),
        };
        let mut names = set.names;
        names.insert("#id".to_string(), ID_ATTRIBUTE.to_string());

        let result = block_on(
            self.client
                .update_item()
                .table_name(table)
                .set_key(Some(key_for(id)))
                .update_expression(set.expression)
                .condition_expression(condition_expression)
                .set_expression_attribute_names(Some(names))
                .set_expression_attribute_values(Some(set.values))
                .send(),
        );

        match result {
            Ok(_) => Ok(()),
            Err(error)
                if error
                    .as_service_error()
                    .map(|service| service.is_conditional_check_failed_exception())
                    .unwrap_or(false) =>
            {
                // The item is re-read to tell a missing document from a failed precondition.
                if condition.is_some() && self.get(collection, id)?.is_some() {
                    Err(StoreError::ConditionFailed {
                        collection: collection.to_string(),
                        id: id.to_string(),
                    })
                } else {
                    Err(StoreError::NotFound {
                        collection: collection.to_string(),
                        id: id.to_string(),
                    })
                }
            }
            Err(error) => Err(StoreError::Backend(format!(
                "failed to update {collection}/{id}: {error}"
            ))),
        }
    }

    fn query_equal(
        &self,
        collection: &str,
        filters: &[FieldEquals],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let table = self.table_for(collection)?;
        let (expression, names, values) = filter_expression(filters);

        let mut documents = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;
        loop {
            let mut request = self
                .client
                .scan()
                .table_name(table.clone())
                .consistent_read(true)
                .set_exclusive_start_key(start_key.take());
            if !expression.is_empty() {
                request = request
                    .filter_expression(expression.clone())
                    .set_expression_attribute_names(Some(names.clone()))
                    .set_expression_attribute_values(Some(values.clone()));
            }

            let output = block_on(request.send()).map_err(|error| {
                StoreError::Backend(format!("failed to query {collection}: {error}"))
            })?;

            documents.extend(
                output
                    .items()
                    .iter()
                    .filter_map(item_to_document)
                    .map(|(id, fields)| StoredDocument { id, fields }),
            );

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(documents)
    }

    fn claim_assignment(&self, claim: &AssignmentClaim) -> Result<ClaimOutcome, StoreError> {
        let accepted_at_ms = self.server_timestamp_ms();
        let items = claim_updates(&self.tables, claim, accepted_at_ms)?;

        let result = block_on(
            self.client
                .transact_write_items()
                .set_transact_items(Some(items))
                .send(),
        );

        let error = match result {
            Ok(_) => return Ok(ClaimOutcome::Claimed { accepted_at_ms }),
            Err(error) => error,
        };

        let reasons: Vec<Option<String>> = match error.as_service_error() {
            Some(aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsError::TransactionCanceledException(cancelled)) => cancelled
                .cancellation_reasons()
                .iter()
                .map(|reason| reason.code().map(str::to_string))
                .collect(),
            _ => {
                return Err(StoreError::Backend(format!(
                    "failed to claim {} for {}: {error}",
                    claim.volunteer_id, claim.ride_id
                )))
            }
        };

        let failed = |index: usize| {
            reasons
                .get(index)
                .and_then(|code| code.as_deref())
                .map(|code| code == CONDITIONAL_CHECK_FAILED)
                .unwrap_or(false)
        };

        if failed(0) {
            Ok(ClaimOutcome::RideNotPending)
        } else if failed(1) {
            Ok(ClaimOutcome::VolunteerUnavailable)
        } else {
            Err(StoreError::Backend(format!(
                "claim transaction for {} was cancelled: {reasons:?}",
                claim.ride_id
            )))
        }
    }

    fn server_timestamp_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().expect("object").clone()
    }

    #[test]
    fn set_expression_uses_placeholders_for_every_field() {
        let set = SetExpression::from_fields(&fields(json!({
            "isAvailable": true,
            "isOnline": false
        })));

        assert_eq!(set.expression, "SET #f0 = :v0, #f1 = :v1");
        assert_eq!(set.names.get("#f0").map(String::as_str), Some("isAvailable"));
        assert_eq!(set.values.get(":v1"), Some(&AttributeValue::Bool(false)));
    }

    #[test]
    fn filter_expression_joins_with_and() {
        let (expression, names, values) = filter_expression(&[
            FieldEquals::new("isAvailable", true),
            FieldEquals::new("isOnline", true),
        ]);

        assert_eq!(expression, "#q0 = :q0 AND #q1 = :q1");
        assert_eq!(names.len(), 2);
        assert_eq!(values.get(":q1"), Some(&AttributeValue::Bool(true)));
    }

    #[test]
    fn claim_is_two_conditional_updates() {
        let tables = TableNames {
            ride_requests: "rides".to_string(),
            volunteers: "vols".to_string(),
            users: "users".to_string(),
        };
        let claim = AssignmentClaim {
            ride_id: "ride-1".to_string(),
            volunteer_id: "v1".to_string(),
            volunteer_name: "Grace".to_string(),
        };

        let items = claim_updates(&tables, &claim, 5).expect("updates should build");
        assert_eq!(items.len(), 2);

        let ride = items[0].update().expect("ride update");
        assert_eq!(ride.table_name(), "rides");
        assert_eq!(ride.condition_expression(), Some("#status = :pending"));

        let volunteer = items[1].update().expect("volunteer update");
        assert_eq!(volunteer.table_name(), "vols");
        assert_eq!(
            volunteer.condition_expression(),
            Some("#available = :true AND (attribute_not_exists(#ride) OR #ride = :null)")
        );
        assert_eq!(
            volunteer
                .expression_attribute_values()
                .and_then(|values| values.get(":null")),
            Some(&AttributeValue::Null(true))
        );
    }
}
