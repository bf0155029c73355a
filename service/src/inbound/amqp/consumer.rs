//! `user_created` identity-event consumer.
//!
//! Subscribes to the durable `user_created` queue with prefetch 1 and drives
//! the idempotent ingest use-case. Acknowledgement policy:
//!
//! - id already in scope: ack (idempotent skip)
//! - insert success: ack
//! - anything else — malformed payload or store failure: nack with requeue,
//!   so only applied events are ever acknowledged

use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::{IngestOutcome, TenantId, UserDraft, UserId, UserService};

/// Queue carrying identity events.
pub const QUEUE_NAME: &str = "user_created";

/// Fatal consumer failures (broker connectivity and topology).
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// Broker connection or channel failure.
    #[error("AMQP broker error: {0}")]
    Broker(#[from] lapin::Error),
}

/// What to do with a delivery after processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Ack,
    Requeue,
}

/// Wire shape of a `user_created` event.
#[derive(Debug, Deserialize)]
struct UserCreatedEvent {
    user_id: String,
    username: String,
    email: String,
    #[serde(default)]
    tenant_id: Option<String>,
}

fn decode_event(payload: &[u8]) -> Option<(TenantId, UserDraft)> {
    let event: UserCreatedEvent = match serde_json::from_slice(payload) {
        Ok(event) => event,
        Err(error) => {
            warn!(%error, "undecodable identity event");
            return None;
        }
    };
    let tenant = match TenantId::from_header(event.tenant_id.as_deref()) {
        Ok(tenant) => tenant,
        Err(error) => {
            warn!(%error, "identity event carries an invalid tenant");
            return None;
        }
    };
    let id = match UserId::new(&event.user_id) {
        Ok(id) => id,
        Err(error) => {
            warn!(%error, "identity event carries an invalid user id");
            return None;
        }
    };
    if event.username.trim().is_empty() || event.email.trim().is_empty() {
        warn!(user_id = %id, "identity event has a blank username or email");
        return None;
    }
    Some((
        tenant,
        UserDraft {
            id,
            username: event.username,
            email: event.email,
        },
    ))
}

async fn process(service: &UserService, payload: &[u8]) -> Disposition {
    // An event that cannot be decoded is never acknowledged; it stays on
    // the broker for redelivery and operator inspection.
    let Some((tenant, draft)) = decode_event(payload) else {
        return Disposition::Requeue;
    };
    let user_id = draft.id.clone();
    match service.ingest_created(&tenant, draft).await {
        Ok(IngestOutcome::Created) => {
            info!(%tenant, %user_id, "identity event ingested");
            Disposition::Ack
        }
        Ok(IngestOutcome::AlreadyExists) => {
            debug!(%tenant, %user_id, "identity event skipped, id already in scope");
            Disposition::Ack
        }
        Err(error) => {
            warn!(%tenant, %user_id, %error, "identity event ingest failed, requeueing");
            Disposition::Requeue
        }
    }
}

/// Connect to the broker and consume identity events until the stream ends.
pub async fn run(addr: &str, service: UserService) -> Result<(), ConsumerError> {
    let connection = Connection::connect(addr, ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;
    channel
        .queue_declare(
            QUEUE_NAME,
            QueueDeclareOptions {
                durable: true,
                ..QueueDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;
    // One unacked delivery at a time keeps redelivery ordering simple.
    channel.basic_qos(1, BasicQosOptions::default()).await?;

    let mut consumer = channel
        .basic_consume(
            QUEUE_NAME,
            "user-service",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;
    info!(queue = QUEUE_NAME, "identity event consumer started");

    while let Some(delivery) = consumer.next().await {
        let delivery = delivery?;
        match process(&service, &delivery.data).await {
            Disposition::Ack => delivery.ack(BasicAckOptions::default()).await?,
            Disposition::Requeue => {
                delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..BasicNackOptions::default()
                    })
                    .await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{FixtureOrderSource, FixtureUserStore, UserStore};
    use rstest::rstest;
    use std::sync::Arc;

    fn service(store: Arc<FixtureUserStore>) -> UserService {
        UserService::new(store, Arc::new(FixtureOrderSource::new()))
    }

    fn event(user_id: &str, email: &str, tenant: Option<&str>) -> Vec<u8> {
        let mut body = serde_json::json!({
            "user_id": user_id,
            "username": "ada",
            "email": email,
        });
        if let Some(tenant) = tenant {
            body["tenant_id"] = serde_json::Value::String(tenant.to_owned());
        }
        serde_json::to_vec(&body).expect("serializable event")
    }

    #[rstest]
    #[actix_web::test]
    async fn valid_event_is_ingested_and_acked() {
        let store = Arc::new(FixtureUserStore::new());
        let service = service(Arc::clone(&store));

        let disposition = process(&service, &event("u-1", "ada@example.test", None)).await;
        assert_eq!(disposition, Disposition::Ack);

        let tenant = TenantId::default();
        let id = UserId::new("u-1").expect("id");
        let stored = store
            .find_by_id(&tenant, &id)
            .await
            .expect("lookup")
            .expect("inserted");
        assert_eq!(stored.email, "ada@example.test");
    }

    #[rstest]
    #[actix_web::test]
    async fn event_tenant_scopes_the_insert() {
        let store = Arc::new(FixtureUserStore::new());
        let service = service(Arc::clone(&store));

        process(&service, &event("u-1", "ada@example.test", Some("acme_corp"))).await;

        let id = UserId::new("u-1").expect("id");
        let scoped = TenantId::new("acme_corp").expect("tenant");
        assert!(store
            .find_by_id(&scoped, &id)
            .await
            .expect("lookup")
            .is_some());
        assert!(store
            .find_by_id(&TenantId::default(), &id)
            .await
            .expect("lookup")
            .is_none());
    }

    #[rstest]
    #[actix_web::test]
    async fn duplicate_event_is_skipped_and_acked() {
        let store = Arc::new(FixtureUserStore::new());
        let service = service(Arc::clone(&store));

        process(&service, &event("u-1", "ada@example.test", None)).await;
        let disposition = process(&service, &event("u-1", "other@example.test", None)).await;
        assert_eq!(disposition, Disposition::Ack);

        // The original record survives the replay.
        let stored = store
            .find_by_id(&TenantId::default(), &UserId::new("u-1").expect("id"))
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(stored.email, "ada@example.test");
    }

    #[rstest]
    #[case::not_json(b"not json".to_vec())]
    #[case::missing_fields(serde_json::to_vec(&serde_json::json!({"user_id": "u-1"})).expect("json"))]
    #[case::blank_email(event("u-1", "   ", None))]
    #[actix_web::test]
    async fn malformed_payload_is_never_acknowledged(#[case] payload: Vec<u8>) {
        let store = Arc::new(FixtureUserStore::new());
        let service = service(Arc::clone(&store));

        let disposition = process(&service, &payload).await;
        assert_eq!(disposition, Disposition::Requeue);
        assert!(store
            .list(&TenantId::default())
            .await
            .expect("list")
            .is_empty());
    }

    #[rstest]
    #[actix_web::test]
    async fn store_failure_requeues() {
        let store = Arc::new(FixtureUserStore::new());
        store.break_with("connection refused");
        let service = service(store);

        let disposition = process(&service, &event("u-1", "ada@example.test", None)).await;
        assert_eq!(disposition, Disposition::Requeue);
    }
}
