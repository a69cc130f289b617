mod common;

use common::{
    error_summaries, for_create, for_delete, for_update, meta, mock_activated, object, FakeMnq,
    PROJECT_ID,
};
use mockito::Server;
use scaleway::resources::mnq::{SnsTopicResource, SnsTopicSubscriptionResource, SqsQueueResource};
use scaleway::skeleton::{Managed, ScalewayResource};
use tfplug::{Context, Dynamic, ResourceData};

fn queue_plan(name: &str) -> Vec<(&str, Dynamic)> {
    vec![
        ("name", Dynamic::from(name)),
        ("access_key", Dynamic::from("SCWACCESSKEY")),
        ("secret_key", Dynamic::from("secret")),
    ]
}

async fn create_queue(queues: &Managed<SqsQueueResource>, name: &str) -> ResourceData {
    let mut data = for_create(SqsQueueResource::TYPE_NAME, object(queue_plan(name)));
    let diagnostics = queues.create_data(&Context::new(), &mut data).await;
    assert!(!diagnostics.has_errors(), "{:?}", error_summaries(&diagnostics));
    data
}

#[tokio::test]
async fn queue_creation_waits_out_recent_deletion() {
    let mut server = Server::new_async().await;
    let _info = mock_activated(&mut server, "sqs").await;
    let fake = FakeMnq::new();
    fake.refuse_recently_deleted(2);
    let queues = Managed::with_meta(SqsQueueResource, meta(&server.url(), &fake));

    let data = create_queue(&queues, "orders").await;

    assert_eq!(fake.create_queue_calls(), 3);
    assert_eq!(data.id(), format!("fr-par/{}/orders", PROJECT_ID));
    assert_eq!(
        data.get_string("url"),
        Some(format!("https://sqs.mnq.test/{}/orders", PROJECT_ID))
    );
    assert_eq!(data.get_f64("message_max_age"), Some(345_600.0));
    assert_eq!(data.get_f64("visibility_timeout_seconds"), Some(30.0));
    assert_eq!(data.get_bool("fifo_queue"), Some(false));
}

#[tokio::test]
async fn queue_creation_requires_activation() {
    let mut server = Server::new_async().await;
    let _info = server
        .mock("GET", "/mnq/v1beta1/regions/fr-par/sqs-info")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(format!(
            r#"{{"project_id":"{}","region":"fr-par","status":"disabled"}}"#,
            PROJECT_ID
        ))
        .create_async()
        .await;
    let fake = FakeMnq::new();
    let queues = Managed::with_meta(SqsQueueResource, meta(&server.url(), &fake));

    let mut data = for_create(SqsQueueResource::TYPE_NAME, object(queue_plan("orders")));
    let diagnostics = queues.create_data(&Context::new(), &mut data).await;

    assert!(diagnostics.has_errors());
    assert_eq!(fake.create_queue_calls(), 0);
}

#[tokio::test]
async fn queue_update_sends_one_batch() {
    let mut server = Server::new_async().await;
    let _info = mock_activated(&mut server, "sqs").await;
    let fake = FakeMnq::new();
    let queues = Managed::with_meta(SqsQueueResource, meta(&server.url(), &fake));
    let created = create_queue(&queues, "orders").await;

    let prior = created.into_state().unwrap();
    let mut data = for_update(
        SqsQueueResource::TYPE_NAME,
        prior,
        vec![
            ("visibility_timeout_seconds", Dynamic::Number(120.0)),
            ("message_max_age", Dynamic::Number(86_400.0)),
        ],
    );
    let diagnostics = queues.update_data(&Context::new(), &mut data).await;
    assert!(!diagnostics.has_errors(), "{:?}", error_summaries(&diagnostics));

    let calls = fake.set_queue_attributes_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 2);
    assert_eq!(calls[0].get("VisibilityTimeout").map(String::as_str), Some("120"));
    assert_eq!(calls[0].get("MessageRetentionPeriod").map(String::as_str), Some("86400"));
    assert_eq!(data.get_f64("visibility_timeout_seconds"), Some(120.0));
}

#[tokio::test]
async fn unchanged_queue_update_calls_nothing() {
    let mut server = Server::new_async().await;
    let _info = mock_activated(&mut server, "sqs").await;
    let fake = FakeMnq::new();
    let queues = Managed::with_meta(SqsQueueResource, meta(&server.url(), &fake));
    let created = create_queue(&queues, "orders").await;

    let mut data = for_update(SqsQueueResource::TYPE_NAME, created.into_state().unwrap(), vec![]);
    let diagnostics = queues.update_data(&Context::new(), &mut data).await;

    assert!(!diagnostics.has_errors());
    assert!(fake.set_queue_attributes_calls().is_empty());
}

#[tokio::test]
async fn deleting_a_queue_twice_succeeds() {
    let mut server = Server::new_async().await;
    let _info = mock_activated(&mut server, "sqs").await;
    let fake = FakeMnq::new();
    let queues = Managed::with_meta(SqsQueueResource, meta(&server.url(), &fake));
    let state = create_queue(&queues, "orders").await.into_state().unwrap();

    let mut first = for_delete(SqsQueueResource::TYPE_NAME, state.clone());
    assert!(!queues.delete_data(&Context::new(), &mut first).await.has_errors());
    assert!(!fake.has_queue("orders"));

    let mut second = for_delete(SqsQueueResource::TYPE_NAME, state);
    assert!(!queues.delete_data(&Context::new(), &mut second).await.has_errors());
}

#[tokio::test]
async fn queue_deleted_out_of_band_leaves_state() {
    let mut server = Server::new_async().await;
    let _info = mock_activated(&mut server, "sqs").await;
    let fake = FakeMnq::new();
    let queues = Managed::with_meta(SqsQueueResource, meta(&server.url(), &fake));
    let state = create_queue(&queues, "orders").await.into_state().unwrap();

    fake.drop_queue("orders");
    let mut data = ResourceData::from_state(state);
    let diagnostics = queues.read_data(&Context::new(), &mut data).await;

    assert!(!diagnostics.has_errors());
    assert!(data.is_tombstoned());
    assert!(data.into_state().is_none());
}

#[tokio::test]
async fn subscriptions_resolve_topic_id_and_arn_alike() {
    let mut server = Server::new_async().await;
    let _info = mock_activated(&mut server, "sns").await;
    let fake = FakeMnq::new();
    let meta = meta(&server.url(), &fake);
    let topics = Managed::with_meta(SnsTopicResource, meta.clone());
    let subscriptions = Managed::with_meta(SnsTopicSubscriptionResource, meta);

    let mut topic = for_create(
        SnsTopicResource::TYPE_NAME,
        object(vec![
            ("name", Dynamic::from("orders")),
            ("access_key", Dynamic::from("SCWACCESSKEY")),
            ("secret_key", Dynamic::from("secret")),
        ]),
    );
    let diagnostics = topics.create_data(&Context::new(), &mut topic).await;
    assert!(!diagnostics.has_errors(), "{:?}", error_summaries(&diagnostics));
    let topic_arn = topic.get_string("arn").unwrap();
    assert_eq!(topic_arn, format!("arn:scw:sns:fr-par:project-{}:orders", PROJECT_ID));

    let subscribe = |reference: (&'static str, String)| {
        for_create(
            SnsTopicSubscriptionResource::TYPE_NAME,
            object(vec![
                (reference.0, Dynamic::from(reference.1)),
                ("protocol", Dynamic::from("http")),
                ("endpoint", Dynamic::from("http://hooks.internal/orders")),
                ("access_key", Dynamic::from("SCWACCESSKEY")),
                ("secret_key", Dynamic::from("secret")),
            ]),
        )
    };

    let mut by_id = subscribe(("topic_id", topic.id()));
    let diagnostics = subscriptions.create_data(&Context::new(), &mut by_id).await;
    assert!(!diagnostics.has_errors(), "{:?}", error_summaries(&diagnostics));

    let mut by_arn = subscribe(("topic_arn", topic_arn.clone()));
    let diagnostics = subscriptions.create_data(&Context::new(), &mut by_arn).await;
    assert!(!diagnostics.has_errors(), "{:?}", error_summaries(&diagnostics));

    assert_eq!(fake.subscriptions_of(&topic_arn), 2);
    for data in [&by_id, &by_arn] {
        assert_eq!(data.get_string("topic_arn"), Some(topic_arn.clone()));
        assert_eq!(data.get_string("topic_id"), Some(topic.id()));
        assert_eq!(data.get_string("protocol"), Some("http".to_string()));
        assert!(data.id().starts_with(&format!("fr-par/{}/orders/", PROJECT_ID)));
    }
    assert_ne!(by_id.id(), by_arn.id());
}

#[tokio::test]
async fn unsubscribing_from_a_deleted_topic_succeeds() {
    let mut server = Server::new_async().await;
    let _info = mock_activated(&mut server, "sns").await;
    let fake = FakeMnq::new();
    let meta = meta(&server.url(), &fake);
    let topics = Managed::with_meta(SnsTopicResource, meta.clone());
    let subscriptions = Managed::with_meta(SnsTopicSubscriptionResource, meta);

    let mut topic = for_create(
        SnsTopicResource::TYPE_NAME,
        object(vec![
            ("name", Dynamic::from("alerts")),
            ("access_key", Dynamic::from("SCWACCESSKEY")),
            ("secret_key", Dynamic::from("secret")),
        ]),
    );
    assert!(!topics.create_data(&Context::new(), &mut topic).await.has_errors());

    let mut subscription = for_create(
        SnsTopicSubscriptionResource::TYPE_NAME,
        object(vec![
            ("topic_id", Dynamic::from(topic.id())),
            ("protocol", Dynamic::from("https")),
            ("endpoint", Dynamic::from("https://hooks.internal/alerts")),
            ("access_key", Dynamic::from("SCWACCESSKEY")),
            ("secret_key", Dynamic::from("secret")),
        ]),
    );
    assert!(!subscriptions
        .create_data(&Context::new(), &mut subscription)
        .await
        .has_errors());

    let mut topic_delete = for_delete(SnsTopicResource::TYPE_NAME, topic.into_state().unwrap());
    assert!(!topics.delete_data(&Context::new(), &mut topic_delete).await.has_errors());

    let state = subscription.into_state().unwrap();
    let mut read = ResourceData::from_state(state.clone());
    assert!(!subscriptions.read_data(&Context::new(), &mut read).await.has_errors());
    assert!(read.is_tombstoned());

    let mut delete = for_delete(SnsTopicSubscriptionResource::TYPE_NAME, state);
    assert!(!subscriptions.delete_data(&Context::new(), &mut delete).await.has_errors());
}
