//! Subscription hub behavior under concurrent publish/subscribe traffic
//! (spec §4.6) beyond what the in-module unit tests cover.

use std::sync::Arc;

use gossip_node::{Codec, Envelope, JsonCodec, SubscriptionHub};
use tokio_stream::StreamExt;

fn item(n: u32) -> Arc<Envelope<u32>> {
    let json = serde_json::json!({
        "id": uuid::Uuid::new_v4().to_string(),
        "timestamp": "2026-01-01T00:00:00Z",
        "notifiedNodes": [],
        "payload": n,
    });
    let envelope: Envelope<u32> = JsonCodec.decode(json.to_string().as_bytes()).unwrap();
    Arc::new(envelope)
}

#[tokio::test(flavor = "multi_thread")]
async fn many_subscribers_each_see_every_published_item_in_order() {
    let hub: SubscriptionHub<u32> = SubscriptionHub::new();
    let mut readers: Vec<_> = (0..8).map(|_| hub.subscribe()).collect();

    let published: Vec<_> = (0..20).map(item).collect();
    for msg in &published {
        hub.publish(Arc::clone(msg));
    }

    for reader in &mut readers {
        for expected in &published {
            let got = reader.next().await.unwrap();
            assert_eq!(got.payload, expected.payload);
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_publish_from_multiple_tasks_delivers_all_items() {
    let hub = Arc::new(SubscriptionHub::<u32>::new());
    let mut reader = hub.subscribe();

    let mut tasks = Vec::new();
    for batch in 0..4u32 {
        let hub = Arc::clone(&hub);
        tasks.push(tokio::spawn(async move {
            for n in 0..10u32 {
                hub.publish(item(batch * 100 + n));
            }
        }));
    }
    for t in tasks {
        t.await.unwrap();
    }

    let mut seen = Vec::new();
    for _ in 0..40 {
        seen.push(reader.next().await.unwrap().payload);
    }
    seen.sort_unstable();
    let mut expected: Vec<u32> = (0..4u32).flat_map(|b| (0..10u32).map(move |n| b * 100 + n)).collect();
    expected.sort_unstable();
    assert_eq!(seen, expected);
}

#[tokio::test(flavor = "multi_thread")]
async fn late_subscriber_only_sees_items_published_after_it_joins() {
    let hub: SubscriptionHub<u32> = SubscriptionHub::new();
    hub.publish(item(1));

    let mut late = hub.subscribe();
    hub.publish(item(2));

    let got = late.next().await.unwrap();
    assert_eq!(got.payload, 2, "late subscriber must not see items published before it subscribed");
}
