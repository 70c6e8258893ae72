// [tests/mirror/libs/infra/mq/durable_queue.test.rs]
/**
 * =================================================================
 * APARATO: DURABLE QUEUE INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L3-MQ)
 * OBJETIVO: Certificar claim atómico, TTL, requeue y multi-ack.
 * =================================================================
 */

use avala_infra_mq::{BrokerConnection, DurableQueue};

async fn forge_queue(routing_key: &str) -> (BrokerConnection, DurableQueue) {
    let broker = BrokerConnection::connect(":memory:")
        .await
        .expect("broker ignition collapsed");
    let queue = DurableQueue::declare(broker.open_channel().expect("channel void"), routing_key)
        .await
        .expect("declare collapsed");
    (broker, queue)
}

#[tokio::test]
async fn certify_fifo_claim_and_ack() {
    let (_broker, queue) = forge_queue("fifo_strata").await;

    queue.put("FLG{AAAAAAAA}", None).await.unwrap();
    queue.put("FLG{BBBBBBBB}", None).await.unwrap();

    let first = queue.get().await.unwrap().expect("first delivery void");
    assert_eq!(first.body, "FLG{AAAAAAAA}");

    let second = queue.get().await.unwrap().expect("second delivery void");
    assert_eq!(second.body, "FLG{BBBBBBBB}");
    assert!(second.delivery_tag > first.delivery_tag);

    // Cola agotada: no hay terceros mensajes listos.
    assert!(queue.get().await.unwrap().is_none());

    queue.ack(first.delivery_tag).await.unwrap();
    queue.ack(second.delivery_tag).await.unwrap();
    assert_eq!(queue.size().await.unwrap(), 0);
}

#[tokio::test]
async fn certify_requeue_preserves_message() {
    let (_broker, queue) = forge_queue("requeue_strata").await;

    queue.put("FLG{CCCCCCCC}", None).await.unwrap();

    let delivery = queue.get().await.unwrap().expect("delivery void");
    queue.reject(delivery.delivery_tag, true).await.unwrap();

    // El mensaje regresa a 'ready' y se re-entrega con el mismo tag.
    let redelivery = queue.get().await.unwrap().expect("redelivery void");
    assert_eq!(redelivery.body, "FLG{CCCCCCCC}");
    assert_eq!(redelivery.delivery_tag, delivery.delivery_tag);

    // Reject sin requeue: descarte definitivo.
    queue.reject(redelivery.delivery_tag, false).await.unwrap();
    assert!(queue.get().await.unwrap().is_none());
}

#[tokio::test]
async fn certify_ttl_expiry_purges_before_claim() {
    let (_broker, queue) = forge_queue("ttl_strata").await;

    queue.put("FLG{EXPIRED0}", Some(10)).await.unwrap();
    queue.put("FLG{ALIVE000}", Some(600_000)).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(40)).await;

    // La bandera caduca jamás se entrega; la viva sí.
    let delivery = queue.get().await.unwrap().expect("live delivery void");
    assert_eq!(delivery.body, "FLG{ALIVE000}");
    assert!(queue.get().await.unwrap().is_none());
}

#[tokio::test]
async fn certify_multi_ack_confirms_all_claimed() {
    let (_broker, queue) = forge_queue("multiack_strata").await;

    for index in 0..5 {
        queue.put(&format!("FLG{{M{}}}", index), None).await.unwrap();
    }

    let mut max_delivery_tag = 0;
    while let Some(delivery) = queue.get().await.unwrap() {
        max_delivery_tag = max_delivery_tag.max(delivery.delivery_tag);
    }

    queue.ack_multiple(max_delivery_tag).await.unwrap();

    // Nada queda vivo ni reclamado tras el multi-ack.
    assert_eq!(queue.size().await.unwrap(), 0);
    assert_eq!(queue.recover_orphans().await.unwrap(), 0);
}

#[tokio::test]
async fn certify_orphan_recovery_redelivers_unacked() {
    let (_broker, queue) = forge_queue("orphan_strata").await;

    queue.put("FLG{ORPHAN00}", None).await.unwrap();
    let _claimed = queue.get().await.unwrap().expect("delivery void");

    // Simula la defunción del consumidor: el kernel recupera huérfanos.
    let recovered = queue.recover_orphans().await.unwrap();
    assert_eq!(recovered, 1);

    let redelivery = queue.get().await.unwrap().expect("redelivery void");
    assert_eq!(redelivery.body, "FLG{ORPHAN00}");
}
