// [tests/mirror/apps/orchestrator/services/event_bus.test.rs]
/**
 * =================================================================
 * APARATO: EVENT BUS INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L4-EVENTS)
 * OBJETIVO: Certificar la difusión multi-receptor y el silencio
 *           nominal sin suscriptores.
 * =================================================================
 */

use avala_domain_models::{FlagCounterDelta, QueueRatesSample, RealTimeEvent};
use avala_orchestrator::services::EventBus;

#[tokio::test]
async fn certify_broadcast_reaches_every_subscriber() {
    let bus = EventBus::new();

    let mut first_receiver = bus.subscribe();
    let mut second_receiver = bus.subscribe();

    bus.emit_flag_counters(FlagCounterDelta {
        queued: 3,
        discarded: 1,
        accepted: 0,
        rejected: 0,
    });

    for receiver in [&mut first_receiver, &mut second_receiver] {
        match receiver.recv().await.expect("event void") {
            RealTimeEvent::FlagCounters(delta) => {
                assert_eq!(delta.queued, 3);
                assert_eq!(delta.discarded, 1);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}

#[tokio::test]
async fn certify_emission_without_subscribers_is_silent() {
    let bus = EventBus::new();

    // Sin receptores: el despacho se descarta sin pánico ni bloqueo.
    bus.emit_queue_rates(QueueRatesSample {
        retrieved_per_second: 10,
        submitted_per_second: 4,
        timestamp: "10:00:00".to_string(),
    });
}

#[tokio::test]
async fn certify_late_subscribers_miss_prior_events() {
    let bus = EventBus::new();

    bus.emit_flag_counters(FlagCounterDelta::default());

    // Best effort: el bus no persiste historia para suscriptores tardíos.
    let mut late_receiver = bus.subscribe();
    assert!(matches!(
        late_receiver.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}
