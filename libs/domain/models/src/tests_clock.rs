// [libs/domain/models/src/tests_clock.rs]
/**
 * =================================================================
 * APARATO: TICK CLOCK INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * OBJETIVO: Certificar las fronteras exactas del mapeo tiempo -> tick.
 * =================================================================
 */
