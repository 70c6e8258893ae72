// [libs/domain/models/src/tests_attack_data.rs]
/**
 * =================================================================
 * APARATO: ATTACK DATA INTEGRITY TEST (V4.2)
 * CLASIFICACIÓN: TRINITY EVIDENCE (ESTRATO L2-MODELS)
 * OBJETIVO: Certificar normalización, huellas y travesía de accesores.
 * =================================================================
 */
