// [libs/infra/db/src/schema.rs]
/**
 * =================================================================
 * APARATO: TACTICAL LEDGER SCHEMA (V4.2 - FLAG STRATA)
 * CLASIFICACIÓN: INFRASTRUCTURE LAYER (ESTRATO L3)
 * RESPONSABILIDAD: GOBERNANZA ESTRUCTURAL E IDEMPOTENCIA TOTAL
 *
 * VISION HIPER-HOLÍSTICA:
 * 1. FLAG STRATA: Tabla 'flags' con unicidad dura sobre 'value'; es el
 *    ancla de deduplicación de todo el conducto.
 * 2. STATE STRATA: Tabla 'states' clave-valor para singletons entre
 *    procesos (huella y payload de attack data).
 * 3. IDEMPOTENCIA: 'IF NOT EXISTS' en todos los estratos para permitir
 *    migraciones en caliente.
 * 4. PERFORMANCE: Índices de aceleración para los agregados del Dashboard.
 * =================================================================
 */

use anyhow::{Context, Result};
use libsql::Connection;
use tracing::{debug, instrument};

/**
 * ESTRATO 1: SOLIDIFICACIÓN (Génesis de Tablas)
 */
const TACTICAL_TABLES: &[(&str, &str)] = &[
    ("TABLE_FLAGS", r#"
        CREATE TABLE IF NOT EXISTS flags (
            id TEXT PRIMARY KEY,
            value TEXT NOT NULL UNIQUE,
            exploit TEXT NOT NULL,
            player TEXT NOT NULL,
            tick INTEGER NOT NULL,
            target TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued'
                CHECK (status IN ('queued', 'accepted', 'rejected')),
            response TEXT
        );
    "#),
    ("TABLE_STATES", r#"
        CREATE TABLE IF NOT EXISTS states (
            key TEXT PRIMARY KEY,
            value TEXT
        );
    "#),
];

/**
 * ESTRATO 2: ENDURECIMIENTO (Índices de Aceleración)
 * Optimiza los agregados por tick y por estado del Dashboard.
 */
const ACCELERATION_INDEXES: &[(&str, &str)] = &[
    ("IDX_FLAGS_TICK", "CREATE INDEX IF NOT EXISTS idx_flags_tick ON flags(tick);"),
    ("IDX_FLAGS_STATUS", "CREATE INDEX IF NOT EXISTS idx_flags_status ON flags(status);"),
];

/// Aplica el esquema completo del Ledger Táctico de forma idempotente.
#[instrument(skip(connection))]
pub async fn apply_ledger_schema(connection: &Connection) -> Result<()> {
    for (strata_label, table_statement) in TACTICAL_TABLES {
        connection
            .execute(table_statement, ())
            .await
            .with_context(|| format!("SCHEMA_GENESIS_FAULT: {}", strata_label))?;
        debug!("🧱 [SCHEMA]: Strata {} solidified.", strata_label);
    }

    for (index_label, index_statement) in ACCELERATION_INDEXES {
        connection
            .execute(index_statement, ())
            .await
            .with_context(|| format!("SCHEMA_INDEX_FAULT: {}", index_label))?;
    }

    Ok(())
}
