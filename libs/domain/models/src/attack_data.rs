// [libs/domain/models/src/attack_data.rs]
/*!
 * =================================================================
 * APARATO: ATTACK DATA DOMAIN MODELS (V4.2 - ACCESSOR MASTER)
 * CLASIFICACIÓN: DOMAIN MODELS (ESTRATO L2)
 * RESPONSABILIDAD: TRAVESÍA TIPADA SERVICIO -> OBJETIVO -> TICK
 *
 * VISION HIPER-HOLÍSTICA 2026:
 * 1. EXPLICIT TRAVERSAL: Accesores nominales (services, targets, ticks,
 *    flag_ids) en lugar de operadores sobrecargados. El índice 0 es
 *    siempre el tick más reciente.
 * 2. CONTENT ADDRESSING: La normalización recursiva + md5 garantiza que
 *    dos payloads semánticamente idénticos con distinto orden de claves
 *    produzcan la misma huella.
 * 3. FINGERPRINTING: La huella (alias || target || flag_ids) alimenta el
 *    ledger de deduplicación del Raider.
 *
 * # Caveat (Orderable Lists):
 * Solo las listas uniformemente ordenables (todas cadenas o todos
 * números) se ordenan durante la normalización; cualquier otra lista
 * conserva su orden original. Un upstream que reordene listas de
 * objetos entre ticks producirá huellas distintas.
 * =================================================================
 */

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttackDataError {
    /// El servicio solicitado no aparece en el payload vigente.
    #[error("[L2_ATTACK_DATA_FAULT]: SERVICE_NOT_FOUND -> {0}")]
    ServiceNotFound(String),

    /// El objetivo solicitado no aparece bajo el servicio.
    #[error("[L2_ATTACK_DATA_FAULT]: TARGET_NOT_FOUND -> {0}")]
    TargetNotFound(String),

    /// El payload no respeta la forma servicio -> objetivo -> ticks.
    #[error("[L2_ATTACK_DATA_FAULT]: SCHEMA_DRIFT -> {0}")]
    SchemaDrift(String),
}

/// Ordena recursivamente claves de objetos y elementos de listas
/// uniformemente ordenables. Deja intacto cualquier otro orden.
pub fn normalize_json(data: &Value) -> Value {
    match data {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            let mut normalized = serde_json::Map::new();
            for (key, value) in entries {
                normalized.insert(key.clone(), normalize_json(value));
            }
            Value::Object(normalized)
        }
        Value::Array(items) => {
            let mut normalized: Vec<Value> = items.iter().map(normalize_json).collect();

            let all_strings = normalized.iter().all(|v| v.is_string());
            let all_numbers = normalized.iter().all(|v| v.is_number());

            if all_strings {
                normalized.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
            } else if all_numbers {
                normalized.sort_by(|a, b| {
                    let left = a.as_f64().unwrap_or(f64::NEG_INFINITY);
                    let right = b.as_f64().unwrap_or(f64::NEG_INFINITY);
                    left.partial_cmp(&right).unwrap_or(std::cmp::Ordering::Equal)
                });
            }

            Value::Array(normalized)
        }
        other => other.clone(),
    }
}

/// Huella md5 del payload normalizado. Es el ancla de idempotencia del
/// Attack Data Refresher: huella igual implica payload ya conocido.
pub fn content_hash(data: &Value) -> String {
    let normalized = normalize_json(data);
    let serialized = normalized.to_string();
    format!("{:x}", md5::compute(serialized.as_bytes()))
}

/// Huella md5 de (alias || target || flag_ids) para el ledger de
/// deduplicación del Raider. Presencia en el ledger significa "este
/// exploit ya corrió contra este objetivo con estos flag ids".
pub fn flag_ids_fingerprint(alias: &str, target: &str, flag_ids: &Value) -> String {
    let material = format!("{}{}{}", alias, target, flag_ids);
    format!("{:x}", md5::compute(material.as_bytes()))
}

/// Vista de los flag ids de un único servicio: objetivo -> lista de
/// registros por tick (el más reciente primero).
#[derive(Debug, Clone)]
pub struct ServiceAttackData {
    targets: serde_json::Map<String, Value>,
}

impl ServiceAttackData {
    pub fn from_value(value: &Value) -> Result<Self, AttackDataError> {
        let targets = value
            .as_object()
            .ok_or_else(|| AttackDataError::SchemaDrift("service payload is not an object".into()))?;
        Ok(Self {
            targets: targets.clone(),
        })
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets.keys().cloned().collect()
    }

    /// Registros por tick para un objetivo, el más reciente primero.
    pub fn ticks(&self, target: &str) -> Result<Vec<Value>, AttackDataError> {
        let window = self
            .targets
            .get(target)
            .ok_or_else(|| AttackDataError::TargetNotFound(target.to_string()))?;

        window
            .as_array()
            .cloned()
            .ok_or_else(|| AttackDataError::SchemaDrift(format!("tick window of '{}' is not an array", target)))
    }

    /// Flag ids de un tick concreto (0 = el más reciente).
    pub fn flag_ids(&self, target: &str, tick_index: usize) -> Result<Value, AttackDataError> {
        let window = self.ticks(target)?;
        window.get(tick_index).cloned().ok_or_else(|| {
            AttackDataError::SchemaDrift(format!("tick index {} out of range for '{}'", tick_index, target))
        })
    }

    pub fn serialize(&self) -> Value {
        Value::Object(self.targets.clone())
    }
}

/// Payload completo de attack data: servicio -> objetivo -> ticks.
/// Es la forma que produce el procesador del operador y la que viaja
/// por `/attack-data/current` y `/attack-data/subscribe`.
#[derive(Debug, Clone)]
pub struct AttackData {
    root: serde_json::Map<String, Value>,
}

impl AttackData {
    pub fn from_value(value: Value) -> Result<Self, AttackDataError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(AttackDataError::SchemaDrift(format!(
                "root payload is not an object (got {})",
                match other {
                    Value::Array(_) => "array",
                    Value::Null => "null",
                    _ => "scalar",
                }
            ))),
        }
    }

    pub fn services(&self) -> Vec<String> {
        self.root.keys().cloned().collect()
    }

    pub fn service(&self, service: &str) -> Result<ServiceAttackData, AttackDataError> {
        let payload = self
            .root
            .get(service)
            .ok_or_else(|| AttackDataError::ServiceNotFound(service.to_string()))?;
        ServiceAttackData::from_value(payload)
    }

    pub fn targets(&self, service: &str) -> Result<Vec<String>, AttackDataError> {
        Ok(self.service(service)?.targets())
    }

    pub fn ticks(&self, service: &str, target: &str) -> Result<Vec<Value>, AttackDataError> {
        self.service(service)?.ticks(target)
    }

    pub fn flag_ids(&self, service: &str, target: &str, tick_index: usize) -> Result<Value, AttackDataError> {
        self.service(service)?.flag_ids(target, tick_index)
    }

    pub fn serialize(&self) -> Value {
        Value::Object(self.root.clone())
    }
}
