use edgeflags_core::FlagValue;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory flag-name → value mapping, atomically swapped on PUT and
/// upserted per-key on PATCH. Grounded on `loom_flags::cache::FlagCache`,
/// simplified to this SDK's single flag-map shape (no kill switches —
/// those belong to the server-side evaluation model this client never
/// implements).
#[derive(Default)]
pub struct FlagStore {
    flags: RwLock<HashMap<String, FlagValue>>,
}

impl FlagStore {
    pub fn new() -> Self {
        Self {
            flags: RwLock::new(HashMap::new()),
        }
    }

    /// Whole-map replace. The previous map is dropped once the write lock
    /// is released; no reader observes a partially-replaced map.
    pub async fn replace(&self, new_map: HashMap<String, FlagValue>) {
        let mut guard = self.flags.write().await;
        *guard = new_map;
    }

    /// Per-key upsert. Not atomic as a whole: a concurrent reader may
    /// observe some but not all of the delta's keys mid-patch, which is
    /// acceptable because individual flag evaluations are independent.
    pub async fn patch(&self, delta: HashMap<String, FlagValue>) {
        let mut guard = self.flags.write().await;
        for (k, v) in delta {
            guard.insert(k, v);
        }
    }

    pub async fn lookup(&self, key: &str) -> Option<FlagValue> {
        let guard = self.flags.read().await;
        guard.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.flags.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.flags.read().await.is_empty()
    }
}

/// Parses a poll/PUT response body: a JSON object whose top-level keys are
/// flag names and whose values are descriptors `{value, version,
/// variation, trackEvents, ...}`. Only `value` is retained.
pub fn parse_descriptor_map(body: &[u8]) -> edgeflags_core::Result<HashMap<String, FlagValue>> {
    let parsed: Value = serde_json::from_slice(body)
        .map_err(|e| edgeflags_core::FlagsError::MalformedPayload(e.to_string()))?;
    let obj = parsed
        .as_object()
        .ok_or_else(|| edgeflags_core::FlagsError::MalformedPayload("expected a JSON object".to_string()))?;

    let mut out = HashMap::with_capacity(obj.len());
    for (name, descriptor) in obj {
        out.insert(name.clone(), descriptor_to_flag_value(descriptor)?);
    }
    Ok(out)
}

/// PATCH payload: a JSON object containing a single named entry whose
/// value is a descriptor; identifies the flag name by its key position.
pub fn parse_patch(body: &[u8]) -> edgeflags_core::Result<HashMap<String, FlagValue>> {
    parse_descriptor_map(body)
}

fn descriptor_to_flag_value(descriptor: &Value) -> edgeflags_core::Result<FlagValue> {
    let value = descriptor.get("value").ok_or_else(|| {
        edgeflags_core::FlagsError::MalformedPayload("descriptor missing `value` field".to_string())
    })?;
    json_to_flag_value(value)
}

fn json_to_flag_value(value: &Value) -> edgeflags_core::Result<FlagValue> {
    Ok(match value {
        Value::Null => FlagValue::Absent,
        Value::Bool(b) => FlagValue::Bool(*b),
        Value::Number(n) => FlagValue::Number(n.as_f64().ok_or_else(|| {
            edgeflags_core::FlagsError::MalformedPayload("non-finite number".to_string())
        })?),
        Value::String(s) => FlagValue::String(s.clone()),
        Value::Array(_) => {
            return Err(edgeflags_core::FlagsError::MalformedPayload(
                "array flag values are not supported".to_string(),
            ))
        }
        Value::Object(map) => {
            let mut out = HashMap::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), json_to_flag_value(v)?);
            }
            FlagValue::Map(out)
        }
    })
}
