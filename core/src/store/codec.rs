use crate::error::StoreError;
use crate::task::TaskStatus;

/// Serialize a record, refusing anything the backend could not hold.
pub fn encode_record(status: &TaskStatus, limit: usize) -> Result<String, StoreError> {
    let encoded = serde_json::to_string(status)?;
    if encoded.len() > limit {
        return Err(StoreError::TooLarge {
            size: encoded.len(),
            limit,
        });
    }
    Ok(encoded)
}

pub fn decode_record(raw: &str) -> Result<TaskStatus, StoreError> {
    Ok(serde_json::from_str(raw)?)
}
