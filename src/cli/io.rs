use std::fs;

use serde_json::Value;

use crate::config::PayloadArgs;
use crate::infra::error::InfraError;

use super::CliError;

/// The JSON object to send, from `--data-file` if given, else `--data`.
pub fn read_payload(payload: PayloadArgs) -> Result<Value, CliError> {
    let text = if let Some(path) = payload.data_file {
        fs::read_to_string(&path).map_err(|source| InfraError::io(&path, source))?
    } else if let Some(data) = payload.data {
        data
    } else {
        return Err(CliError::InvalidInput(
            "a JSON document is required (use --data or --data-file)".into(),
        ));
    };

    let value: Value = serde_json::from_str(&text)
        .map_err(|err| CliError::InvalidInput(format!("payload is not valid JSON: {err}")))?;
    if !value.is_object() {
        return Err(CliError::InvalidInput("payload must be a JSON object".into()));
    }
    Ok(value)
}
