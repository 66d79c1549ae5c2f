//! JSON rendering of the report model (field order follows struct layout).

use crate::{ReportError, ReportModel};

pub fn render_json(model: &ReportModel) -> Result<String, ReportError> {
    serde_json::to_string_pretty(model).map_err(|e| ReportError::Serialize(e.to_string()))
}
