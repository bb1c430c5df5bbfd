//! Node bindings. JSON bindings only carry values; resolvers stay on the Rust side.

use napi_derive::napi;

use crate::lang::Language;
use crate::transform::Transformer;

#[napi(object)]
pub struct NativeTransformResult {
    pub code: String,
    pub changed: bool,
    pub diagnostics: serde_json::Value,
}

#[napi]
pub fn transform_native(
    code: String,
    id: String,
    bindings_json: String,
    options_json: Option<String>,
) -> napi::Result<Option<NativeTransformResult>> {
    let transformer = Transformer::from_json(&bindings_json, options_json.as_deref())
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;

    let Some(output) = transformer.transform(&id, &code) else {
        return Ok(None);
    };
    let diagnostics = serde_json::to_value(&output.diagnostics)
        .map_err(|e| napi::Error::from_reason(e.to_string()))?;

    Ok(Some(NativeTransformResult {
        code: output.code,
        changed: output.changed,
        diagnostics,
    }))
}

#[napi]
pub fn detect_language_native(id: String) -> Option<String> {
    Language::detect(&id).map(|lang| lang.as_str().to_string())
}
