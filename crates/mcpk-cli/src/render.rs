//! Plain-text rendering of registered functions.

use mcpk_types::{FunctionHandle, ParameterSpec};

/// `name: type` for a parameter, with `?` after the name when optional.
pub fn parameter(spec: &ParameterSpec) -> String {
    let marker = if spec.required { "" } else { "?" };
    format!("{}{marker}: {}", spec.name, spec.resolved_type)
}

/// One function as `name(a: integer, b?: string?) -> string`, followed by its
/// description on the next line when there is one.
pub fn function(handle: &FunctionHandle) -> String {
    let f = handle.function();
    let params: Vec<String> = f.parameters().iter().map(parameter).collect();
    let mut out = format!("{}({}) -> {}", f.name(), params.join(", "), f.return_type());
    if !f.description().is_empty() {
        out.push_str("\n      ");
        out.push_str(f.description());
    }
    out
}
