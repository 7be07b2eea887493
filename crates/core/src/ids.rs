/// Extracts the trace id from a trace reference.
///
/// Cloud Logging stores trace references as `projects/<project>/traces/<trace-id>`;
/// the id is the final path segment. References without a `/` are returned whole.
/// Returns `None` when the reference or its final segment is empty.
pub fn trace_id_from_reference(reference: &str) -> Option<&str> {
    let id = reference.rsplit('/').next().unwrap_or(reference);
    if id.is_empty() { None } else { Some(id) }
}
