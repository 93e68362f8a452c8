use booker_core::Summary;

/// `summary.json`: the summary in k6's machine readable layout.
pub fn render_json(summary: &Summary) -> Result<String, serde_json::Error> {
    serde_json::to_string(summary)
}
