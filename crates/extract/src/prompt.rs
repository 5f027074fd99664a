use fields::ExtractField;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that extracts company information from websites. Always return data in the exact JSON format requested.";

pub fn build_prompt(website: &str, fields: &[ExtractField]) -> String {
    let fields_text = fields
        .iter()
        .map(|f| f.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Extract the following information about the company at {}:
{}

Format your response as a JSON object with the following structure:
{{
  "results": [
    {{ "field": "Field Name 1", "value": "extracted value or null if unknown" }},
    {{ "field": "Field Name 2", "value": "extracted value or null if unknown" }}
  ]
}}"#,
        website, fields_text
    )
}

/// A non-empty override wins verbatim; otherwise the template is rendered.
pub fn resolve_prompt(custom_prompt: Option<&str>, website: &str, fields: &[ExtractField]) -> String {
    match custom_prompt {
        Some(prompt) if !prompt.is_empty() => prompt.to_string(),
        _ => build_prompt(website, fields),
    }
}
