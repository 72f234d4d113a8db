pub const CV_PARSER_ROLE: &str = "You extract structured candidate data from CV text.";

/// Placeholder: {cv_text}
pub const CV_PARSE_PROMPT_TEMPLATE: &str = r#"Extract the candidate's details from the CV below.

Return a JSON object with exactly these keys:
{
  "full_name": string or null,
  "email": string or null,
  "phone": string or null,
  "current_title": string or null,
  "years_of_experience": number or null,
  "skills": [string],
  "summary": string or null
}

Rules:
- Only use information present in the CV. Use null when a value is not stated.
- "years_of_experience" is total professional experience; estimate from dates if needed.
- "skills" lists concrete technical and professional skills, most relevant first.
- "summary" is two sentences at most.

CV:
{cv_text}"#;
