// Job-post conversation LLM prompt templates.
// Placeholders are replaced with `str::replace` before sending.

/// System prompt for slot extraction. Enforces JSON-only output.
pub const EXTRACT_SYSTEM: &str = "\
You are a recruiting assistant that turns a hiring manager's chat message into job post fields. \
You MUST respond with valid JSON only, with no markdown fences, no explanations. \
Only include fields the message actually states or clearly implies. \
NEVER include a department field.";

/// Extraction prompt. Replace `{draft}`, `{focus}` and `{utterance}`.
pub const EXTRACT_PROMPT_TEMPLATE: &str = r#"We are building a job post through a conversation.

CURRENT DRAFT (JSON):
{draft}

The field we most need right now is: {focus}

LATEST MESSAGE FROM THE HIRING MANAGER:
{utterance}

Return a JSON object containing ONLY the fields this message provides, using these keys:
{
  "title": "string",
  "description": "string",
  "requirements": "string",
  "responsibilities": "string",
  "benefits": "string",
  "skills": ["string"],
  "experienceLevel": "ENTRY_LEVEL" | "MID_LEVEL" | "SENIOR" | "LEAD" | "EXECUTIVE",
  "location": "string",
  "workType": "REMOTE" | "ON_SITE" | "HYBRID",
  "salaryMin": number,
  "salaryMax": number,
  "currency": "3-letter ISO code",
  "enableAiInterview": boolean,
  "isFeatured": boolean
}

RULES:
1. Omit every key the message does not provide. Return {} if it provides nothing.
2. Salaries are plain numbers (no currency symbols, no "k" suffix).
3. Do not invent values. Do not copy values from the current draft.
4. Return ONLY the JSON object."#;

/// System prompt for description/responsibilities rewriting.
pub const ENHANCE_SYSTEM: &str = "\
You are an expert recruitment copywriter. \
You improve job post copy while keeping every fact the hiring manager gave. \
You MUST respond with valid JSON only, with no markdown fences, no explanations.";

/// Enhancement prompt. Replace `{draft}` and `{request}`.
pub const ENHANCE_PROMPT_TEMPLATE: &str = r#"Rewrite the description and responsibilities of this job post so they read professionally and attract strong candidates.

JOB POST DRAFT (JSON):
{draft}

HIRING MANAGER'S REQUEST:
{request}

Return exactly this structure:
{
  "rewritten_description": "string",
  "rewritten_responsibilities": "string"
}

RULES:
1. Keep the title, location, salary and experience level consistent with the draft.
2. If the draft has no description, write one from the other fields.
3. Responsibilities are a short bulleted list inside the string, one per line, each starting with "- ".
4. Return ONLY the JSON object."#;
