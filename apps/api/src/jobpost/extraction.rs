//! Deterministic slot extraction.
//!
//! One ordered table of `(name, slot, extractor)` matchers, consumed by a single
//! dispatch loop. Earlier entries have priority: once a slot is assigned in a turn,
//! later matchers for the same slot are skipped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::jobpost::draft::{Assignment, JobPostDraft, Slot};
use crate::jobpost::normalize::coerce_salary;

// ────────────────────────────────────────────────────────────────────────────
// Vocabulary
// ────────────────────────────────────────────────────────────────────────────

/// Section labels a user may type, mapped to the slot they fill.
const SECTION_LABELS: &[(&str, Slot)] = &[
    ("job title", Slot::Title),
    ("title", Slot::Title),
    ("position", Slot::Title),
    ("role", Slot::Title),
    ("description", Slot::Description),
    ("about the role", Slot::Description),
    ("requirements", Slot::Requirements),
    ("qualifications", Slot::Requirements),
    ("responsibilities", Slot::Responsibilities),
    ("duties", Slot::Responsibilities),
    ("benefits", Slot::Benefits),
    ("perks", Slot::Benefits),
    ("skills", Slot::Skills),
    ("tech stack", Slot::Skills),
    ("location", Slot::Location),
    ("salary", Slot::Salary),
];

/// Place names recognized without a preposition. Longer names first so the
/// alternation prefers "Abu Dhabi" over a partial match.
const KNOWN_PLACES: &[&str] = &[
    "United Arab Emirates",
    "Saudi Arabia",
    "Kuwait City",
    "Abu Dhabi",
    "New York",
    "Amman",
    "Irbid",
    "Zarqa",
    "Aqaba",
    "Jordan",
    "Dubai",
    "Sharjah",
    "UAE",
    "Riyadh",
    "Jeddah",
    "Dammam",
    "KSA",
    "Doha",
    "Qatar",
    "Kuwait",
    "Manama",
    "Bahrain",
    "Muscat",
    "Oman",
    "Cairo",
    "Alexandria",
    "Egypt",
    "Beirut",
    "Lebanon",
    "Baghdad",
    "Iraq",
    "Ramallah",
    "Palestine",
    "London",
    "Berlin",
    "Paris",
];

/// Technology names picked up from free text, in their canonical casing.
const KNOWN_TECHNOLOGIES: &[&str] = &[
    ".NET",
    "C#",
    "C++",
    "Python",
    "Java",
    "JavaScript",
    "TypeScript",
    "React",
    "Angular",
    "Vue",
    "Node.js",
    "NestJS",
    "GraphQL",
    "SQL",
    "PostgreSQL",
    "MySQL",
    "MongoDB",
    "Redis",
    "AWS",
    "Azure",
    "GCP",
    "Docker",
    "Kubernetes",
    "Rust",
    "Golang",
    "PHP",
    "Laravel",
    "Django",
    "Flutter",
    "Swift",
    "Kotlin",
    "Figma",
];

const ROLE_NOUNS: &str = "developer|engineer|manager|designer|analyst|architect|specialist|consultant|\
accountant|scientist|administrator|officer|coordinator|assistant|representative|tester|intern|\
director|writer|marketer|recruiter|technician|nurse|teacher|agent|executive|programmer|lead";

// ────────────────────────────────────────────────────────────────────────────
// Patterns
// ────────────────────────────────────────────────────────────────────────────

static SECTION_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    let labels: Vec<String> = SECTION_LABELS
        .iter()
        .map(|(label, _)| regex::escape(label).replace(' ', r"\s+"))
        .collect();
    Regex::new(&format!(r"(?i)\b({})\s*:", labels.join("|"))).expect("section label pattern")
});

static SALARY_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?P<min>\d[\d,]*(?:\.\d+)?)\s*(?P<mink>k)?\s*(?P<sep>-|–|to|and)\s*(?P<max>\d[\d,]*(?:\.\d+)?)\s*(?P<maxk>k)?\b",
    )
    .expect("salary range pattern")
});

static SALARY_BOUND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?P<kind>up\s+to|maximum|max|at\s+least|minimum|min|from|starting\s+at|salary|pay|compensation|budget)\s*(?:is|of|:|=|around|about)?\s*(?P<value>\d[\d,]*(?:\.\d+)?)\s*(?P<k>k)?\b",
    )
    .expect("salary bound pattern")
});

static SALARY_CONTEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(salary|pay|compensation|budget|per\s+month|monthly|annual|yearly)\b")
        .expect("salary context pattern")
});

static YEARS_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*\+?\s*(years?|yrs?|months?)\b").expect("years suffix pattern"));

static CURRENCY_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(jod|usd|eur|gbp|aed|sar|qar|kwd|bhd|omr|egp)\b").expect("currency code pattern")
});

const CURRENCY_WORDS: &[(&str, &str)] = &[
    (r"(?i)\bdinars?\b", "JOD"),
    (r"(?i)\bdirhams?\b", "AED"),
    (r"(?i)\briyals?\b", "SAR"),
    (r"(?i)\beuros?\b|€", "EUR"),
    (r"(?i)\bpounds?\b|£", "GBP"),
    (r"(?i)\bdollars?\b|\$", "USD"),
];

static CURRENCY_WORD_RES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    CURRENCY_WORDS
        .iter()
        .map(|(pattern, code)| (Regex::new(pattern).expect("currency word pattern"), *code))
        .collect()
});

static WORK_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(fully\s+remote|remote|hybrid|on[- ]?site|in[- ]office|work\s+from\s+home|wfh)\b")
        .expect("work type pattern")
});

/// Level words that rarely mean anything else.
static EXPERIENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(entry[- ]level|junior|jr|graduate|internship|intern|mid[- ]level|mid|intermediate|senior|sr|team\s+lead|tech\s+lead|principal)\b",
    )
    .expect("experience pattern")
});

/// Level words that double as verbs or org-chart nouns ("lead campaigns",
/// "report to the director"). Only read outside content sections.
static LEADERSHIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(lead|executive|director|head\s+of)\b").expect("leadership pattern")
});

static LOCATION_PHRASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:based\s+in|located\s+in|located\s+at|location\s+is|offices?\s+in|in\s+the\s+city\s+of)\s+(?P<place>[A-Za-z][A-Za-z .'-]*?)\s*(?:[,.;\n]|\s+(?:with|and|for|paying|salary|remote|hybrid)\b|$)",
    )
    .expect("location phrase pattern")
});

static PLACE_RE: Lazy<Regex> = Lazy::new(|| {
    let names: Vec<String> = KNOWN_PLACES
        .iter()
        .map(|p| regex::escape(p).replace(' ', r"\s+"))
        .collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", names.join("|"))).expect("place pattern")
});

static ROLE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)\b(?:{ROLE_NOUNS})s?$")).expect("role suffix pattern"));

/// Segments opening like a sentence ("they report to...", "must manage...")
/// are not titles.
static SENTENCE_OPENER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:i|we|you|he|she|they|our|your|their|his|her|its|this|that|these|those|who|which|there|is|are|was|will|would|should|must|can|could|may|reports?|works?|manages?|helps?|supports?|handles?|assists?)\b",
    )
    .expect("sentence opener pattern")
});

static HIRING_PHRASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:hiring|looking\s+for|recruiting|seeking|we\s+need)\s+(?:an?\s+|the\s+)?(?P<title>[^,.;\n]+?)(?:\s+(?:in|at|with|for|who|to)\b|[,.;\n]|$)",
    )
    .expect("hiring phrase pattern")
});

static SENIORITY_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:senior|sr\.?|junior|jr\.?|mid[- ]level|mid|entry[- ]level|intermediate)\s+)+")
        .expect("seniority prefix pattern")
});

static SKILL_PHRASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:experience\s+with|proficient\s+in|knowledge\s+of|must\s+know|skills?\s+(?:include|are|in))\s+(?P<list>[^.;\n]+)",
    )
    .expect("skill phrase pattern")
});

static SKILL_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:,|/|;|\band\b|&)\s*").expect("skill split pattern"));

static TECH_RES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    KNOWN_TECHNOLOGIES
        .iter()
        .map(|tech| {
            let pattern = format!(r"(?i)(?:^|[^\w.#+]){}(?:$|[^\w#+])", regex::escape(tech));
            (Regex::new(&pattern).expect("technology pattern"), *tech)
        })
        .collect()
});

static AI_INTERVIEW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?P<neg>no|without|disable|skip)?\s*(?:the\s+)?ai[- ]interviews?\b")
        .expect("ai interview pattern")
});

static FEATURED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?P<neg>not\s+|don'?t\s+|do\s+not\s+)?(?:make\s+it\s+|mark\s+(?:it\s+)?(?:as\s+)?)?featured\b")
        .expect("featured pattern")
});

// ────────────────────────────────────────────────────────────────────────────
// Utterance view
// ────────────────────────────────────────────────────────────────────────────

/// Pre-split view of one utterance shared by every matcher.
pub struct Utterance<'a> {
    pub text: &'a str,
    /// `label: value` sections, in order of appearance.
    sections: Vec<(Slot, String)>,
    /// Comma/semicolon/newline segments of the text before the first label.
    segments: Vec<String>,
    /// The draft already has a title, so only explicit ones may replace it.
    title_known: bool,
}

impl<'a> Utterance<'a> {
    pub fn new(text: &'a str, draft: &JobPostDraft) -> Self {
        let labels: Vec<_> = SECTION_LABEL_RE.captures_iter(text).collect();

        let mut sections = Vec::new();
        for (i, caps) in labels.iter().enumerate() {
            let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = labels
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(text.len());
            let value = text[whole.end()..end]
                .trim()
                .trim_end_matches([',', ';', '.'])
                .trim();
            let label_key = label.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
            if let Some((_, slot)) = SECTION_LABELS
                .iter()
                .find(|(l, _)| l.eq_ignore_ascii_case(&label_key))
            {
                if !value.is_empty() {
                    sections.push((*slot, value.to_string()));
                }
            }
        }

        let free_end = labels
            .first()
            .and_then(|c| c.get(0))
            .map(|m| m.start())
            .unwrap_or(text.len());
        let segments = text[..free_end]
            .split([',', ';', '\n'])
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            text,
            sections,
            segments,
            title_known: draft.title.is_some(),
        }
    }

    fn section(&self, slot: Slot) -> Option<&str> {
        self.sections
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, v)| v.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Matcher table
// ────────────────────────────────────────────────────────────────────────────

pub struct Matcher {
    pub name: &'static str,
    pub slot: Slot,
    pub extract: fn(&Utterance<'_>) -> Option<Assignment>,
}

/// Priority-ordered matchers. Labeled sections beat inferred values.
pub const MATCHERS: &[Matcher] = &[
    Matcher { name: "labeled_title", slot: Slot::Title, extract: labeled_title },
    Matcher { name: "labeled_description", slot: Slot::Description, extract: labeled_description },
    Matcher { name: "labeled_requirements", slot: Slot::Requirements, extract: labeled_requirements },
    Matcher { name: "labeled_responsibilities", slot: Slot::Responsibilities, extract: labeled_responsibilities },
    Matcher { name: "labeled_benefits", slot: Slot::Benefits, extract: labeled_benefits },
    Matcher { name: "labeled_skills", slot: Slot::Skills, extract: labeled_skills },
    Matcher { name: "labeled_location", slot: Slot::Location, extract: labeled_location },
    Matcher { name: "salary_range", slot: Slot::Salary, extract: salary_range },
    Matcher { name: "salary_bound", slot: Slot::Salary, extract: salary_bound },
    Matcher { name: "currency_code", slot: Slot::Currency, extract: currency_code },
    Matcher { name: "currency_word", slot: Slot::Currency, extract: currency_word },
    Matcher { name: "work_type_keyword", slot: Slot::WorkType, extract: work_type_keyword },
    Matcher { name: "experience_keyword", slot: Slot::ExperienceLevel, extract: experience_keyword },
    Matcher { name: "location_phrase", slot: Slot::Location, extract: location_phrase },
    Matcher { name: "location_gazetteer", slot: Slot::Location, extract: location_gazetteer },
    Matcher { name: "hiring_phrase_title", slot: Slot::Title, extract: hiring_phrase_title },
    Matcher { name: "role_segment_title", slot: Slot::Title, extract: role_segment_title },
    Matcher { name: "skill_phrase", slot: Slot::Skills, extract: skill_phrase },
    Matcher { name: "technology_gazetteer", slot: Slot::Skills, extract: technology_gazetteer },
    Matcher { name: "ai_interview_flag", slot: Slot::EnableAiInterview, extract: ai_interview_flag },
    Matcher { name: "featured_flag", slot: Slot::IsFeatured, extract: featured_flag },
];

/// Collects at most one assignment per slot; the first writer wins.
#[derive(Debug, Default)]
pub struct TurnAssignments {
    assignments: Vec<Assignment>,
}

impl TurnAssignments {
    pub fn contains(&self, slot: Slot) -> bool {
        self.assignments.iter().any(|a| a.slot() == slot)
    }

    /// Adds the assignment unless its slot is already taken this turn.
    pub fn offer(&mut self, assignment: Assignment) -> bool {
        if self.contains(assignment.slot()) {
            return false;
        }
        self.assignments.push(assignment);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn into_vec(self) -> Vec<Assignment> {
        self.assignments
    }
}

/// Runs the matcher table over an utterance, in the context of the current draft.
pub fn extract_assignments(text: &str, draft: &JobPostDraft) -> TurnAssignments {
    let utterance = Utterance::new(text, draft);
    let mut turn = TurnAssignments::default();

    for matcher in MATCHERS {
        if turn.contains(matcher.slot) {
            continue;
        }
        if let Some(assignment) = (matcher.extract)(&utterance) {
            tracing::trace!(matcher = matcher.name, slot = matcher.slot.name(), "matched");
            turn.offer(assignment);
        }
    }

    turn
}

// ────────────────────────────────────────────────────────────────────────────
// Labeled sections
// ────────────────────────────────────────────────────────────────────────────

fn labeled_title(u: &Utterance<'_>) -> Option<Assignment> {
    u.section(Slot::Title).map(|v| Assignment::Title(v.to_string()))
}

fn labeled_description(u: &Utterance<'_>) -> Option<Assignment> {
    u.section(Slot::Description)
        .map(|v| Assignment::Description(v.to_string()))
}

fn labeled_requirements(u: &Utterance<'_>) -> Option<Assignment> {
    u.section(Slot::Requirements)
        .map(|v| Assignment::Requirements(v.to_string()))
}

fn labeled_responsibilities(u: &Utterance<'_>) -> Option<Assignment> {
    u.section(Slot::Responsibilities)
        .map(|v| Assignment::Responsibilities(v.to_string()))
}

fn labeled_benefits(u: &Utterance<'_>) -> Option<Assignment> {
    u.section(Slot::Benefits).map(|v| Assignment::Benefits(v.to_string()))
}

fn labeled_skills(u: &Utterance<'_>) -> Option<Assignment> {
    u.section(Slot::Skills)
        .map(split_skills)
        .filter(|items| !items.is_empty())
        .map(Assignment::Skills)
}

fn labeled_location(u: &Utterance<'_>) -> Option<Assignment> {
    u.section(Slot::Location)
        .map(|v| Assignment::Location(v.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Salary + currency
// ────────────────────────────────────────────────────────────────────────────

fn salary_range(u: &Utterance<'_>) -> Option<Assignment> {
    let has_context = SALARY_CONTEXT_RE.is_match(u.text) || detect_currency(u.text).is_some();

    for caps in SALARY_RANGE_RE.captures_iter(u.text) {
        let whole = caps.get(0)?;
        if YEARS_SUFFIX_RE.is_match(&u.text[whole.end()..]) {
            continue;
        }
        let min = parse_amount(caps.name("min")?.as_str(), caps.name("mink").is_some())?;
        let max = parse_amount(caps.name("max")?.as_str(), caps.name("maxk").is_some())?;
        // "between 150 and 200 employees" is a headcount, not pay.
        let joined_by_and = caps
            .name("sep")
            .is_some_and(|sep| sep.as_str().eq_ignore_ascii_case("and"));
        if has_context || (!joined_by_and && min >= 100 && max >= 100) {
            return Some(Assignment::Salary {
                min: Some(min),
                max: Some(max),
            });
        }
    }
    None
}

fn salary_bound(u: &Utterance<'_>) -> Option<Assignment> {
    let caps = SALARY_BOUND_RE.captures(u.text)?;
    let whole = caps.get(0)?;
    if YEARS_SUFFIX_RE.is_match(&u.text[whole.end()..]) {
        return None;
    }
    let value = parse_amount(caps.name("value")?.as_str(), caps.name("k").is_some())?;
    let kind = caps.name("kind")?.as_str().to_lowercase();
    let kind = kind.split_whitespace().collect::<Vec<_>>().join(" ");

    let (min, max) = match kind.as_str() {
        "up to" | "maximum" | "max" => (None, Some(value)),
        "at least" | "minimum" | "min" | "from" | "starting at" => (Some(value), None),
        _ => (Some(value), Some(value)),
    };
    Some(Assignment::Salary { min, max })
}

/// `"4.5"` with a `k` suffix is 4500; truncation happens after scaling.
fn parse_amount(raw: &str, thousands: bool) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned.parse().ok()?;
    let value = if thousands { value * 1000.0 } else { value };
    value.is_finite().then(|| value.trunc() as i64)
}

fn currency_code(u: &Utterance<'_>) -> Option<Assignment> {
    CURRENCY_CODE_RE
        .find(u.text)
        .map(|m| Assignment::Currency(m.as_str().to_uppercase()))
}

fn currency_word(u: &Utterance<'_>) -> Option<Assignment> {
    CURRENCY_WORD_RES
        .iter()
        .find(|(re, _)| re.is_match(u.text))
        .map(|(_, code)| Assignment::Currency((*code).to_string()))
}

fn detect_currency(text: &str) -> Option<String> {
    CURRENCY_CODE_RE
        .find(text)
        .map(|m| m.as_str().to_uppercase())
        .or_else(|| {
            CURRENCY_WORD_RES
                .iter()
                .find(|(re, _)| re.is_match(text))
                .map(|(_, code)| (*code).to_string())
        })
}

// ────────────────────────────────────────────────────────────────────────────
// Enum keywords
// ────────────────────────────────────────────────────────────────────────────

fn work_type_keyword(u: &Utterance<'_>) -> Option<Assignment> {
    WORK_TYPE_RE
        .find(u.text)
        .map(|m| Assignment::WorkType(m.as_str().to_string()))
}

fn experience_keyword(u: &Utterance<'_>) -> Option<Assignment> {
    if let Some(m) = EXPERIENCE_RE.find(u.text) {
        return Some(Assignment::ExperienceLevel(m.as_str().to_string()));
    }
    u.segments
        .iter()
        .map(String::as_str)
        .chain(u.section(Slot::Title))
        .find_map(|scope| LEADERSHIP_RE.find(scope))
        .map(|m| Assignment::ExperienceLevel(m.as_str().to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Location
// ────────────────────────────────────────────────────────────────────────────

fn location_phrase(u: &Utterance<'_>) -> Option<Assignment> {
    let caps = LOCATION_PHRASE_RE.captures(u.text)?;
    let place = caps.name("place")?.as_str().trim();
    let lowered = place.to_lowercase();
    if place.is_empty() || lowered == "home" || lowered == "office" {
        return None;
    }
    Some(Assignment::Location(place.to_string()))
}

/// Takes the run of known place names in the first segment that contains any,
/// e.g. "Amman Jordan" out of "Amman Jordan" or "Amman" out of "dev in Amman".
fn location_gazetteer(u: &Utterance<'_>) -> Option<Assignment> {
    for segment in &u.segments {
        let matches: Vec<_> = PLACE_RE.find_iter(segment).collect();
        let Some(first) = matches.first() else {
            continue;
        };
        let mut end = first.end();
        for next in &matches[1..] {
            let gap = &segment[end..next.start()];
            if gap.chars().all(|c| c.is_whitespace() || c == '-') {
                end = next.end();
            } else {
                break;
            }
        }
        return Some(Assignment::Location(segment[first.start()..end].to_string()));
    }
    None
}

// ────────────────────────────────────────────────────────────────────────────
// Title
// ────────────────────────────────────────────────────────────────────────────

fn hiring_phrase_title(u: &Utterance<'_>) -> Option<Assignment> {
    let caps = HIRING_PHRASE_RE.captures(u.text)?;
    clean_title(caps.name("title")?.as_str()).map(Assignment::Title)
}

/// Inferred titles only fill an empty slot.
fn role_segment_title(u: &Utterance<'_>) -> Option<Assignment> {
    if u.title_known {
        return None;
    }
    u.segments
        .iter()
        .filter(|s| !PLACE_RE.is_match(s) && !WORK_TYPE_RE.is_match(s))
        .filter(|s| !SENTENCE_OPENER_RE.is_match(s))
        .find_map(|s| clean_title(s))
        .map(Assignment::Title)
}

/// Accepts short phrases ending in a role noun and strips leading seniority words,
/// which belong to `experienceLevel`.
fn clean_title(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_end_matches(['.', '!', '?']);
    if raw.is_empty() || raw.split_whitespace().count() > 6 || !ROLE_SUFFIX_RE.is_match(raw) {
        return None;
    }
    let stripped = SENIORITY_PREFIX_RE.replace(raw, "");
    let title = stripped.trim();
    if title.is_empty() {
        return None;
    }
    Some(title.to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Skills
// ────────────────────────────────────────────────────────────────────────────

fn skill_phrase(u: &Utterance<'_>) -> Option<Assignment> {
    let caps = SKILL_PHRASE_RE.captures(u.text)?;
    let items = split_skills(caps.name("list")?.as_str());
    (!items.is_empty()).then_some(Assignment::Skills(items))
}

fn technology_gazetteer(u: &Utterance<'_>) -> Option<Assignment> {
    let mut found: Vec<(usize, &str)> = TECH_RES
        .iter()
        .filter_map(|(re, tech)| re.find(u.text).map(|m| (m.start(), *tech)))
        .collect();
    if found.is_empty() {
        return None;
    }
    found.sort_by_key(|(pos, _)| *pos);
    Some(Assignment::Skills(
        found.into_iter().map(|(_, t)| t.to_string()).collect(),
    ))
}

fn split_skills(list: &str) -> Vec<String> {
    SKILL_SPLIT_RE
        .split(list)
        .map(|s| s.trim().trim_end_matches(['.', '!']).trim())
        .filter(|s| !s.is_empty() && s.split_whitespace().count() <= 4)
        .map(String::from)
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Flags
// ────────────────────────────────────────────────────────────────────────────

fn ai_interview_flag(u: &Utterance<'_>) -> Option<Assignment> {
    let caps = AI_INTERVIEW_RE.captures(u.text)?;
    Some(Assignment::EnableAiInterview(caps.name("neg").is_none()))
}

fn featured_flag(u: &Utterance<'_>) -> Option<Assignment> {
    let caps = FEATURED_RE.captures(u.text)?;
    Some(Assignment::IsFeatured(caps.name("neg").is_none()))
}

// ────────────────────────────────────────────────────────────────────────────
// Structured (LLM) output → assignments
// ────────────────────────────────────────────────────────────────────────────

/// Converts a `{field: value}` object into assignments. Unknown keys, `null`s and
/// values of the wrong shape are skipped; `department` is never read.
pub fn assignments_from_json(value: &Value) -> Vec<Assignment> {
    let Some(object) = value.as_object() else {
        return Vec::new();
    };

    let text = |key: &str| -> Option<String> {
        object
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    let flag = |key: &str| -> Option<bool> { object.get(key).and_then(Value::as_bool) };

    let mut out = Vec::new();
    if let Some(v) = text("title") {
        out.push(Assignment::Title(v));
    }
    if let Some(v) = text("description") {
        out.push(Assignment::Description(v));
    }
    if let Some(v) = text("requirements") {
        out.push(Assignment::Requirements(v));
    }
    if let Some(v) = text("responsibilities") {
        out.push(Assignment::Responsibilities(v));
    }
    if let Some(v) = text("benefits") {
        out.push(Assignment::Benefits(v));
    }
    match object.get("skills") {
        Some(Value::Array(items)) => {
            let items: Vec<String> = items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect();
            if !items.is_empty() {
                out.push(Assignment::Skills(items));
            }
        }
        Some(Value::String(s)) => {
            let items = split_skills(s);
            if !items.is_empty() {
                out.push(Assignment::Skills(items));
            }
        }
        _ => {}
    }
    if let Some(v) = text("experienceLevel") {
        out.push(Assignment::ExperienceLevel(v));
    }
    if let Some(v) = text("location") {
        out.push(Assignment::Location(v));
    }
    if let Some(v) = text("workType") {
        out.push(Assignment::WorkType(v));
    }
    let min = object.get("salaryMin").and_then(coerce_salary);
    let max = object.get("salaryMax").and_then(coerce_salary);
    if min.is_some() || max.is_some() {
        out.push(Assignment::Salary { min, max });
    }
    if let Some(v) = text("currency") {
        out.push(Assignment::Currency(v));
    }
    if let Some(v) = flag("enableAiInterview") {
        out.push(Assignment::EnableAiInterview(v));
    }
    if let Some(v) = flag("isFeatured") {
        out.push(Assignment::IsFeatured(v));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(text: &str) -> TurnAssignments {
        extract_assignments(text, &JobPostDraft::default())
    }

    fn find(turn: &TurnAssignments, slot: Slot) -> Option<Assignment> {
        turn.assignments.iter().find(|a| a.slot() == slot).cloned()
    }

    #[test]
    fn test_happy_path_first_turn() {
        let turn = extract(
            "Senior .NET Developer, remote, Amman Jordan, responsibilities: build APIs",
        );
        assert_eq!(
            find(&turn, Slot::Title),
            Some(Assignment::Title(".NET Developer".to_string()))
        );
        assert_eq!(
            find(&turn, Slot::ExperienceLevel),
            Some(Assignment::ExperienceLevel("Senior".to_string()))
        );
        assert_eq!(
            find(&turn, Slot::WorkType),
            Some(Assignment::WorkType("remote".to_string()))
        );
        assert_eq!(
            find(&turn, Slot::Location),
            Some(Assignment::Location("Amman Jordan".to_string()))
        );
        assert_eq!(
            find(&turn, Slot::Responsibilities),
            Some(Assignment::Responsibilities("build APIs".to_string()))
        );
        assert!(find(&turn, Slot::Salary).is_none());
    }

    #[test]
    fn test_salary_range_with_currency() {
        let turn = extract("12000 to 18000 JOD");
        assert_eq!(
            find(&turn, Slot::Salary),
            Some(Assignment::Salary {
                min: Some(12000),
                max: Some(18000)
            })
        );
        assert_eq!(
            find(&turn, Slot::Currency),
            Some(Assignment::Currency("JOD".to_string()))
        );
    }

    #[test]
    fn test_salary_k_notation_and_symbol() {
        let turn = extract("budget is $3k-4.5k per month");
        assert_eq!(
            find(&turn, Slot::Salary),
            Some(Assignment::Salary {
                min: Some(3000),
                max: Some(4500)
            })
        );
        assert_eq!(
            find(&turn, Slot::Currency),
            Some(Assignment::Currency("USD".to_string()))
        );
    }

    #[test]
    fn test_years_range_is_not_salary() {
        let turn = extract("3-5 years of experience required");
        assert!(find(&turn, Slot::Salary).is_none());
    }

    #[test]
    fn test_salary_upper_bound_only() {
        let turn = extract("we can pay up to 2500 dinars");
        assert_eq!(
            find(&turn, Slot::Salary),
            Some(Assignment::Salary {
                min: None,
                max: Some(2500)
            })
        );
        assert_eq!(
            find(&turn, Slot::Currency),
            Some(Assignment::Currency("JOD".to_string()))
        );
    }

    #[test]
    fn test_labeled_section_beats_inferred_value() {
        let turn = extract("location: Irbid, office in Amman");
        assert_eq!(
            find(&turn, Slot::Location),
            Some(Assignment::Location("Irbid, office in Amman".to_string()))
        );
    }

    #[test]
    fn test_location_after_preposition() {
        let turn = extract("The team is based in Riyadh and works closely with sales");
        assert_eq!(
            find(&turn, Slot::Location),
            Some(Assignment::Location("Riyadh".to_string()))
        );
    }

    #[test]
    fn test_hiring_phrase_title() {
        let turn = extract("We are hiring a Junior Accountant for our finance team");
        assert_eq!(
            find(&turn, Slot::Title),
            Some(Assignment::Title("Accountant".to_string()))
        );
        assert_eq!(
            find(&turn, Slot::ExperienceLevel),
            Some(Assignment::ExperienceLevel("Junior".to_string()))
        );
    }

    #[test]
    fn test_skill_phrase_split() {
        let turn = extract("experience with React, TypeScript and GraphQL");
        assert_eq!(
            find(&turn, Slot::Skills),
            Some(Assignment::Skills(vec![
                "React".to_string(),
                "TypeScript".to_string(),
                "GraphQL".to_string()
            ]))
        );
    }

    #[test]
    fn test_technology_gazetteer_keeps_symbols() {
        let turn = extract("mostly C# and .NET work with some SQL");
        assert_eq!(
            find(&turn, Slot::Skills),
            Some(Assignment::Skills(vec![
                "C#".to_string(),
                ".NET".to_string(),
                "SQL".to_string()
            ]))
        );
    }

    #[test]
    fn test_narrative_yields_no_core_slots() {
        let turn = extract(
            "We are a growing company and want someone who fits our culture really well",
        );
        for slot in [
            Slot::Title,
            Slot::Responsibilities,
            Slot::ExperienceLevel,
            Slot::Location,
            Slot::Salary,
        ] {
            assert!(find(&turn, slot).is_none(), "unexpected {slot:?}");
        }
    }

    #[test]
    fn test_flags() {
        let turn = extract("enable the AI interview and mark it as featured");
        assert_eq!(
            find(&turn, Slot::EnableAiInterview),
            Some(Assignment::EnableAiInterview(true))
        );
        assert_eq!(find(&turn, Slot::IsFeatured), Some(Assignment::IsFeatured(true)));

        let turn = extract("no AI interview please");
        assert_eq!(
            find(&turn, Slot::EnableAiInterview),
            Some(Assignment::EnableAiInterview(false))
        );
    }

    #[test]
    fn test_explicit_level_beats_leadership_verb_in_section() {
        let turn = extract("title: Marketing Manager, responsibilities: lead campaigns, mid level");
        assert_eq!(
            find(&turn, Slot::ExperienceLevel),
            Some(Assignment::ExperienceLevel("mid level".to_string()))
        );

        let turn = extract("responsibilities: lead campaigns and report to the director");
        assert!(find(&turn, Slot::ExperienceLevel).is_none());
    }

    #[test]
    fn test_leadership_level_from_free_text_and_title() {
        let turn = extract("Lead Designer, remote");
        assert_eq!(
            find(&turn, Slot::ExperienceLevel),
            Some(Assignment::ExperienceLevel("Lead".to_string()))
        );

        let turn = extract("title: Director of Sales");
        assert_eq!(
            find(&turn, Slot::ExperienceLevel),
            Some(Assignment::ExperienceLevel("Director".to_string()))
        );
    }

    #[test]
    fn test_inferred_title_does_not_replace_existing_one() {
        let draft = JobPostDraft {
            title: Some("Data Analyst".to_string()),
            ..JobPostDraft::default()
        };
        let turn = extract_assignments("they report to our finance manager", &draft);
        assert!(find(&turn, Slot::Title).is_none());

        let turn = extract_assignments("title: Senior Data Analyst", &draft);
        assert_eq!(
            find(&turn, Slot::Title),
            Some(Assignment::Title("Senior Data Analyst".to_string()))
        );
    }

    #[test]
    fn test_sentence_is_not_a_title() {
        let turn = extract("they report to our finance manager");
        assert!(find(&turn, Slot::Title).is_none());
        let turn = extract("Finance Manager");
        assert_eq!(
            find(&turn, Slot::Title),
            Some(Assignment::Title("Finance Manager".to_string()))
        );
    }

    #[test]
    fn test_headcount_range_is_not_salary() {
        let turn = extract("a team of between 150 and 200 employees");
        assert!(find(&turn, Slot::Salary).is_none());

        let turn = extract("salary between 900 and 1200 JOD");
        assert_eq!(
            find(&turn, Slot::Salary),
            Some(Assignment::Salary {
                min: Some(900),
                max: Some(1200)
            })
        );
    }

    #[test]
    fn test_first_match_wins_per_slot() {
        let mut turn = TurnAssignments::default();
        assert!(turn.offer(Assignment::Title("Designer".to_string())));
        assert!(!turn.offer(Assignment::Title("Engineer".to_string())));
        assert_eq!(turn.into_vec().len(), 1);
    }

    #[test]
    fn test_assignments_from_json_ignores_department_and_bad_shapes() {
        let value = json!({
            "title": "QA Engineer",
            "department": "Engineering",
            "salaryMin": "1500.75",
            "salaryMax": 2000,
            "skills": ["Selenium", 3],
            "isFeatured": "maybe"
        });
        let assignments = assignments_from_json(&value);
        assert!(assignments.contains(&Assignment::Title("QA Engineer".to_string())));
        assert!(assignments.contains(&Assignment::Salary {
            min: Some(1500),
            max: Some(2000)
        }));
        assert!(assignments.contains(&Assignment::Skills(vec!["Selenium".to_string()])));
        assert!(!assignments.iter().any(|a| a.slot() == Slot::IsFeatured));
    }

    #[test]
    fn test_assignments_from_non_object_is_empty() {
        assert!(assignments_from_json(&json!("title: Engineer")).is_empty());
    }
}
