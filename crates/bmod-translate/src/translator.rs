// translator.rs — Classify a plain-language request and build its rule.
//
// Classification is a fixed, ordered table. Each entry lists the matchers
// for one intent; an intent's score is how many of its matchers appear in
// the lower-cased text. The highest score wins and earlier entries win
// ties. The winning entry's extractor then builds the rule, which must pass
// the same validation as a hand-written rule.
//
// A decisive matcher overrides scoring: naming a sensitive data category
// makes the request a content filter however many verbs it also uses.

use regex::Regex;

use crate::error::TranslateError;
use crate::extract::{self, Extractor, Input, Patterns};
use crate::intent::{ModificationIntent, Translation};

/// Table rows: intent, matchers, extractor. Order breaks ties.
const INTENT_TABLE: &[(ModificationIntent, &[&str], Extractor)] = &[
    (
        ModificationIntent::RestrictTime,
        &[
            r"\b(?:business|office|working|work) hours?\b",
            r"\b\d{1,2}(?::\d{2})?\s*(?:am|pm)\b",
            r"\b\d{1,2}:\d{2}\b",
            r"\b(?:weekdays?|weekends?|workdays?|business days|mondays?|tuesdays?|wednesdays?|thursdays?|fridays?|saturdays?|sundays?)\b",
            r"\b(?:morning|afternoon|evening|night|overnight|daytime|nighttime)\b",
            r"\b(?:during|between|until|till|after|before)\b",
        ],
        extract::time_rule,
    ),
    (
        ModificationIntent::BlockUser,
        &[
            r"\b(?:block|deny|ban|prevent|stop|restrict|forbid)\b.*\b(?:users?|people|persons?|accounts?|members?)\b",
            r"\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b",
            r"\b(?:user|username|account)\s+(?:id\s+|named\s+)?[a-z0-9_.@+-]+",
            r"\b(?:admins?|administrators?|managers?|contractors?|guests?|interns?|employees?|staff|supervisors?|analysts?|developers?|viewers?)\b",
            r"\bonly\s+(?:allow|permit|let)\b.*\b(?:users?|roles?|people|admins?|managers?)\b",
        ],
        extract::user_rule,
    ),
    (
        ModificationIntent::BlockContent,
        &[
            r#""[^"]+"|“[^”]+”"#,
            r"\b(?:ssns?|social security|credit cards?|email address(?:es)?|phone numbers?|passwords?|secrets?|api keys?|credentials?|pii)\b",
            r"\b(?:personal|sensitive|confidential|private)\s+(?:information|data|details)\b",
            r"\b(?:information|data|details)\b",
            r"\b(?:content|text|keywords?|phrases?|words?|mentions?|mentioning|containing|contains)\b",
            r"\b(?:characters|chars)\b",
        ],
        extract::content_rule,
    ),
    (
        ModificationIntent::RestrictAction,
        &[
            r"\b(?:send|sending|delete|deleting|remove|removing|modify|modifying|update|updating|edit|editing|create|creating|write|writing|execute|executing|run|running|share|sharing|post|posting|purchase|purchasing|buy|pay|paying)\b",
            r"\b(?:don'?t|do not|never|cannot|can'?t|must not)\s+\w+",
            r"\bread[- ]?only\b",
            r"\bonly\s+(?:allow|permit|let)\b.*\b(?:read|reading|view|viewing|list|listing)\b",
            r"\b(?:files?|emails?|messages?|records?|payments?|documents?|databases?)\b",
        ],
        extract::action_rule,
    ),
    (
        ModificationIntent::SetSecurityLevel,
        &[
            r"\bsecurity\b",
            r"\b(?:low|normal|medium|standard|high|critical)\b",
            r"\b(?:clearance|security level|minimum level|at least)\b",
        ],
        extract::security_rule,
    ),
];

/// Matchers whose hit decides the intent outright.
const DECISIVE: &[(ModificationIntent, &str)] = &[(
    ModificationIntent::BlockContent,
    r"\b(?:ssns?|social security|credit cards?|passwords?|secrets?|api keys?|credentials?|pii|sensitive|confidential)\b|\b(?:personal|private)\s+(?:information|data|details)\b",
)];

struct IntentEntry {
    intent: ModificationIntent,
    matchers: Vec<Regex>,
    decisive: Option<Regex>,
    extract: Extractor,
}

impl IntentEntry {
    fn score(&self, lower: &str) -> usize {
        self.matchers.iter().filter(|m| m.is_match(lower)).count()
    }
}

/// Turns plain-language requests into policy rules. Pure: no I/O, no
/// blocking. Build once and reuse; construction compiles every pattern.
pub struct Translator {
    table: Vec<IntentEntry>,
    patterns: Patterns,
}

impl Translator {
    pub fn new() -> Result<Self, TranslateError> {
        let table = INTENT_TABLE
            .iter()
            .map(|(intent, matchers, extract)| -> Result<IntentEntry, TranslateError> {
                let decisive = DECISIVE
                    .iter()
                    .find(|(i, _)| i == intent)
                    .map(|(_, m)| Regex::new(m))
                    .transpose()?;
                Ok(IntentEntry {
                    intent: *intent,
                    matchers: matchers
                        .iter()
                        .map(|m| Regex::new(m))
                        .collect::<Result<_, _>>()?,
                    decisive,
                    extract: *extract,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            table,
            patterns: Patterns::new()?,
        })
    }

    /// Score of every intent for `text`, in table order.
    pub fn scores(&self, text: &str) -> Vec<(ModificationIntent, usize)> {
        let lower = text.to_lowercase();
        self.table
            .iter()
            .map(|e| (e.intent, e.score(&lower)))
            .collect()
    }

    /// The winning intent and its score, or None when nothing matched.
    pub fn classify(&self, text: &str) -> Option<(ModificationIntent, usize)> {
        let lower = text.to_lowercase();
        self.best(&lower).map(|(e, score)| (e.intent, score))
    }

    fn best(&self, lower: &str) -> Option<(&IntentEntry, usize)> {
        if let Some(entry) = self
            .table
            .iter()
            .find(|e| e.decisive.as_ref().is_some_and(|d| d.is_match(lower)))
        {
            return Some((entry, entry.score(lower)));
        }
        let mut best: Option<(&IntentEntry, usize)> = None;
        for entry in &self.table {
            let score = entry.score(lower);
            // Strictly greater: earlier rows keep ties.
            if score > 0 && best.map_or(true, |(_, s)| score > s) {
                best = Some((entry, score));
            }
        }
        best
    }

    pub fn translate(&self, text: &str) -> Result<Translation, TranslateError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TranslateError::unrecognized(text, "request is empty"));
        }
        let input = Input {
            original: trimmed,
            lower: trimmed.to_lowercase(),
        };

        let (entry, score) = self
            .best(&input.lower)
            .ok_or_else(|| TranslateError::unrecognized(trimmed, "no intent keywords found"))?;
        let rule = (entry.extract)(&self.patterns, &input).ok_or_else(|| {
            TranslateError::unrecognized(
                trimmed,
                format!("{} request is missing the details needed for a rule", entry.intent),
            )
        })?;
        rule.validate().map_err(|e| {
            TranslateError::unrecognized(
                trimmed,
                format!("{} rule would be invalid: {}", entry.intent, e),
            )
        })?;

        tracing::debug!(intent = %entry.intent, score, kind = rule.kind_name(), "translated request");
        Ok(Translation {
            intent: entry.intent,
            description: format!("{}: {}", entry.intent.label(), trimmed),
            rule,
        })
    }
}

/// Translate with a freshly built translator.
pub fn translate(text: &str) -> Result<Translation, TranslateError> {
    Translator::new()?.translate(text)
}
