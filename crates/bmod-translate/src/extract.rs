// extract.rs — Per-intent extractors: lower-cased request text in, rule out.
//
// Each extractor returns None when the text does not carry enough detail to
// build a rule. The translator turns that into UnrecognizedIntent; nothing
// here guesses a broader rule to fill the gap.

use std::collections::BTreeMap;

use bmod_policy::{
    ActionRestrictionRule, ClockWindow, ContentFilterRule, PolicyRule, SecurityLevel,
    SecurityLevelRule, TimeWindowRule, UserAccessRule,
};
use chrono::{NaiveTime, Weekday};
use regex::{Captures, Regex};

/// The request text in both forms extractors need.
pub(crate) struct Input<'a> {
    pub original: &'a str,
    pub lower: String,
}

pub(crate) type Extractor = fn(&Patterns, &Input<'_>) -> Option<PolicyRule>;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "except", "excluding", "without", "don't", "dont", "cannot", "can't",
    "mustn't", "stop", "prevent", "block", "avoid",
];

const START_BOUNDS: &[&str] = &["after", "from", "since", "past"];
const END_BOUNDS: &[&str] = &["before", "until", "till", "by"];
const PERMITTING: &[&str] = &["allow", "allowed", "permit", "let", "can", "may"];

const SSN: &str = r"\b\d{3}-\d{2}-\d{4}\b";
const CREDIT_CARD: &str = r"\b(?:\d[ -]?){13,16}\b";
const EMAIL_ADDRESS: &str = r"\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b";
const PHONE_NUMBER: &str = r"\b(?:\+?\d{1,2}[ .-]?)?\(?\d{3}\)?[ .-]?\d{3}[ .-]?\d{4}\b";
const CREDENTIAL: &str = r"\b(?:password|passwd|secret|api[_ -]?key|access[_ -]?token)s?\b";

/// Words after "containing"/"mentioning" that name a category, not a keyword.
const KEYWORD_STOPLIST: &[&str] = &[
    "a", "an", "the", "any", "personal", "sensitive", "confidential", "private", "credit",
    "social", "phone", "email", "emails", "password", "passwords", "secret", "secrets", "api",
    "ssn", "ssns", "pii", "credentials", "more", "over",
];

/// Words after "user" that are not user ids.
const USER_STOPLIST: &[&str] = &[
    "access", "accounts", "from", "to", "with", "the", "a", "an", "and", "or", "is", "are",
    "role", "roles", "named", "id", "data",
];

/// Regexes used by the extractors, compiled once per translator.
pub(crate) struct Patterns {
    day: Regex,
    business_hours: Regex,
    clock: Regex,
    bare_range: Regex,
    period: Regex,
    email: Regex,
    user_id: Regex,
    role: Regex,
    only_allow: Regex,
    read_only: Regex,
    actions: Vec<(Regex, &'static [&'static str])>,
    read_verbs: Regex,
    quoted: Regex,
    keyword: Regex,
    categories: Vec<(Regex, &'static str, &'static str)>,
    pii_bundle: Regex,
    max_length: Regex,
    level: Regex,
}

impl Patterns {
    pub(crate) fn new() -> Result<Self, regex::Error> {
        let actions: &[(&str, &'static [&'static str])] = &[
            (r"\b(?:send|sends|sending|sent)\b", &["send"]),
            (r"\b(?:emails?|e-mails?|emailing)\b", &["email"]),
            (
                r"\b(?:delete|deletes|deleting|deletion|remove|removes|removing|erase)\b",
                &["delete", "remove"],
            ),
            (
                r"\b(?:modify|modifies|modifying|update|updates|updating|edit|edits|editing|change|changes|changing)\b",
                &["modify", "update", "edit"],
            ),
            (r"\b(?:create|creates|creating)\b", &["create"]),
            (r"\b(?:write|writes|writing)\b", &["write"]),
            (
                r"\b(?:execute|executes|executing|run|runs|running)\b",
                &["execute", "run"],
            ),
            (r"\b(?:share|shares|sharing)\b", &["share"]),
            (r"\b(?:post|posts|posting|publish|publishing)\b", &["post", "publish"]),
            (
                r"\b(?:purchase|purchases|purchasing|buy|buying|pay|pays|paying|payments?)\b",
                &["purchase", "pay"],
            ),
        ];
        let categories: &[(&str, &'static str, &'static str)] = &[
            (r"\b(?:ssns?|social security)\b", "ssn", SSN),
            (r"\bcredit cards?\b", "credit_card", CREDIT_CARD),
            (r"\bemail address(?:es)?\b", "email_address", EMAIL_ADDRESS),
            (r"\bphone(?: numbers?)?\b", "phone_number", PHONE_NUMBER),
            (
                r"\b(?:passwords?|secrets?|api keys?|credentials?|access tokens?)\b",
                "credential",
                CREDENTIAL,
            ),
        ];

        Ok(Self {
            day: Regex::new(
                r"\b(?:weekdays?|weekends?|workdays?|business days|mondays?|tuesdays?|wednesdays?|thursdays?|fridays?|saturdays?|sundays?)\b",
            )?,
            business_hours: Regex::new(r"\b(?:business|office|working|work) hours?\b")?,
            clock: Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b")?,
            bare_range: Regex::new(r"\b(\d{1,2})\s*(?:to|-|until|till|through)\s*(\d{1,2})(\s*(?:am|pm)|:\d)?")?,
            period: Regex::new(r"\b(?:morning|afternoon|evening|overnight|nighttime|night|daytime)\b")?,
            email: Regex::new(EMAIL_ADDRESS)?,
            user_id: Regex::new(r"\b(?:user|username|account)\s+(?:id\s+|named\s+)?([a-z0-9_.@+-]+)")?,
            role: Regex::new(
                r"\b(?:admins?|administrators?|managers?|contractors?|guests?|interns?|employees?|staff|supervisors?|analysts?|developers?|viewers?)\b",
            )?,
            only_allow: Regex::new(r"\bonly\s+(?:allow|permit|let)\b")?,
            read_only: Regex::new(r"\bread[- ]?only\b")?,
            actions: actions
                .iter()
                .map(|(p, k)| Regex::new(p).map(|re| (re, *k)))
                .collect::<Result<_, _>>()?,
            read_verbs: Regex::new(r"\b(?:read|reads|reading|view|viewing|list|listing|get|fetch)\b")?,
            quoted: Regex::new(r#""([^"]+)"|“([^”]+)”"#)?,
            keyword: Regex::new(
                r"\b(?:mentioning|mentions|mention|containing|contains|contain|including|includes|with the (?:word|phrase))\s+([a-z0-9][a-z0-9_-]*)",
            )?,
            categories: categories
                .iter()
                .map(|(t, n, p)| Regex::new(t).map(|re| (re, *n, *p)))
                .collect::<Result<_, _>>()?,
            pii_bundle: Regex::new(
                r"\b(?:personal|private)\s+(?:information|data|details)\b|\b(?:sensitive|confidential|pii)\b",
            )?,
            max_length: Regex::new(
                r"\b(?:longer than|more than|over|exceeding|exceeds|above)\s+(\d+)\s+(?:characters|chars)\b",
            )?,
            level: Regex::new(r"\b(low|normal|medium|standard|high|critical)\b")?,
        })
    }
}

// ── helpers ──────────────────────────────────────────────────────

fn clean_word(w: &str) -> &str {
    w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
}

/// True when one of the `window` words before byte offset `pos` negates.
fn negated_before(lower: &str, pos: usize, window: usize) -> bool {
    lower[..pos]
        .split_whitespace()
        .rev()
        .take(window)
        .any(|w| NEGATIONS.contains(&clean_word(w)))
}

fn word_before(lower: &str, pos: usize) -> Option<&str> {
    lower[..pos].split_whitespace().next_back().map(clean_word)
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn hm(hour: u32, minute: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn window(start: NaiveTime, end: NaiveTime) -> Option<ClockWindow> {
    (start != end).then(|| ClockWindow::new(start, end))
}

/// `[a, b)` becomes `[b, a)`: the rest of the day.
fn complement(w: ClockWindow) -> ClockWindow {
    ClockWindow::new(w.end, w.start)
}

// ── restrict_time ────────────────────────────────────────────────

fn days_for(token: &str) -> Vec<Weekday> {
    match token {
        t if t.starts_with("weekday") || t.starts_with("workday") || t == "business days" => {
            bmod_policy::rule::weekdays()
        }
        t if t.starts_with("weekend") => bmod_policy::rule::weekend(),
        t if t.starts_with("mon") => vec![Weekday::Mon],
        t if t.starts_with("tue") => vec![Weekday::Tue],
        t if t.starts_with("wed") => vec![Weekday::Wed],
        t if t.starts_with("thu") => vec![Weekday::Thu],
        t if t.starts_with("fri") => vec![Weekday::Fri],
        t if t.starts_with("sat") => vec![Weekday::Sat],
        t if t.starts_with("sun") => vec![Weekday::Sun],
        _ => Vec::new(),
    }
}

/// A clock time from a `clock` match. Bare numbers (no minutes, no am/pm)
/// are not times.
fn parse_clock(c: &Captures<'_>) -> Option<NaiveTime> {
    let hour: u32 = c.get(1)?.as_str().parse().ok()?;
    let minute: u32 = match c.get(2) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    match c.get(3).map(|m| m.as_str()) {
        Some(period) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            let hour = match (period, hour) {
                ("am", 12) => 0,
                ("pm", h) if h != 12 => h + 12,
                (_, h) => h,
            };
            hm(hour, minute)
        }
        None if c.get(2).is_some() => hm(hour, minute),
        None => None,
    }
}

/// The window a time clause names, and whether the clause was negated.
fn clock_window(p: &Patterns, lower: &str) -> Option<(ClockWindow, bool)> {
    let times: Vec<(usize, NaiveTime)> = p
        .clock
        .captures_iter(lower)
        .filter_map(|c| Some((c.get(0)?.start(), parse_clock(&c)?)))
        .collect();

    let (first_pos, w) = match times.as_slice() {
        [(pos, a), (_, b), ..] => (*pos, window(*a, *b)?),
        [(pos, t)] => {
            let bound = word_before(lower, *pos)?;
            let w = if START_BOUNDS.contains(&bound) {
                window(*t, NaiveTime::MIN)?
            } else if END_BOUNDS.contains(&bound) {
                window(NaiveTime::MIN, *t)?
            } else {
                return None;
            };
            (*pos, w)
        }
        [] => {
            let c = p.bare_range.captures(lower)?;
            if c.get(3).is_some() {
                return None;
            }
            let start: u32 = c[1].parse().ok()?;
            let mut end: u32 = c[2].parse().ok()?;
            // "9 to 5" means 09:00-17:00.
            if end <= start && end < 12 {
                end += 12;
            }
            (c.get(0)?.start(), window(hm(start, 0)?, hm(end, 0)?)?)
        }
    };

    Some((w, negated_before(lower, first_pos, 6)))
}

fn period_window(p: &Patterns, lower: &str) -> Option<(ClockWindow, bool)> {
    let m = p.period.find(lower)?;
    let (start, end) = match m.as_str() {
        "morning" => (6, 12),
        "afternoon" => (12, 17),
        "evening" => (17, 22),
        "daytime" => (6, 18),
        _ => (22, 6),
    };
    let w = window(hm(start, 0)?, hm(end, 0)?)?;
    Some((w, negated_before(lower, m.start(), 4)))
}

pub(crate) fn time_rule(p: &Patterns, input: &Input<'_>) -> Option<PolicyRule> {
    let lower = input.lower.as_str();

    let mut allowed = Vec::new();
    let mut blocked = Vec::new();
    for m in p.day.find_iter(lower) {
        let target = if negated_before(lower, m.start(), 4) {
            &mut blocked
        } else {
            &mut allowed
        };
        for day in days_for(m.as_str()) {
            push_unique(target, day);
        }
    }
    allowed.retain(|d| !blocked.contains(d));

    let business = p.business_hours.is_match(lower);
    let named = clock_window(p, lower).or_else(|| period_window(p, lower));
    let days_given = !allowed.is_empty() || !blocked.is_empty();

    // "Stop working after 6pm on Friday" denies one slice of one day. A
    // TimeWindowRule blocks whole days or one daily window, not both
    // together, so that request has no faithful rule.
    if days_given && named.is_some_and(|(_, negated)| negated) {
        return None;
    }
    let window = match named {
        Some((w, true)) => Some(complement(w)),
        Some((w, false)) => Some(w),
        None => business.then(ClockWindow::business_hours),
    };

    if !days_given && window.is_none() {
        return Some(PolicyRule::TimeWindow(TimeWindowRule::business_hours()));
    }
    if business && !days_given {
        allowed = bmod_policy::rule::weekdays();
    }

    Some(PolicyRule::TimeWindow(TimeWindowRule {
        allowed_days: allowed,
        blocked_days: blocked,
        window,
        utc_offset_minutes: 0,
    }))
}

// ── block_user ───────────────────────────────────────────────────

fn canonical_role(word: &str) -> String {
    match word {
        "admin" | "admins" | "administrator" | "administrators" => "admin".to_string(),
        "staff" => "staff".to_string(),
        w => w.strip_suffix('s').unwrap_or(w).to_string(),
    }
}

pub(crate) fn user_rule(p: &Patterns, input: &Input<'_>) -> Option<PolicyRule> {
    let lower = input.lower.as_str();

    let mut users: Vec<String> = Vec::new();
    for m in p.email.find_iter(lower) {
        push_unique(&mut users, m.as_str().to_string());
    }
    for c in p.user_id.captures_iter(lower) {
        let id = c[1].trim_end_matches(['.', ',', ';', ':', '!', '?']);
        if !id.is_empty() && !USER_STOPLIST.contains(&id) {
            push_unique(&mut users, id.to_string());
        }
    }
    let mut roles: Vec<String> = Vec::new();
    for m in p.role.find_iter(lower) {
        push_unique(&mut roles, canonical_role(m.as_str()));
    }
    if users.is_empty() && roles.is_empty() {
        return None;
    }

    let rule = if p.only_allow.is_match(lower) {
        UserAccessRule {
            allowed_users: users,
            allowed_roles: roles,
            ..UserAccessRule::default()
        }
    } else {
        UserAccessRule {
            blocked_users: users,
            blocked_roles: roles,
            ..UserAccessRule::default()
        }
    };
    Some(PolicyRule::UserAccess(rule))
}

// ── restrict_action ──────────────────────────────────────────────

const READ_KEYWORDS: &[&str] = &["read", "view", "list", "get"];

pub(crate) fn action_rule(p: &Patterns, input: &Input<'_>) -> Option<PolicyRule> {
    let lower = input.lower.as_str();
    let allow_mode = p.only_allow.is_match(lower) || p.read_only.is_match(lower);

    let mut keywords: Vec<String> = Vec::new();
    for (re, canon) in &p.actions {
        for m in re.find_iter(lower) {
            // "block deletes but allow edits": the permitted verb is not restricted.
            let permitted = word_before(lower, m.start()).is_some_and(|w| PERMITTING.contains(&w));
            if allow_mode || !permitted {
                for k in canon.iter() {
                    push_unique(&mut keywords, k.to_string());
                }
                break;
            }
        }
    }
    if allow_mode && (p.read_only.is_match(lower) || p.read_verbs.is_match(lower)) {
        for k in READ_KEYWORDS {
            push_unique(&mut keywords, k.to_string());
        }
    }
    if keywords.is_empty() {
        return None;
    }

    let rule = if allow_mode {
        ActionRestrictionRule {
            allowed_actions: keywords,
            ..ActionRestrictionRule::default()
        }
    } else {
        ActionRestrictionRule::restrict(keywords)
    };
    Some(PolicyRule::ActionRestriction(rule))
}

// ── block_content ────────────────────────────────────────────────

pub(crate) fn content_rule(p: &Patterns, input: &Input<'_>) -> Option<PolicyRule> {
    let lower = input.lower.as_str();
    let mut rule = ContentFilterRule::default();

    for c in p.quoted.captures_iter(input.original) {
        if let Some(phrase) = c.get(1).or_else(|| c.get(2)) {
            let phrase = phrase.as_str().trim();
            if !phrase.is_empty() {
                push_unique(&mut rule.blocked_patterns, regex::escape(phrase));
            }
        }
    }
    // Unquoted keywords only when nothing was quoted.
    if rule.blocked_patterns.is_empty() {
        for c in p.keyword.captures_iter(lower) {
            let word = &c[1];
            if !KEYWORD_STOPLIST.contains(&word) && !word.chars().all(|ch| ch.is_ascii_digit()) {
                push_unique(&mut rule.blocked_patterns, format!(r"\b{}\b", regex::escape(word)));
            }
        }
    }

    let mut sensitive: BTreeMap<String, String> = BTreeMap::new();
    for (trigger, name, pattern) in &p.categories {
        if trigger.is_match(lower) {
            sensitive.insert(name.to_string(), pattern.to_string());
        }
    }
    if p.pii_bundle.is_match(lower) {
        for (name, pattern) in [
            ("ssn", SSN),
            ("credit_card", CREDIT_CARD),
            ("email_address", EMAIL_ADDRESS),
            ("phone_number", PHONE_NUMBER),
        ] {
            sensitive.insert(name.to_string(), pattern.to_string());
        }
    }
    rule.sensitive_patterns = sensitive;

    if let Some(c) = p.max_length.captures(lower) {
        rule.max_length = c[1].parse().ok();
    }

    let empty = rule.blocked_patterns.is_empty()
        && rule.sensitive_patterns.is_empty()
        && rule.max_length.is_none();
    (!empty).then_some(PolicyRule::ContentFilter(rule))
}

// ── set_security_level ───────────────────────────────────────────

pub(crate) fn security_rule(p: &Patterns, input: &Input<'_>) -> Option<PolicyRule> {
    let level: SecurityLevel = p.level.find(&input.lower)?.as_str().parse().ok()?;
    Some(PolicyRule::SecurityLevel(SecurityLevelRule::minimum(level)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(text: &str) -> Input<'_> {
        Input {
            original: text,
            lower: text.to_lowercase(),
        }
    }

    fn time(text: &str) -> TimeWindowRule {
        let p = Patterns::new().unwrap();
        match time_rule(&p, &input(text)) {
            Some(PolicyRule::TimeWindow(r)) => r,
            other => panic!("expected time rule, got {:?}", other),
        }
    }

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn am_pm_pair_builds_window() {
        let rule = time("Only work from 8:30 am to 6 PM on weekdays");
        assert_eq!(rule.window, Some(ClockWindow::new(t(8, 30), t(18, 0))));
        assert_eq!(rule.allowed_days, bmod_policy::rule::weekdays());
    }

    #[test]
    fn twenty_four_hour_clock() {
        let rule = time("allow work between 07:00 and 19:30");
        assert_eq!(rule.window, Some(ClockWindow::new(t(7, 0), t(19, 30))));
        assert!(rule.allowed_days.is_empty());
    }

    #[test]
    fn bare_nine_to_five() {
        let rule = time("work 9 to 5 on weekdays");
        assert_eq!(rule.window, Some(ClockWindow::business_hours()));
    }

    #[test]
    fn negated_days_are_blocked() {
        let rule = time("Do not work on weekends");
        assert_eq!(rule.blocked_days, bmod_policy::rule::weekend());
        assert!(rule.allowed_days.is_empty());
        assert_eq!(rule.window, None);
    }

    #[test]
    fn except_removes_from_allowed() {
        let rule = time("work on weekdays except friday");
        assert_eq!(rule.blocked_days, vec![Weekday::Fri]);
        assert!(!rule.allowed_days.contains(&Weekday::Fri));
        assert_eq!(rule.allowed_days.len(), 4);
    }

    #[test]
    fn negated_after_means_before() {
        let rule = time("don't work after 10 pm");
        assert_eq!(rule.window, Some(ClockWindow::new(NaiveTime::MIN, t(22, 0))));
    }

    #[test]
    fn stop_after_time_on_a_day_has_no_rule() {
        let p = Patterns::new().unwrap();
        for text in [
            "Stop working after 6pm on Friday",
            "don't work after 10 pm on weekends",
            "avoid work in the evening on mondays",
        ] {
            assert_eq!(time_rule(&p, &input(text)), None, "{}", text);
        }
    }

    #[test]
    fn stop_and_block_negate_days() {
        let rule = time("Block work on weekends");
        assert_eq!(rule.blocked_days, bmod_policy::rule::weekend());
        assert!(rule.allowed_days.is_empty());

        let rule = time("stop working on fridays");
        assert_eq!(rule.blocked_days, vec![Weekday::Fri]);
    }

    #[test]
    fn no_work_at_night_complements_the_night() {
        let rule = time("no work at night");
        assert_eq!(rule.window, Some(ClockWindow::new(t(6, 0), t(22, 0))));
    }

    #[test]
    fn underspecified_defaults_to_business_hours() {
        let rule = time("only during business hours");
        assert_eq!(rule, TimeWindowRule::business_hours());
    }

    #[test]
    fn invalid_clock_is_ignored() {
        let p = Patterns::new().unwrap();
        let c = p.clock.captures("13 pm").unwrap();
        assert_eq!(parse_clock(&c), None);
        let c = p.clock.captures("12 am").unwrap();
        assert_eq!(parse_clock(&c), Some(NaiveTime::MIN));
    }

    #[test]
    fn permitted_verbs_are_not_restricted() {
        let p = Patterns::new().unwrap();
        match action_rule(&p, &input("block deleting files but allow editing")) {
            Some(PolicyRule::ActionRestriction(r)) => {
                assert_eq!(r.restricted_actions, vec!["delete", "remove"]);
            }
            other => panic!("expected action rule, got {:?}", other),
        }
    }

    #[test]
    fn unquoted_keyword_becomes_word_pattern() {
        let p = Patterns::new().unwrap();
        match content_rule(&p, &input("block messages mentioning acquisition")) {
            Some(PolicyRule::ContentFilter(r)) => {
                assert_eq!(r.blocked_patterns, vec![r"\bacquisition\b"]);
            }
            other => panic!("expected content rule, got {:?}", other),
        }
    }

    #[test]
    fn bare_sensitive_enables_pii_bundle() {
        let p = Patterns::new().unwrap();
        match content_rule(&p, &input("Block sensitive content")) {
            Some(PolicyRule::ContentFilter(r)) => {
                assert!(r.sensitive_patterns.contains_key("ssn"));
                assert!(r.sensitive_patterns.contains_key("phone_number"));
                assert!(r.blocked_patterns.is_empty());
            }
            other => panic!("expected content rule, got {:?}", other),
        }
    }

    #[test]
    fn max_length_phrase() {
        let p = Patterns::new().unwrap();
        match content_rule(&p, &input("block messages longer than 280 characters")) {
            Some(PolicyRule::ContentFilter(r)) => assert_eq!(r.max_length, Some(280)),
            other => panic!("expected content rule, got {:?}", other),
        }
    }
}
