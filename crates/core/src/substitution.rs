//! Substitution rows from the timetabling provider.
//!
//! The provider returns fixed-position rows of eight HTML-ish cells:
//!
//! ```text
//! [hour, time, class/group, subject, room, teacher, infoType, substitutionText]
//! ```
//!
//! plus per-column style classes. This module cleans the cells and classifies
//! each row into a closed [`SubstitutionType`] through an explicit, ordered
//! token table.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Raw row
// ---------------------------------------------------------------------------

/// Column index of the free-text substitution type cell.
pub const TYPE_TEXT_INDEX: usize = 6;

/// Style class the provider puts on cells of cancelled lessons.
pub const CANCEL_STYLE_CLASS: &str = "cancelStyle";

/// Sort key used for rows whose hour cell does not start with a number.
const UNKNOWN_HOUR_SORT_KEY: u32 = 999;

/// One raw row as delivered by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionRow {
    /// The eight positional cells.
    pub data: Vec<String>,
    /// Provider-side grouping label (usually the class).
    #[serde(default)]
    pub group: String,
    /// Style classes per column name, e.g. `{"subject": ["cancelStyle"]}`.
    #[serde(default, rename = "cellClasses")]
    pub cell_classes: HashMap<String, Vec<String>>,
}

impl SubstitutionRow {
    /// Build a row from positional cells without any styling hints.
    pub fn from_cells<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data: cells.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    fn cell(&self, index: usize) -> &str {
        self.data.get(index).map(String::as_str).unwrap_or("")
    }

    fn has_cancel_style(&self) -> bool {
        self.cell_classes
            .values()
            .any(|classes| classes.iter().any(|c| c == CANCEL_STYLE_CLASS))
    }
}

// ---------------------------------------------------------------------------
// SubstitutionType
// ---------------------------------------------------------------------------

/// Closed classification of a substitution row.
///
/// The derived ordering is the notification priority, a total order where
/// lower sorts first: cancellations, then cover and moved lessons, then every
/// other kind with [`SubstitutionType::Sonstiges`] last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubstitutionType {
    /// The lesson is cancelled.
    Entfall,
    /// Another teacher covers the lesson.
    Vertretung,
    /// The lesson is moved to another slot.
    Verlegung,
    /// The lesson takes place in a different room.
    #[serde(rename = "Raumänderung")]
    Raumaenderung,
    Sondereinsatz,
    /// Self-directed study ("eigenverantwortliches Arbeiten").
    #[serde(rename = "EVA")]
    Eva,
    Klausur,
    Freisetzung,
    /// Type text the provider uses that none of the known tokens describe.
    Sonstiges,
}

impl SubstitutionType {
    /// Every variant in priority order.
    pub const ALL: [SubstitutionType; 9] = [
        SubstitutionType::Entfall,
        SubstitutionType::Vertretung,
        SubstitutionType::Verlegung,
        SubstitutionType::Raumaenderung,
        SubstitutionType::Sondereinsatz,
        SubstitutionType::Eva,
        SubstitutionType::Klausur,
        SubstitutionType::Freisetzung,
        SubstitutionType::Sonstiges,
    ];

    /// Display label, as shown by the provider.
    pub fn as_str(self) -> &'static str {
        match self {
            SubstitutionType::Entfall => "Entfall",
            SubstitutionType::Vertretung => "Vertretung",
            SubstitutionType::Verlegung => "Verlegung",
            SubstitutionType::Raumaenderung => "Raumänderung",
            SubstitutionType::Sondereinsatz => "Sondereinsatz",
            SubstitutionType::Eva => "EVA",
            SubstitutionType::Klausur => "Klausur",
            SubstitutionType::Freisetzung => "Freisetzung",
            SubstitutionType::Sonstiges => "Sonstiges",
        }
    }

    /// Sort priority (0 = most important).
    pub fn priority(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SubstitutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// How a table entry recognises its type in the raw type text.
#[derive(Debug, Clone, Copy)]
enum TypeToken {
    /// Case-sensitive substring anywhere in the text.
    Substring(&'static str),
    /// Case-sensitive whole word.
    Word(&'static str),
}

impl TypeToken {
    fn matches(self, text: &str) -> bool {
        match self {
            TypeToken::Substring(token) => text.contains(token),
            TypeToken::Word(token) => text
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| word == token),
        }
    }
}

/// Token table, evaluated top to bottom; the first hit wins.
const CLASSIFICATION_TABLE: &[(TypeToken, SubstitutionType)] = &[
    (TypeToken::Substring("Entfall"), SubstitutionType::Entfall),
    (TypeToken::Substring("Raumänderung"), SubstitutionType::Raumaenderung),
    (TypeToken::Word("Raum"), SubstitutionType::Raumaenderung),
    (TypeToken::Substring("Vertretung"), SubstitutionType::Vertretung),
    (TypeToken::Substring("Verlegung"), SubstitutionType::Verlegung),
    (TypeToken::Substring("Sondereinsatz"), SubstitutionType::Sondereinsatz),
    (TypeToken::Substring("EVA"), SubstitutionType::Eva),
    (TypeToken::Substring("Klausur"), SubstitutionType::Klausur),
    (TypeToken::Substring("Freisetzung"), SubstitutionType::Freisetzung),
];

/// Type of a plain row whose type cell is empty.
pub const DEFAULT_SUBSTITUTION_TYPE: SubstitutionType = SubstitutionType::Vertretung;

/// Classify raw type text, honouring the cancel-style hint first.
///
/// A `cancelStyle` class on any cell always yields [`SubstitutionType::Entfall`]
/// regardless of the text. An empty cell is a plain cover row; text that no
/// token recognises is [`SubstitutionType::Sonstiges`].
pub fn classify_type(type_text: &str, has_cancel_style: bool) -> SubstitutionType {
    if has_cancel_style {
        return SubstitutionType::Entfall;
    }
    if type_text.trim().is_empty() {
        return DEFAULT_SUBSTITUTION_TYPE;
    }

    CLASSIFICATION_TABLE
        .iter()
        .find(|(token, _)| token.matches(type_text))
        .map(|(_, kind)| *kind)
        .unwrap_or(SubstitutionType::Sonstiges)
}

/// Classify a raw provider row.
pub fn extract_substitution_type(row: &SubstitutionRow) -> SubstitutionType {
    classify_type(row.cell(TYPE_TEXT_INDEX), row.has_cancel_style())
}

// ---------------------------------------------------------------------------
// Cell cleaning
// ---------------------------------------------------------------------------

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("static regex is valid"));

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)").expect("static regex is valid"));

/// HTML entities the provider emits, in replacement order.
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&auml;", "ä"),
    ("&ouml;", "ö"),
    ("&uuml;", "ü"),
    ("&Auml;", "Ä"),
    ("&Ouml;", "Ö"),
    ("&Uuml;", "Ü"),
    ("&szlig;", "ß"),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
];

/// Strip tags and decode the entities the provider uses.
pub fn strip_html(content: &str) -> String {
    let mut text = HTML_TAG.replace_all(content, "").into_owned();
    for (entity, replacement) in HTML_ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }
    text
}

/// Keep only the leading token before a parenthesised annotation.
///
/// The provider renders replaced values as `"new (old)"`; only the new value
/// is relevant.
fn leading_token(raw: &str) -> String {
    let clean = strip_html(raw);
    if clean.is_empty() || clean.starts_with('(') {
        return clean;
    }
    match clean.split_once('(') {
        Some((head, _)) => head.trim().to_string(),
        None => clean.trim().to_string(),
    }
}

// ---------------------------------------------------------------------------
// ProcessedSubstitution
// ---------------------------------------------------------------------------

/// A cleaned, classified substitution row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedSubstitution {
    pub hours: String,
    pub time: String,
    pub group: String,
    pub subject: String,
    pub room: String,
    pub teacher: String,
    #[serde(rename = "type")]
    pub kind: SubstitutionType,
    pub info: String,
}

impl ProcessedSubstitution {
    /// Leading hour number for sorting, or 999 when absent.
    pub fn sort_hour(&self) -> u32 {
        LEADING_NUMBER
            .captures(&self.hours)
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(UNKNOWN_HOUR_SORT_KEY)
    }
}

/// Clean and classify a single provider row.
pub fn process_row(row: &SubstitutionRow) -> ProcessedSubstitution {
    ProcessedSubstitution {
        hours: row.cell(0).to_string(),
        time: row.cell(1).to_string(),
        group: row.cell(2).to_string(),
        subject: strip_html(row.cell(3)),
        room: leading_token(row.cell(4)),
        teacher: leading_token(row.cell(5)),
        kind: extract_substitution_type(row),
        info: strip_html(row.cell(7)),
    }
}

/// Clean and classify every row of a provider response.
pub fn process_rows(rows: &[SubstitutionRow]) -> Vec<ProcessedSubstitution> {
    rows.iter().map(process_row).collect()
}

/// Sort by type priority, then hour ascending, then group.
pub fn sort_substitutions(substitutions: &mut [ProcessedSubstitution]) {
    substitutions.sort_by(|a, b| {
        a.kind
            .cmp(&b.kind)
            .then_with(|| a.sort_hour().cmp(&b.sort_hour()))
            .then_with(|| a.group.cmp(&b.group))
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_table_classification() {
        let cases = [
            ("Entfall", SubstitutionType::Entfall),
            ("Entfall wegen Krankheit", SubstitutionType::Entfall),
            ("Raumänderung", SubstitutionType::Raumaenderung),
            ("Raum", SubstitutionType::Raumaenderung),
            ("neuer Raum: A12", SubstitutionType::Raumaenderung),
            ("Vertretung", SubstitutionType::Vertretung),
            ("Verlegung", SubstitutionType::Verlegung),
            ("Verlegung von Mo", SubstitutionType::Verlegung),
            ("Sondereinsatz", SubstitutionType::Sondereinsatz),
            ("EVA", SubstitutionType::Eva),
            ("Klausur", SubstitutionType::Klausur),
            ("Freisetzung", SubstitutionType::Freisetzung),
            ("", SubstitutionType::Vertretung),
            ("  ", SubstitutionType::Vertretung),
            ("Betreuung", SubstitutionType::Sonstiges),
            ("Pausenaufsicht", SubstitutionType::Sonstiges),
        ];
        for (text, expected) in cases {
            assert_eq!(classify_type(text, false), expected, "text: {text:?}");
        }
    }

    #[test]
    fn classification_is_case_sensitive() {
        assert_eq!(classify_type("entfall", false), SubstitutionType::Sonstiges);
        assert_eq!(classify_type("eva", false), SubstitutionType::Sonstiges);
    }

    #[test]
    fn raum_must_be_a_whole_word() {
        assert_eq!(classify_type("Raumplan", false), SubstitutionType::Sonstiges);
    }

    #[test]
    fn cancel_style_wins_over_text() {
        assert_eq!(classify_type("Verlegung", true), SubstitutionType::Entfall);

        let mut row = SubstitutionRow::from_cells(["1", "", "10A", "MAT", "", "", "Vertretung", ""]);
        row.cell_classes
            .insert("subject".into(), vec!["cancelStyle".into()]);
        assert_eq!(extract_substitution_type(&row), SubstitutionType::Entfall);
    }

    #[test]
    fn priority_is_a_total_order() {
        let priorities: Vec<u8> = SubstitutionType::ALL.iter().map(|t| t.priority()).collect();
        assert_eq!(priorities, (0..9).collect::<Vec<u8>>());
        assert!(SubstitutionType::Entfall < SubstitutionType::Vertretung);
        assert!(SubstitutionType::Verlegung < SubstitutionType::Freisetzung);
        assert_eq!(SubstitutionType::ALL.last(), Some(&SubstitutionType::Sonstiges));
    }

    #[test]
    fn strips_tags_and_entities() {
        assert_eq!(strip_html("<span class=\"x\">Mathe</span>"), "Mathe");
        assert_eq!(strip_html("Fr&uuml;h &amp; Sp&auml;t"), "Früh & Spät");
    }

    #[test]
    fn process_row_extracts_cells() {
        let row = SubstitutionRow::from_cells([
            "1 - 2",
            "07:45-09:15",
            "10A",
            "<b>MAT</b>",
            "A101 (B202)",
            "ABC (XYZ)",
            "Raumänderung",
            "bitte &quot;pünktlich&quot;",
        ]);
        let processed = process_row(&row);
        assert_eq!(processed.hours, "1 - 2");
        assert_eq!(processed.subject, "MAT");
        assert_eq!(processed.room, "A101");
        assert_eq!(processed.teacher, "ABC");
        assert_eq!(processed.kind, SubstitutionType::Raumaenderung);
        assert_eq!(processed.info, "bitte \"pünktlich\"");
    }

    #[test]
    fn short_rows_do_not_panic() {
        let processed = process_row(&SubstitutionRow::from_cells(["3"]));
        assert_eq!(processed.hours, "3");
        assert_eq!(processed.teacher, "");
        assert_eq!(processed.kind, SubstitutionType::Vertretung);
    }

    #[test]
    fn sorts_by_priority_then_hour() {
        let mut subs = process_rows(&[
            SubstitutionRow::from_cells(["5", "", "9B", "DE", "", "", "Vertretung", ""]),
            SubstitutionRow::from_cells(["3", "", "9B", "EN", "", "", "Entfall", ""]),
            SubstitutionRow::from_cells(["1", "", "9B", "BIO", "", "", "Vertretung", ""]),
            SubstitutionRow::from_cells(["", "", "9B", "KU", "", "", "Entfall", ""]),
        ]);
        sort_substitutions(&mut subs);
        let order: Vec<&str> = subs.iter().map(|s| s.subject.as_str()).collect();
        assert_eq!(order, vec!["EN", "KU", "BIO", "DE"]);
    }

    #[test]
    fn unrecognised_types_sort_last() {
        let mut subs = process_rows(&[
            SubstitutionRow::from_cells(["1", "", "9B", "SP", "", "", "Betreuung", ""]),
            SubstitutionRow::from_cells(["6", "", "9B", "DE", "", "", "Verlegung", ""]),
            SubstitutionRow::from_cells(["4", "", "9B", "EN", "", "", "Vertretung", ""]),
            SubstitutionRow::from_cells(["2", "", "9B", "MU", "", "", "Entfall", ""]),
        ]);
        sort_substitutions(&mut subs);
        let order: Vec<(SubstitutionType, &str)> = subs
            .iter()
            .map(|s| (s.kind, s.subject.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (SubstitutionType::Entfall, "MU"),
                (SubstitutionType::Vertretung, "EN"),
                (SubstitutionType::Verlegung, "DE"),
                (SubstitutionType::Sonstiges, "SP"),
            ]
        );
    }

    #[test]
    fn row_deserializes_provider_json() {
        let json = serde_json::json!({
            "data": ["1", "07:45", "10A", "MAT", "A101", "ABC", "Entfall", ""],
            "group": "10A",
            "cellClasses": { "3": ["cancelStyle"] }
        });
        let row: SubstitutionRow = serde_json::from_value(json).unwrap();
        assert_eq!(row.data.len(), 8);
        assert!(row.has_cancel_style());
    }
}
