//! Parameter processor
//!
//! Turns raw query-string pairs into a [`QueryModel`].
//!
//! ```text
//! ?sort_by=asc(lastName),desc(id)&limit=20&offset=40
//! &email[like]=example.com
//! &[or]price[lt]=10
//! &createdAt[gte]=2024-01-01[and]createdAt[lt]=2024-02-01
//! ```
//!
//! Parsing never fails. Anything the grammar does not recognise degrades to
//! the most literal reading: an unknown operator suffix makes the whole key an
//! equality property, an unparsable `limit` is ignored, a chained segment
//! without `=` is dropped.

use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use regex::Regex;
use tracing::debug;

use crate::model::{
    ColumnFilter, ColumnFilterList, Conjunctive, FilterOperator, FilterValue, QueryModel,
    SortDirection, SortEntry,
};

pub const SORT_KEY: &str = "sort_by";
pub const LIMIT_KEY: &str = "limit";
pub const OFFSET_KEY: &str = "offset";

const OR_MARKER: &str = "[or]";
const AND_MARKER: &str = "[and]";

static SORT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\(([^)]*)\)").unwrap());

static INTEGER_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());

static ISO_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}$").unwrap());

static ISO_DATE_TIME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}[T ]\d{1,2}:\d{2}").unwrap());

static US_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}[-/]\d{1,2}[-/]\d{4}$").unwrap());

static SLASH_DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}/\d{1,2}/\d{1,2}$").unwrap());

const LOCAL_DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const US_DATE_FORMATS: &[&str] = &["%m-%d-%Y", "%m/%d/%Y"];

/// Parses query-string pairs into a [`QueryModel`]
#[derive(Debug, Clone)]
pub struct ParameterProcessor {
    /// Offset applied to dates and date-times that carry no zone
    reference_offset: FixedOffset,
}

impl Default for ParameterProcessor {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl ParameterProcessor {
    pub fn new(reference_offset: FixedOffset) -> Self {
        Self { reference_offset }
    }

    pub fn reference_offset(&self) -> FixedOffset {
        self.reference_offset
    }

    /// Build a model from ordered `(key, value)` pairs
    pub fn process<I, K, V>(&self, params: I) -> QueryModel
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut model = QueryModel::new();

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key {
                SORT_KEY => model.sort_list.extend(parse_sort(value)),
                LIMIT_KEY => {
                    if let Some(limit) = parse_count(LIMIT_KEY, value) {
                        model.limit = Some(limit);
                    }
                }
                OFFSET_KEY => {
                    if let Some(offset) = parse_count(OFFSET_KEY, value) {
                        model.offset = Some(offset);
                    }
                }
                _ => model.filter_list.push(self.parse_group(key, value)),
            }
        }

        propagate_or(&mut model.filter_list, |group| &mut group.conjunctive);
        model
    }

    /// One filter group per key: the primary filter plus any chained ones
    fn parse_group(&self, key: &str, value: &str) -> ColumnFilterList {
        let (group_conjunctive, key) = split_group_prefix(key);
        let (property, operator) = parse_property(key);
        let (primary, chained) = split_chain(value);

        let mut filters = vec![ColumnFilter::new(
            property,
            operator,
            self.coerce(primary),
            Conjunctive::And,
        )];

        for (conjunctive, segment) in chained {
            let Some((chained_key, chained_value)) = segment.split_once('=') else {
                debug!(segment, "dropping chained filter without '='");
                continue;
            };
            let (property, operator) = parse_property(chained_key);
            filters.push(ColumnFilter::new(
                property,
                operator,
                self.coerce(chained_value),
                conjunctive,
            ));
        }

        propagate_or(&mut filters, |filter| &mut filter.conjunctive);
        ColumnFilterList::new(group_conjunctive, filters)
    }

    /// Integer, then date, then text
    pub fn coerce(&self, raw: &str) -> FilterValue {
        if INTEGER_PATTERN.is_match(raw) {
            return match raw.parse::<i64>() {
                Ok(i) => FilterValue::Integer(i),
                Err(_) => FilterValue::text(raw),
            };
        }
        match self.parse_date(raw) {
            Some(date) => FilterValue::Date(date),
            None => FilterValue::text(raw),
        }
    }

    fn parse_date(&self, raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
            return Some(date.with_timezone(&Utc));
        }

        // Bare ISO dates are read as UTC midnight
        if ISO_DATE_PATTERN.is_match(raw) {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }

        if ISO_DATE_TIME_PATTERN.is_match(raw) {
            return LOCAL_DATE_TIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .and_then(|naive| self.localize(naive));
        }

        if US_DATE_PATTERN.is_match(raw) {
            return US_DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
                .and_then(|date| self.localize(date.and_hms_opt(0, 0, 0)?));
        }

        if SLASH_DATE_PATTERN.is_match(raw) {
            let date = NaiveDate::parse_from_str(raw, "%Y/%m/%d").ok()?;
            return self.localize(date.and_hms_opt(0, 0, 0)?);
        }

        None
    }

    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.reference_offset
            .from_local_datetime(&naive)
            .single()
            .map(|local| local.with_timezone(&Utc))
    }
}

/// Strip a leading `[or]` / `[and]` group marker from a key
fn split_group_prefix(key: &str) -> (Conjunctive, &str) {
    if let Some(rest) = key.strip_prefix(OR_MARKER) {
        (Conjunctive::Or, rest)
    } else if let Some(rest) = key.strip_prefix(AND_MARKER) {
        (Conjunctive::And, rest)
    } else {
        (Conjunctive::And, key)
    }
}

/// `name[op]` -> (name, op); anything malformed is a literal EQ property
fn parse_property(key: &str) -> (String, FilterOperator) {
    if let Some((name, suffix)) = key
        .strip_suffix(']')
        .and_then(|stripped| stripped.rsplit_once('['))
    {
        if !name.is_empty() && !name.contains(['[', ']']) {
            if let Some(operator) = FilterOperator::from_suffix(suffix) {
                return (name.to_string(), operator);
            }
        }
    }
    (key.to_string(), FilterOperator::Eq)
}

/// Split a value at its `[and]` / `[or]` markers, in string order
fn split_chain(value: &str) -> (&str, Vec<(Conjunctive, &str)>) {
    let mut markers: Vec<(usize, usize, Conjunctive)> = value
        .match_indices(AND_MARKER)
        .map(|(index, marker)| (index, marker.len(), Conjunctive::And))
        .chain(
            value
                .match_indices(OR_MARKER)
                .map(|(index, marker)| (index, marker.len(), Conjunctive::Or)),
        )
        .collect();

    let Some(first) = markers.iter().map(|m| m.0).min() else {
        return (value, Vec::new());
    };
    markers.sort_by_key(|m| m.0);

    let segments = markers
        .iter()
        .enumerate()
        .map(|(i, &(index, len, conjunctive))| {
            let end = markers.get(i + 1).map(|m| m.0).unwrap_or(value.len());
            (conjunctive, &value[index + len..end])
        })
        .collect();

    (&value[..first], segments)
}

/// An OR entry turns its immediate predecessor into OR as well
fn propagate_or<T>(items: &mut [T], conjunctive: impl Fn(&mut T) -> &mut Conjunctive) {
    for i in 1..items.len() {
        if *conjunctive(&mut items[i]) == Conjunctive::Or {
            *conjunctive(&mut items[i - 1]) = Conjunctive::Or;
        }
    }
}

fn parse_sort(value: &str) -> Vec<SortEntry> {
    SORT_PATTERN
        .captures_iter(value)
        .filter_map(|captures| {
            let method = captures.get(1)?.as_str();
            let Some(direction) = SortDirection::parse(method) else {
                debug!(method, "ignoring unknown sort method");
                return None;
            };
            let fields: Vec<String> = captures
                .get(2)?
                .as_str()
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty())
                .map(str::to_string)
                .collect();
            (!fields.is_empty()).then(|| SortEntry::new(direction, fields))
        })
        .collect()
}

fn parse_count(key: &str, value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(count) => Some(count),
        Err(_) => {
            debug!(key, value, "ignoring unparsable pagination parameter");
            None
        }
    }
}
