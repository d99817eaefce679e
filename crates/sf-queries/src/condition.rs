//! Condition builder
//!
//! Compiles a [`QueryModel`] into a backend-neutral boolean tree. A group
//! node holds an `$and` bucket and an `$or` bucket; it is satisfied when
//! every `$and` member holds and, if the `$or` bucket is non-empty, at least
//! one `$or` member holds. Leaves compare one property against one value.
//!
//! Serialized form:
//!
//! ```json
//! { "$and": [ { "id": { "$eq": [5] } } ] }
//! ```

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::model::{ColumnFilter, ColumnFilterList, Conjunctive, FilterOperator, FilterValue, QueryModel};

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Group {
        and: Vec<Condition>,
        or: Vec<Condition>,
    },
    Compare {
        property: String,
        operator: FilterOperator,
        value: FilterValue,
    },
}

impl Default for Condition {
    fn default() -> Self {
        Self::empty()
    }
}

impl Condition {
    /// The match-everything condition, serialized as `{}`
    pub fn empty() -> Self {
        Self::Group {
            and: Vec::new(),
            or: Vec::new(),
        }
    }

    pub fn compare(
        property: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self::Compare {
            property: property.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Group { and, or } => and.is_empty() && or.is_empty(),
            Self::Compare { .. } => false,
        }
    }
}

/// Build the condition tree for a model's filter groups
pub fn build_conditions(model: &QueryModel) -> Condition {
    let mut and = Vec::new();
    let mut or = Vec::new();

    for group in &model.filter_list {
        let Some(expression) = group_expression(group) else {
            continue;
        };
        match group.conjunctive {
            Conjunctive::And => and.push(expression),
            Conjunctive::Or => or.push(expression),
        }
    }

    Condition::Group { and, or }
}

fn group_expression(group: &ColumnFilterList) -> Option<Condition> {
    match group.filters.as_slice() {
        [] => None,
        [single] => Some(leaf(single)),
        filters => {
            let mut and = Vec::new();
            let mut or = Vec::new();
            for filter in filters {
                match filter.conjunctive {
                    Conjunctive::And => and.push(leaf(filter)),
                    Conjunctive::Or => or.push(leaf(filter)),
                }
            }
            Some(Condition::Group { and, or })
        }
    }
}

fn leaf(filter: &ColumnFilter) -> Condition {
    let value = match filter.operator {
        FilterOperator::Like => FilterValue::Text(format!("%{}%", filter.value.as_text())),
        _ => filter.value.clone(),
    };
    Condition::Compare {
        property: filter.property.clone(),
        operator: filter.operator,
        value,
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Group { and, or } => {
                let len = usize::from(!and.is_empty()) + usize::from(!or.is_empty());
                let mut map = serializer.serialize_map(Some(len))?;
                if !and.is_empty() {
                    map.serialize_entry("$and", and)?;
                }
                if !or.is_empty() {
                    map.serialize_entry("$or", or)?;
                }
                map.end()
            }
            Self::Compare {
                property,
                operator,
                value,
            } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(property, &OperatorEntry { operator: *operator, value })?;
                map.end()
            }
        }
    }
}

struct OperatorEntry<'a> {
    operator: FilterOperator,
    value: &'a FilterValue,
}

impl Serialize for OperatorEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.operator.condition_key(), &[self.value])?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParameterProcessor;
    use serde_json::json;

    fn conditions_for(params: &[(&str, &str)]) -> serde_json::Value {
        let model = ParameterProcessor::default().process(params.iter().copied());
        serde_json::to_value(build_conditions(&model)).unwrap()
    }

    #[test]
    fn test_empty_model_matches_everything() {
        let condition = build_conditions(&QueryModel::new());
        assert!(condition.is_empty());
        assert_eq!(serde_json::to_value(&condition).unwrap(), json!({}));
    }

    #[test]
    fn test_primary_id() {
        let mut model = QueryModel::new();
        model.set_primary_id(5);

        assert_eq!(
            serde_json::to_value(build_conditions(&model)).unwrap(),
            json!({ "$and": [ { "id": { "$eq": [5] } } ] })
        );
    }

    #[test]
    fn test_and_groups() {
        assert_eq!(
            conditions_for(&[("name", "desk"), ("price[lt]", "100")]),
            json!({
                "$and": [
                    { "name": { "$eq": ["desk"] } },
                    { "price": { "$lt": [100] } }
                ]
            })
        );
    }

    #[test]
    fn test_or_group_pulls_previous_into_or_bucket() {
        assert_eq!(
            conditions_for(&[("sku", "A1"), ("name", "desk"), ("[or]name", "chair")]),
            json!({
                "$and": [ { "sku": { "$eq": ["A1"] } } ],
                "$or": [
                    { "name": { "$eq": ["desk"] } },
                    { "name": { "$eq": ["chair"] } }
                ]
            })
        );
    }

    #[test]
    fn test_chained_filters_form_nested_group() {
        assert_eq!(
            conditions_for(&[("email[gte]", "a[or]age[lte]=25")]),
            json!({
                "$and": [
                    {
                        "$or": [
                            { "email": { "$gte": ["a"] } },
                            { "age": { "$lte": [25] } }
                        ]
                    }
                ]
            })
        );
    }

    #[test]
    fn test_like_wraps_value() {
        assert_eq!(
            conditions_for(&[("name[like]", "oak")]),
            json!({ "$and": [ { "name": { "$like": ["%oak%"] } } ] })
        );
        assert_eq!(
            conditions_for(&[("sku[like]", "42")]),
            json!({ "$and": [ { "sku": { "$like": ["%42%"] } } ] })
        );
    }

    #[test]
    fn test_dates_serialize_as_iso_strings() {
        assert_eq!(
            conditions_for(&[("createdAt[gte]", "2024-01-01")]),
            json!({ "$and": [ { "createdAt": { "$gte": ["2024-01-01T00:00:00.000Z"] } } ] })
        );
    }
}
