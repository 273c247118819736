use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a dump table, keyed by cleaned column name. `None` is the
/// normalized form of the dump's `"N"` sentinel; columns missing from a
/// short row are simply absent from the map.
pub type Row = BTreeMap<String, Option<String>>;

/// One person attached to a company: their merged attribute fields plus
/// every relationship row linking them to that company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonRecord {
    #[serde(flatten)]
    pub fields: Row,
    pub roles: Vec<Row>,
}

/// The output unit: one of these per qualifying company, one JSON line each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company: Row,
    pub people: Vec<PersonRecord>,
    pub funding_rounds: Vec<Row>,
}
