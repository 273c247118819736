use std::collections::{HashMap, HashSet};

use crate::config::DatasetConfig;
use crate::error::Result;
use crate::table::{convert_empty_fields, field, Table};
use crate::types::{PersonRecord, Row};

const COMPANY_COL: &str = "relationship_object_id";
const PERSON_COL: &str = "person_object_id";

/// Role rows for everyone attached to `company_id`, bucketed by person id.
/// Both the bucket contents and the id sequence keep the order the
/// relationships file presents them in. A company with no relationships
/// yields empty results.
pub fn collect_roles(
    config: &DatasetConfig,
    company_id: &str,
) -> Result<(Vec<String>, HashMap<String, Vec<Row>>)> {
    let mut table = Table::open(&config.relationships_path(), &[COMPANY_COL, PERSON_COL])?;
    let mut person_ids: Vec<String> = Vec::new();
    let mut roles: HashMap<String, Vec<Row>> = HashMap::new();
    for row in table.rows() {
        let mut row = row?;
        if field(&row, COMPANY_COL) != Some(company_id) {
            continue;
        }
        let person_id = match field(&row, PERSON_COL) {
            Some(id) => id.to_string(),
            None => continue,
        };
        // Internal row identifiers carry no meaning once the rows sit in
        // the bucket of the person they belong to.
        row.remove("id");
        row.remove("relationship_id");
        convert_empty_fields(&mut row);
        match roles.get_mut(&person_id) {
            Some(bucket) => bucket.push(row),
            None => {
                roles.insert(person_id.clone(), vec![row]);
                person_ids.push(person_id);
            }
        }
    }
    Ok((person_ids, roles))
}

/// Fetch the requested people's rows from the generic entity table, keyed
/// by `id`. Fields come back as the table has them.
pub fn people_from_entity_table(
    config: &DatasetConfig,
    ids: &[String],
) -> Result<HashMap<String, Row>> {
    let table = Table::open(&config.objects_path(), &["id"])?;
    lookup_rows(table, "id", ids, false)
}

/// Fetch the requested people's rows from the people table, keyed by
/// `object_id`. The `id`/`object_id` columns are dropped from the result
/// since they are redundant with the key the caller already holds.
pub fn people_from_people_table(
    config: &DatasetConfig,
    ids: &[String],
) -> Result<HashMap<String, Row>> {
    let table = Table::open(&config.people_path(), &["object_id"])?;
    lookup_rows(table, "object_id", ids, true)
}

/// One linear scan for a small id set, stopping as soon as every id has
/// been seen. Ids the scan never finds each get their own null-filled row
/// (nothing shared between two missing people) with the id preserved.
fn lookup_rows(
    mut table: Table,
    key_col: &str,
    ids: &[String],
    strip_keys: bool,
) -> Result<HashMap<String, Row>> {
    let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let headers: Vec<String> = table.headers().to_vec();
    let mut found: HashMap<String, Row> = HashMap::new();
    for row in table.rows() {
        let mut row = row?;
        let key = match field(&row, key_col) {
            Some(key) => key.to_string(),
            None => continue,
        };
        if !wanted.contains(key.as_str()) || found.contains_key(&key) {
            continue;
        }
        if strip_keys {
            row.remove("id");
            row.remove("object_id");
        }
        found.insert(key, row);
        if found.len() == wanted.len() {
            break;
        }
    }
    for id in ids {
        if !found.contains_key(id) {
            found.insert(id.clone(), placeholder_row(&headers, id, strip_keys));
        }
    }
    Ok(found)
}

fn placeholder_row(headers: &[String], id: &str, strip_keys: bool) -> Row {
    let mut row: Row = headers.iter().map(|h| (h.clone(), None)).collect();
    if strip_keys {
        row.remove("id");
        row.remove("object_id");
    }
    row.insert("id".to_string(), Some(id.to_string()));
    row
}

/// Everyone related to `company_id`: one record per distinct person in
/// first-seen order, merging the entity table's fields with the people
/// table's (people-table fields win on collision) and attaching every role
/// row between that person and the company.
pub fn people_for_company(config: &DatasetConfig, company_id: &str) -> Result<Vec<PersonRecord>> {
    let (person_ids, mut roles) = collect_roles(config, company_id)?;
    if person_ids.is_empty() {
        return Ok(Vec::new());
    }
    let generic = people_from_entity_table(config, &person_ids)?;
    let specific = people_from_people_table(config, &person_ids)?;

    let mut people = Vec::with_capacity(person_ids.len());
    for id in &person_ids {
        let mut fields = generic.get(id).cloned().unwrap_or_default();
        if let Some(extra) = specific.get(id) {
            fields.extend(extra.clone());
        }
        people.push(PersonRecord {
            fields,
            roles: roles.remove(id).unwrap_or_default(),
        });
    }
    Ok(people)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::field;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, DatasetConfig) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("objects.csv"),
            "id,entity_type,name,category_code\n\
             c:1,Company,Wetpaint,web\n\
             p:2,Person,Ian Wetherell,N\n\
             p:3,Person,Chris Lunt,N\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("people.csv"),
            "id,object_id,first_name,last_name,birthplace\n\
             10,p:2,Ian,Wetherell,Seattle\n\
             11,p:4,Ghost,Only,N\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("relationships.csv"),
            "'id','relationship_id','person_object_id','relationship_object_id','title'\n\
             1,1,p:2,c:1,CEO\n\
             2,2,p:2,c:1,Board Member\n\
             3,3,p:3,c:1,N\n\
             4,4,p:4,c:1,Advisor\n\
             5,5,p:5,c:1,Advisor\n",
        )
        .unwrap();
        fs::write(dir.path().join("funding_rounds.csv"), "id,object_id,raised_amount_usd\n").unwrap();
        let config = DatasetConfig {
            data_dir: dir.path().to_path_buf(),
            ..DatasetConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn roles_bucket_in_encounter_order() {
        let (_dir, config) = fixture();
        let (ids, roles) = collect_roles(&config, "c:1").unwrap();
        assert_eq!(ids, ["p:2", "p:3", "p:4", "p:5"]);
        let p2 = &roles["p:2"];
        assert_eq!(p2.len(), 2);
        assert_eq!(field(&p2[0], "title"), Some("CEO"));
        assert_eq!(field(&p2[1], "title"), Some("Board Member"));
        // Internal identifiers are stripped, sentinel titles are nulled.
        assert!(!p2[0].contains_key("id"));
        assert!(!p2[0].contains_key("relationship_id"));
        assert_eq!(field(&roles["p:3"][0], "title"), None);
    }

    #[test]
    fn no_relationships_is_empty_not_an_error() {
        let (_dir, config) = fixture();
        let (ids, roles) = collect_roles(&config, "c:42").unwrap();
        assert!(ids.is_empty());
        assert!(roles.is_empty());
        assert!(people_for_company(&config, "c:42").unwrap().is_empty());
    }

    #[test]
    fn person_table_fields_win_on_merge() {
        let (_dir, config) = fixture();
        let people = people_for_company(&config, "c:1").unwrap();
        let p2 = &people[0];
        // Generic-table fields survive, people-table fields are layered on.
        assert_eq!(field(&p2.fields, "entity_type"), Some("Person"));
        assert_eq!(field(&p2.fields, "first_name"), Some("Ian"));
        // The people table's own key columns are redundant and dropped.
        assert_eq!(field(&p2.fields, "id"), Some("p:2"));
        assert!(!p2.fields.contains_key("object_id"));
    }

    #[test]
    fn person_only_in_people_table_gets_null_generic_fields() {
        let (_dir, config) = fixture();
        let people = people_for_company(&config, "c:1").unwrap();
        let p4 = &people[2];
        assert_eq!(field(&p4.fields, "id"), Some("p:4"));
        assert_eq!(field(&p4.fields, "entity_type"), None);
        assert_eq!(field(&p4.fields, "name"), None);
        assert_eq!(field(&p4.fields, "first_name"), Some("Ghost"));
    }

    #[test]
    fn missing_people_get_independent_placeholders() {
        let (_dir, config) = fixture();
        let ids = vec!["p:900".to_string(), "p:901".to_string()];
        let found = people_from_entity_table(&config, &ids).unwrap();
        let a = &found["p:900"];
        let b = &found["p:901"];
        assert_eq!(field(a, "id"), Some("p:900"));
        assert_eq!(field(b, "id"), Some("p:901"));
        assert_eq!(field(a, "entity_type"), None);
        // Two missing ids must never alias to one shared record.
        assert_ne!(a, b);
    }

    #[test]
    fn finds_every_requested_entity_row() {
        let (_dir, config) = fixture();
        let ids = vec!["p:2".to_string(), "p:3".to_string()];
        let found = people_from_entity_table(&config, &ids).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(field(&found["p:3"], "name"), Some("Chris Lunt"));
    }
}
