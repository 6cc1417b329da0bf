use serde::Deserialize;
use thiserror::Error;

/// The Jira custom fields the sync reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    GitHubId,
    GitHubNumber,
    GitHubLabels,
    GitHubStatus,
    GitHubReporter,
    LastSync,
}

impl FieldKey {
    pub const ALL: [FieldKey; 6] = [
        FieldKey::GitHubId,
        FieldKey::GitHubNumber,
        FieldKey::GitHubLabels,
        FieldKey::GitHubStatus,
        FieldKey::GitHubReporter,
        FieldKey::LastSync,
    ];

    /// Name the field must carry in the Jira project.
    pub fn field_name(&self) -> &'static str {
        match self {
            FieldKey::GitHubId => "github-id",
            FieldKey::GitHubNumber => "github-number",
            FieldKey::GitHubLabels => "github-labels",
            FieldKey::GitHubStatus => "github-status",
            FieldKey::GitHubReporter => "github-reporter",
            FieldKey::LastSync => "github-last-sync",
        }
    }
}

/// One entry of Jira's `/rest/api/2/field` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMeta {
    pub name: String,
    #[serde(default)]
    pub schema: Option<FieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    #[serde(default)]
    pub custom_id: Option<i64>,
}

#[derive(Debug, Error, PartialEq)]
#[error("could not find custom field '{0}'; check that it is named correctly")]
pub struct MissingFieldError(pub &'static str);

/// Custom field IDs discovered on the target project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIds {
    ids: [String; 6],
}

impl FieldIds {
    pub fn resolve(fields: &[FieldMeta]) -> Result<Self, MissingFieldError> {
        let mut ids: [String; 6] = Default::default();
        for (slot, key) in ids.iter_mut().zip(FieldKey::ALL) {
            let custom_id = fields
                .iter()
                .filter(|f| f.name == key.field_name())
                .find_map(|f| f.schema.as_ref().and_then(|s| s.custom_id))
                .ok_or(MissingFieldError(key.field_name()))?;
            *slot = custom_id.to_string();
        }
        Ok(Self { ids })
    }

    /// Build directly from numeric IDs, in `FieldKey::ALL` order.
    pub fn from_ids(ids: [i64; 6]) -> Self {
        Self {
            ids: ids.map(|id| id.to_string()),
        }
    }

    fn index(key: FieldKey) -> usize {
        FieldKey::ALL
            .iter()
            .position(|k| *k == key)
            .unwrap_or_default()
    }

    /// Bare numeric ID, as used in JQL `cf[<N>]`.
    pub fn id(&self, key: FieldKey) -> &str {
        &self.ids[Self::index(key)]
    }

    /// Field key as it appears in issue payloads: `customfield_<N>`.
    pub fn key(&self, key: FieldKey) -> String {
        format!("customfield_{}", self.id(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, custom_id: Option<i64>) -> FieldMeta {
        FieldMeta {
            name: name.to_string(),
            schema: Some(FieldSchema { custom_id }),
        }
    }

    fn all_fields() -> Vec<FieldMeta> {
        vec![
            meta("Summary", None),
            meta("github-id", Some(10001)),
            meta("github-number", Some(10002)),
            meta("github-labels", Some(10003)),
            meta("github-status", Some(10004)),
            meta("github-reporter", Some(10005)),
            meta("github-last-sync", Some(10006)),
        ]
    }

    #[test]
    fn resolves_every_tracked_field() {
        let ids = FieldIds::resolve(&all_fields()).unwrap();
        assert_eq!(ids.id(FieldKey::GitHubId), "10001");
        assert_eq!(ids.key(FieldKey::GitHubReporter), "customfield_10005");
        assert_eq!(ids.key(FieldKey::LastSync), "customfield_10006");
    }

    #[test]
    fn missing_field_is_named_in_error() {
        let fields: Vec<_> = all_fields()
            .into_iter()
            .filter(|f| f.name != "github-status")
            .collect();
        let err = FieldIds::resolve(&fields).unwrap_err();
        assert_eq!(err, MissingFieldError("github-status"));
        assert!(err.to_string().contains("github-status"));
    }

    #[test]
    fn field_without_custom_id_does_not_count() {
        let mut fields = all_fields();
        fields[1] = meta("github-id", None);
        assert!(FieldIds::resolve(&fields).is_err());
    }

    #[test]
    fn from_ids_matches_resolve_order() {
        let ids = FieldIds::from_ids([10001, 10002, 10003, 10004, 10005, 10006]);
        assert_eq!(ids, FieldIds::resolve(&all_fields()).unwrap());
    }
}
