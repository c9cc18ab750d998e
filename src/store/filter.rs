use uuid::Uuid;

use super::record::{parse_record_id, RecordError};

/// Tenant-scoped query filter. Every read and write goes through one of
/// these: the organization id is mandatory, the document id and project
/// slug are optional narrowing parameters from the request query string.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFilter {
    pub organization_id: Uuid,
    pub id: Option<Uuid>,
    pub project_slug: Option<String>,
}

impl RecordFilter {
    /// The full organization-scoped set
    pub fn organization(organization_id: Uuid) -> Self {
        Self {
            organization_id,
            id: None,
            project_slug: None,
        }
    }

    /// Build from request query parameters. A malformed `id` is a client
    /// error surfaced to the caller, not an unhandled failure.
    pub fn from_params(
        organization_id: Uuid,
        id: Option<&str>,
        slug: Option<String>,
    ) -> Result<Self, RecordError> {
        let id = id.map(parse_record_id).transpose()?;
        let project_slug = slug.filter(|s| !s.is_empty());

        Ok(Self {
            organization_id,
            id,
            project_slug,
        })
    }

    /// Render the WHERE conditions for this filter, numbering bind
    /// placeholders from `first_param`. Bind order matches condition
    /// order: organization id, then id, then project slug.
    pub fn where_sql(&self, first_param: usize) -> String {
        let mut conditions = vec![format!("organization_id = ${}", first_param)];
        let mut next = first_param + 1;

        if self.id.is_some() {
            conditions.push(format!("id = ${}", next));
            next += 1;
        }
        if self.project_slug.is_some() {
            conditions.push(format!("project_slug = ${}", next));
        }

        conditions.join(" AND ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_full_organization_scope() {
        let org = Uuid::new_v4();
        let filter = RecordFilter::from_params(org, None, None).unwrap();
        assert_eq!(filter, RecordFilter::organization(org));
        assert_eq!(filter.where_sql(2), "organization_id = $2");
    }

    #[test]
    fn narrows_by_id_and_slug() {
        let org = Uuid::new_v4();
        let id = Uuid::new_v4();
        let filter = RecordFilter::from_params(
            org,
            Some(&id.to_string()),
            Some("apollo".to_string()),
        )
        .unwrap();

        assert_eq!(filter.id, Some(id));
        assert_eq!(filter.project_slug.as_deref(), Some("apollo"));
        assert_eq!(
            filter.where_sql(2),
            "organization_id = $2 AND id = $3 AND project_slug = $4"
        );
    }

    #[test]
    fn malformed_id_is_a_client_error() {
        let err = RecordFilter::from_params(Uuid::new_v4(), Some("oid-12345"), None);
        assert!(matches!(err, Err(RecordError::InvalidId(_))));
    }

    #[test]
    fn empty_slug_is_ignored() {
        let filter =
            RecordFilter::from_params(Uuid::new_v4(), None, Some(String::new())).unwrap();
        assert!(filter.project_slug.is_none());
    }
}
