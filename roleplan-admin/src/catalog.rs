use std::{collections::HashSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::AdminError;

/// One allocatable role: the flat field the admin UI edits and the role key
/// the backend stores fractions under.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleMapping {
    pub field: String,
    pub role: String,
}

/// Ordered set of roles that drives both directions of the tier conversion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoleCatalog {
    entries: Vec<RoleMapping>,
}

const BUILTIN_ROLES: [(&str, &str); 13] = [
    ("pm1", "PM USA"),
    ("pm2", "PM India"),
    ("architect", "Architect USA"),
    ("srDeliveryLead", "Sr. Delivery Lead India"),
    ("deliveryLead", "Delivery Lead India"),
    ("appLead1", "App Lead USA"),
    ("appLead2", "App Lead India"),
    ("appDeveloper1", "App Developer USA"),
    ("appDeveloper2", "App Developer India"),
    ("integrationLead", "Integration Lead USA"),
    ("integrationDeveloper", "Integration Developer India"),
    ("reportingLead", "Reporting Lead India"),
    ("securityLead", "Security Lead India"),
];

impl Default for RoleCatalog {
    fn default() -> Self {
        Self {
            entries: BUILTIN_ROLES
                .iter()
                .map(|(field, role)| RoleMapping {
                    field: field.to_string(),
                    role: role.to_string(),
                })
                .collect(),
        }
    }
}

impl RoleCatalog {
    pub fn new(entries: Vec<RoleMapping>) -> Result<Self, AdminError> {
        if entries.is_empty() {
            return Err(AdminError::Catalog("catalog has no roles".to_string()));
        }
        let mut fields = HashSet::new();
        let mut roles = HashSet::new();
        for entry in &entries {
            if entry.field.trim().is_empty() || entry.role.trim().is_empty() {
                return Err(AdminError::Catalog(
                    "field and role names cannot be empty".to_string(),
                ));
            }
            if matches!(entry.field.as_str(), "activity" | "total_hours" | "subtasks") {
                return Err(AdminError::Catalog(format!(
                    "field '{}' collides with a tier row attribute",
                    entry.field
                )));
            }
            if !fields.insert(entry.field.as_str()) {
                return Err(AdminError::Catalog(format!(
                    "duplicate field '{}'",
                    entry.field
                )));
            }
            if !roles.insert(entry.role.as_str()) {
                return Err(AdminError::Catalog(format!("duplicate role '{}'", entry.role)));
            }
        }
        Ok(Self { entries })
    }

    /// Loads a JSON array of `{"field": ..., "role": ...}` objects.
    pub fn load(path: &Path) -> Result<Self, AdminError> {
        let bytes = fs::read(path).map_err(|err| AdminError::io("read", path, err))?;
        let entries = serde_json::from_slice::<Vec<RoleMapping>>(&bytes)
            .map_err(|err| AdminError::Catalog(format!("{}: {err}", path.display())))?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[RoleMapping] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_has_thirteen_unique_roles() {
        let catalog = RoleCatalog::default();
        assert_eq!(catalog.len(), 13);
        assert!(RoleCatalog::new(catalog.entries().to_vec()).is_ok());
        assert_eq!(catalog.entries()[0].role, "PM USA");
        assert_eq!(catalog.entries()[12].field, "securityLead");
    }

    #[test]
    fn duplicates_and_reserved_fields_are_rejected() {
        let mapping = |field: &str, role: &str| RoleMapping {
            field: field.to_string(),
            role: role.to_string(),
        };
        assert!(RoleCatalog::new(vec![mapping("a", "A"), mapping("a", "B")]).is_err());
        assert!(RoleCatalog::new(vec![mapping("a", "A"), mapping("b", "A")]).is_err());
        assert!(RoleCatalog::new(vec![mapping("activity", "A")]).is_err());
        assert!(RoleCatalog::new(Vec::new()).is_err());
    }

    #[test]
    fn catalog_loads_from_json_file() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("roles.json");
        fs::write(
            &path,
            r#"[{"field": "pm1", "role": "PM USA"}, {"field": "qaLead", "role": "QA Lead India"}]"#,
        )
        .expect("catalog should write");
        let catalog = RoleCatalog::load(&path).expect("catalog should load");
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[1].role, "QA Lead India");

        fs::write(&path, "{not json").expect("catalog should write");
        assert!(matches!(
            RoleCatalog::load(&path),
            Err(AdminError::Catalog(_))
        ));
    }
}
