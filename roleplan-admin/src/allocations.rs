use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{SecondsFormat, Utc};
use literal::{Bracket, LocateError, RenderStyle, extract_located, locate, render_assignment};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::{
    adapter::{
        self, AVAILABLE_ROLES, EFFORT_TEMPLATE, RoleDescriptor, RoleInput, TIER_THRESHOLDS,
        TIERS_DATA, TIERS_ROLES, TierRow, TierThreshold,
    },
    catalog::RoleCatalog,
    error::AdminError,
    staging::StagedWrites,
};

pub const BACKEND_DIR_NAME: &str = "Engagement_Scoping_backend";
pub const TEMPLATES_FILE: &str = "backend/data/excel_templates.py";
pub const CONFIG_FILE: &str = "backend/config.py";
pub const EFFORT_FILE: &str = "backend/data/effort_template.py";

const TIERS_STYLE: RenderStyle = RenderStyle::expanded();
const TIERS_ROLES_STYLE: RenderStyle = RenderStyle::expanded();
const THRESHOLDS_STYLE: RenderStyle = RenderStyle::expanded()
    .with_trailing_commas()
    .inline_from(1);
const AVAILABLE_ROLES_STYLE: RenderStyle = RenderStyle::expanded().with_trailing_commas();
const EFFORT_STYLE: RenderStyle = RenderStyle::expanded()
    .with_trailing_commas()
    .without_trailing_comma_at(1);

/// The three backend files this service edits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendPaths {
    pub templates: PathBuf,
    pub config: PathBuf,
    pub effort: PathBuf,
}

impl BackendPaths {
    pub fn under(root: &Path) -> Self {
        Self {
            templates: root.join(TEMPLATES_FILE),
            config: root.join(CONFIG_FILE),
            effort: root.join(EFFORT_FILE),
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoleAllocations {
    pub tier_data: Vec<TierRow>,
    pub available_roles: Vec<RoleDescriptor>,
    pub tier_thresholds: Vec<TierThreshold>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAllocationsRequest {
    pub tier_data: Vec<TierRow>,
    #[serde(default)]
    pub tier_thresholds: Option<Vec<TierThreshold>>,
    #[serde(default)]
    pub available_roles: Option<Vec<RoleInput>>,
    #[serde(default)]
    pub effort_data: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveSummary {
    pub role_allocations_updated: usize,
    pub effort_template_updated: usize,
    pub timestamp: String,
}

/// Reads tiers and roles from the templates file, thresholds from the config
/// file, and merges effort hours from the effort template.
///
/// Only the templates file is mandatory. Thresholds fall back to defaults and
/// effort data is skipped when their files cannot be read.
pub fn read_allocations(
    paths: &BackendPaths,
    catalog: &RoleCatalog,
) -> Result<RoleAllocations, AdminError> {
    info!(path = %paths.templates.display(), "reading excel templates");
    let templates = read_existing(&paths.templates, "Template file")?;

    let tiers = read_segment(&templates, &paths.templates, TIERS_DATA, Bracket::Square)?;
    let mut tier_data = adapter::tier_rows_from_backend(&tiers, catalog)?;
    let roles = read_segment(&templates, &paths.templates, TIERS_ROLES, Bracket::Square)?;
    let available_roles = adapter::roles_from_backend(&roles)?;

    let tier_thresholds = read_thresholds(&paths.config);
    merge_effort_file(&paths.effort, &mut tier_data);

    info!(
        tiers = tier_data.len(),
        roles = available_roles.len(),
        thresholds = tier_thresholds.len(),
        "read role allocations from backend"
    );
    Ok(RoleAllocations {
        tier_data,
        available_roles,
        tier_thresholds,
    })
}

fn read_thresholds(config_path: &Path) -> Vec<TierThreshold> {
    if !config_path.exists() {
        warn!(
            path = %config_path.display(),
            "config file not found, using default tier thresholds"
        );
        return adapter::default_thresholds();
    }
    let loaded = read_existing(config_path, "Config file").and_then(|config| {
        let value = read_segment(&config, config_path, TIER_THRESHOLDS, Bracket::Square)?;
        adapter::thresholds_from_backend(&value)
    });
    match loaded {
        Ok(thresholds) => {
            info!(count = thresholds.len(), "loaded TIER_THRESHOLDS from config");
            thresholds
        }
        Err(err) => {
            warn!(error = %err, "could not read TIER_THRESHOLDS from config, using defaults");
            adapter::default_thresholds()
        }
    }
}

fn merge_effort_file(effort_path: &Path, tier_data: &mut [TierRow]) {
    if !effort_path.exists() {
        warn!(
            path = %effort_path.display(),
            "effort template not found, tiers carry no subtasks"
        );
        return;
    }
    let merged = read_existing(effort_path, "Effort template file").and_then(|source| {
        let effort = read_segment(&source, effort_path, EFFORT_TEMPLATE, Bracket::Curly)?;
        let categories = effort.as_object().map(Map::len).unwrap_or(0);
        let matched = adapter::merge_effort(tier_data, &effort)?;
        Ok((categories, matched))
    });
    match merged {
        Ok((categories, matched)) => {
            info!(categories, matched, "merged EFFORT_ESTIMATION_TEMPLATE with tier data");
        }
        Err(err) => {
            error!(error = %err, "error reading effort template");
            warn!("continuing without subtasks");
        }
    }
}

/// Renders every requested segment in memory, then commits all touched files
/// together. Nothing is written when any file or required segment is missing.
pub fn save_allocations(
    paths: &BackendPaths,
    catalog: &RoleCatalog,
    request: &SaveAllocationsRequest,
) -> Result<SaveSummary, AdminError> {
    let thresholds = request.tier_thresholds.as_deref().unwrap_or_default();
    let role_names = adapter::role_names(request.available_roles.as_deref().unwrap_or_default());
    let effort = request.effort_data.as_ref().filter(|effort| !effort.is_empty());
    let mut staged = StagedWrites::default();

    info!(
        path = %paths.templates.display(),
        tiers = request.tier_data.len(),
        "updating excel templates"
    );
    let mut templates = read_existing(&paths.templates, "Excel templates file")?;
    let tiers = adapter::tier_rows_to_backend(&request.tier_data, catalog);
    templates = replace_segment(
        &templates,
        &paths.templates,
        TIERS_DATA,
        Bracket::Square,
        &tiers,
        TIERS_STYLE,
    )?;
    if !role_names.is_empty() {
        let roles = adapter::role_names_to_backend(&role_names);
        templates = replace_optional_segment(
            &templates,
            &paths.templates,
            TIERS_ROLES,
            &roles,
            TIERS_ROLES_STYLE,
        )?;
    }
    staged.stage(paths.templates.clone(), templates);

    if !thresholds.is_empty() || !role_names.is_empty() {
        info!(path = %paths.config.display(), "updating config");
        let mut config = read_existing(&paths.config, "Config file")?;
        if !thresholds.is_empty() {
            let value = adapter::thresholds_to_backend(thresholds);
            config = replace_optional_segment(
                &config,
                &paths.config,
                TIER_THRESHOLDS,
                &value,
                THRESHOLDS_STYLE,
            )?;
        }
        if !role_names.is_empty() {
            let value = adapter::role_names_to_backend(&role_names);
            config = replace_optional_segment(
                &config,
                &paths.config,
                AVAILABLE_ROLES,
                &value,
                AVAILABLE_ROLES_STYLE,
            )?;
        }
        staged.stage(paths.config.clone(), config);
    }

    if let Some(effort) = effort {
        info!(
            path = %paths.effort.display(),
            categories = effort.len(),
            "updating effort template"
        );
        let source = read_existing(&paths.effort, "Effort template file")?;
        let value = adapter::effort_to_backend(effort);
        let updated = replace_segment(
            &source,
            &paths.effort,
            EFFORT_TEMPLATE,
            Bracket::Curly,
            &value,
            EFFORT_STYLE,
        )?;
        staged.stage(paths.effort.clone(), updated);
    }

    let files = staged.commit()?;
    info!(files, "all templates updated");
    Ok(SaveSummary {
        role_allocations_updated: request.tier_data.len(),
        effort_template_updated: effort.map(Map::len).unwrap_or(0),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

fn read_existing(path: &Path, what: &'static str) -> Result<String, AdminError> {
    if !path.exists() {
        return Err(AdminError::NotFound {
            what,
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path).map_err(|err| AdminError::io("read", path, err))
}

fn read_segment(
    source: &str,
    path: &Path,
    name: &'static str,
    bracket: Bracket,
) -> Result<Value, AdminError> {
    let segment = locate(source, name, bracket).map_err(|err| AdminError::Segment {
        path: path.to_path_buf(),
        source: err,
    })?;
    extract_located(source, &segment).map_err(|err| AdminError::Parse {
        segment: name,
        source: err,
    })
}

fn replace_segment(
    source: &str,
    path: &Path,
    name: &'static str,
    bracket: Bracket,
    value: &Value,
    style: RenderStyle,
) -> Result<String, AdminError> {
    let segment = locate(source, name, bracket).map_err(|err| AdminError::Segment {
        path: path.to_path_buf(),
        source: err,
    })?;
    let rendered = render_assignment(name, value, style);
    info!(segment = name, "replaced segment");
    Ok(segment.replace(source, &rendered))
}

/// Like [`replace_segment`] for list segments that a file may legitimately
/// lack; a missing marker leaves the text unchanged.
fn replace_optional_segment(
    source: &str,
    path: &Path,
    name: &'static str,
    value: &Value,
    style: RenderStyle,
) -> Result<String, AdminError> {
    match replace_segment(source, path, name, Bracket::Square, value, style) {
        Err(AdminError::Segment {
            source: LocateError::NotFound { .. },
            ..
        }) => {
            warn!(segment = name, path = %path.display(), "segment not present, skipping");
            Ok(source.to_string())
        }
        other => other,
    }
}
