//! Typed views over the legacy metadata collections.
//!
//! Legacy rows come from several SQL dialects and hand-edited JSON, so scalar
//! fields are read leniently: numbers may be strings, booleans may be 0/1, and
//! serialized blobs may be either JSON text or an already-decoded object.

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;
use metaport_db::models::{RelationType, Stamps};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

pub mod collections {
    pub const USERS: &str = "xc_users";
    pub const PROJECTS: &str = "nc_projects";
    pub const PROJECT_USERS: &str = "nc_projects_users";
    pub const MODELS: &str = "nc_models";
    pub const RELATIONS: &str = "nc_relations";
    pub const DISABLED_MODELS_FOR_ROLE: &str = "nc_disabled_models_for_role";
    pub const SHARED_VIEWS: &str = "nc_shared_views";
    pub const SHARED_BASES: &str = "nc_shared_bases";
    pub const PLUGINS: &str = "nc_plugins";
    pub const HOOKS: &str = "nc_hooks";
    pub const AUDIT: &str = "nc_audit";
}

pub(crate) mod loose {
    use super::*;

    pub fn scalar_to_string(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar_to_string(Value::deserialize(d)?))
    }

    pub fn truthy(value: &Value) -> bool {
        match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
            Value::String(s) => !s.is_empty() && s != "0" && !s.eq_ignore_ascii_case("false"),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn boolean<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Null => None,
            other => Some(truthy(&other)),
        })
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(b as i64),
            _ => None,
        })
    }

    pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f%#z"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => parse_timestamp(&s),
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        })
    }

    /// Elements that fail to decode are dropped; anything but an array reads as empty.
    pub fn list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value(item) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        tracing::warn!("dropping malformed legacy list entry: {}", e);
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        })
    }
}

/// A legacy list decoded entry by entry. Entries that fail to decode are kept
/// as error messages so the caller can report them.
#[derive(Debug, Clone)]
pub struct Entries<T> {
    pub items: Vec<T>,
    pub rejected: Vec<String>,
}

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Entries<T> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let mut out = Self::default();
        if let Value::Array(items) = Value::deserialize(d)? {
            for item in items {
                match serde_json::from_value(item) {
                    Ok(entry) => out.items.push(entry),
                    Err(e) => out.rejected.push(e.to_string()),
                }
            }
        }
        Ok(out)
    }
}

/// Decodes a serialized blob. Absent or unparseable blobs become `T::default()`.
pub fn parse_blob<T: DeserializeOwned + Default>(raw: &Value, what: &str) -> T {
    let parsed = match raw {
        Value::Null => return T::default(),
        Value::String(s) if s.trim().is_empty() || s.trim() == "null" => return T::default(),
        Value::String(s) => serde_json::from_str(s),
        other => serde_json::from_value(other.clone()),
    };
    parsed.unwrap_or_else(|e| {
        tracing::warn!("malformed {} blob, using defaults: {}", what, e);
        T::default()
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyStamps {
    #[serde(default, deserialize_with = "loose::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "loose::timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&LegacyStamps> for Stamps {
    fn from(s: &LegacyStamps) -> Self {
        Stamps {
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyProject {
    #[serde(default, deserialize_with = "loose::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub title: Option<String>,
    #[serde(default)]
    pub config: Value,
    #[serde(flatten)]
    pub stamps: LegacyStamps,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default, deserialize_with = "loose::string")]
    pub prefix: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub title: Option<String>,
    #[serde(default)]
    pub envs: Map<String, Value>,
}

impl ProjectConfig {
    /// Database entries of the `_noco` environment.
    pub fn databases(&self) -> Vec<Value> {
        self.envs
            .get("_noco")
            .and_then(|env| env.get("db"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyUser {
    #[serde(default, deserialize_with = "loose::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub salt: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub firstname: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub lastname: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub roles: Option<String>,
    #[serde(default, deserialize_with = "loose::boolean")]
    pub email_verified: Option<bool>,
    #[serde(default, deserialize_with = "loose::string")]
    pub email_verification_token: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub refresh_token: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub invite_token: Option<String>,
    #[serde(default)]
    pub invite_token_expires: Option<Value>,
    #[serde(default, deserialize_with = "loose::string")]
    pub reset_password_token: Option<String>,
    #[serde(default)]
    pub reset_password_expires: Option<Value>,
    #[serde(flatten)]
    pub stamps: LegacyStamps,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyProjectUser {
    #[serde(default, deserialize_with = "loose::string")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub user_id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub roles: Option<String>,
    #[serde(flatten)]
    pub stamps: LegacyStamps,
}

/// One row of the legacy model list: a table, a database view, or a saved view
/// (`type = "vtable"`) hanging off a parent table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyModel {
    #[serde(default, deserialize_with = "loose::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub project_id: Option<String>,
    /// Canonical table name, or the view title for saved views.
    #[serde(default, deserialize_with = "loose::string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub alias: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "loose::string")]
    pub model_type: Option<String>,
    #[serde(default)]
    pub meta: Value,
    #[serde(default)]
    pub query_params: Value,
    #[serde(default, deserialize_with = "loose::string")]
    pub parent_model_title: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub show_as: Option<String>,
    #[serde(default, deserialize_with = "loose::int")]
    pub order: Option<i64>,
    #[serde(default, deserialize_with = "loose::int")]
    pub view_order: Option<i64>,
    #[serde(default, deserialize_with = "loose::boolean")]
    pub mm: Option<bool>,
    #[serde(flatten)]
    pub stamps: LegacyStamps,
}

impl LegacyModel {
    pub fn is_table(&self) -> bool {
        matches!(self.model_type.as_deref(), Some("table") | Some("view"))
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn alias(&self) -> &str {
        self.alias.as_deref().or(self.title.as_deref()).unwrap_or_default()
    }

    pub fn model_meta(&self) -> ModelMeta {
        parse_blob(&self.meta, "model meta")
    }

    pub fn query_params(&self) -> QueryParams {
        parse_blob(&self.query_params, "query params")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelMeta {
    #[serde(default, deserialize_with = "loose::list")]
    pub columns: Vec<LegacyColumn>,
    #[serde(rename = "belongsTo", default, deserialize_with = "loose::list")]
    pub belongs_to: Vec<RelationDescriptor>,
    #[serde(rename = "hasMany", default, deserialize_with = "loose::list")]
    pub has_many: Vec<RelationDescriptor>,
    #[serde(default)]
    pub v: Entries<LegacyVirtualColumn>,
}

impl ModelMeta {
    /// Has-many relations with no explicit virtual column declared for them.
    pub fn implicit_has_many(&self) -> Vec<&RelationDescriptor> {
        self.has_many
            .iter()
            .filter(|hm| {
                !self
                    .v
                    .items
                    .iter()
                    .filter_map(|v| v.hm.as_ref())
                    .any(|declared| declared.same_endpoints(hm))
            })
            .collect()
    }

    pub fn is_foreign_key(&self, column_name: &str) -> bool {
        self.belongs_to.iter().any(|bt| bt.cn.as_deref() == Some(column_name))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyColumn {
    #[serde(default, deserialize_with = "loose::string")]
    pub cn: Option<String>,
    #[serde(rename = "_cn", default, deserialize_with = "loose::string")]
    pub alias: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub uidt: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Endpoints of a legacy relation, by canonical table and column names.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RelationDescriptor {
    #[serde(default, deserialize_with = "loose::string")]
    pub tn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub cn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub rtn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub rcn: Option<String>,
    /// Junction table of a many-to-many relation.
    #[serde(default, deserialize_with = "loose::string")]
    pub vtn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub vcn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub vrcn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub fkn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub ur: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub dr: Option<String>,
}

impl RelationDescriptor {
    pub fn same_endpoints(&self, other: &RelationDescriptor) -> bool {
        self.tn == other.tn && self.cn == other.cn && self.rtn == other.rtn && self.rcn == other.rcn
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupDescriptor {
    /// Raw relation token (`hm`, `bt`, `mm`).
    #[serde(rename = "type", default, deserialize_with = "loose::string")]
    pub relation_type: Option<String>,
    #[serde(flatten)]
    pub relation: RelationDescriptor,
    #[serde(default, deserialize_with = "loose::string")]
    pub ltn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub lcn: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RollupDescriptor {
    /// Raw relation token (`hm`, `bt`, `mm`).
    #[serde(rename = "type", default, deserialize_with = "loose::string")]
    pub relation_type: Option<String>,
    #[serde(flatten)]
    pub relation: RelationDescriptor,
    #[serde(default, deserialize_with = "loose::string")]
    pub rltn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub rlcn: Option<String>,
    #[serde(rename = "fn", default, deserialize_with = "loose::string")]
    pub function: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormulaDescriptor {
    #[serde(default, deserialize_with = "loose::string")]
    pub value: Option<String>,
    #[serde(default)]
    pub error: Value,
}

impl FormulaDescriptor {
    /// Error text the legacy editor already attached to the formula, if any.
    pub fn legacy_error(&self) -> Option<String> {
        match &self.error {
            Value::Array(items) if !items.is_empty() => Some(
                items
                    .iter()
                    .filter_map(|v| loose::scalar_to_string(v.clone()))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyVirtualColumn {
    #[serde(rename = "_cn", default, deserialize_with = "loose::string")]
    pub alias: Option<String>,
    #[serde(default)]
    pub hm: Option<RelationDescriptor>,
    #[serde(default)]
    pub bt: Option<RelationDescriptor>,
    #[serde(default)]
    pub mm: Option<RelationDescriptor>,
    #[serde(default)]
    pub lk: Option<LookupDescriptor>,
    #[serde(default)]
    pub rl: Option<RollupDescriptor>,
    #[serde(default)]
    pub formula: Option<FormulaDescriptor>,
}

impl LegacyVirtualColumn {
    pub fn alias(&self) -> &str {
        self.alias.as_deref().unwrap_or_default()
    }

    pub fn relation(&self) -> Option<(RelationType, &RelationDescriptor)> {
        if let Some(hm) = &self.hm {
            Some((RelationType::HasMany, hm))
        } else if let Some(mm) = &self.mm {
            Some((RelationType::ManyToMany, mm))
        } else {
            self.bt.as_ref().map(|bt| (RelationType::BelongsTo, bt))
        }
    }
}

/// A row of the legacy relation-definitions collection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyRelation {
    #[serde(default, deserialize_with = "loose::string")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub tn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub cn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub rtn: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub rcn: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "loose::string")]
    pub relation_kind: Option<String>,
}

impl LegacyRelation {
    pub fn is_virtual(&self) -> bool {
        self.relation_kind.as_deref() == Some("virtual")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyFilter {
    #[serde(default, deserialize_with = "loose::string")]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub op: Option<String>,
    #[serde(default)]
    pub value: Value,
    #[serde(rename = "logicOp", default, deserialize_with = "loose::string")]
    pub logic_op: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacySort {
    #[serde(default, deserialize_with = "loose::string")]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub order: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewStatus {
    #[serde(rename = "type", default, deserialize_with = "loose::string")]
    pub lock_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmit {
    #[serde(default, deserialize_with = "loose::string")]
    pub submit_redirect_url: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "loose::boolean")]
    pub show_blank_form: Option<bool>,
    #[serde(default, deserialize_with = "loose::boolean")]
    pub show_another_submit: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormFieldParams {
    #[serde(default, deserialize_with = "loose::string")]
    pub help: Option<String>,
    #[serde(default, deserialize_with = "loose::boolean")]
    pub required: Option<bool>,
    #[serde(default, deserialize_with = "loose::string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormParams {
    #[serde(default, deserialize_with = "loose::string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub description: Option<String>,
    #[serde(default)]
    pub submit: Option<FormSubmit>,
    #[serde(default)]
    pub email_me: Option<Value>,
    #[serde(default)]
    pub fields: IndexMap<String, FormFieldParams>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraViewParams {
    #[serde(default)]
    pub form_params: Option<FormParams>,
}

/// The per-view parameter blob: visibility, ordering, widths, sorts, filters
/// and view-type extras.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    #[serde(default, deserialize_with = "loose::list")]
    pub filters: Vec<LegacyFilter>,
    #[serde(default, deserialize_with = "loose::list")]
    pub sort_list: Vec<LegacySort>,
    #[serde(default)]
    pub show_fields: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "loose::list")]
    pub fields_order: Vec<String>,
    #[serde(default)]
    pub view_status: Option<ViewStatus>,
    #[serde(default)]
    pub columns_width: Map<String, Value>,
    #[serde(default)]
    pub extra_view_params: Option<ExtraViewParams>,
    #[serde(default, deserialize_with = "loose::boolean")]
    pub show_system_fields: Option<bool>,
    #[serde(default, deserialize_with = "loose::string")]
    pub cover_image_field: Option<String>,
}

impl QueryParams {
    pub fn form_params(&self) -> Option<&FormParams> {
        self.extra_view_params.as_ref()?.form_params.as_ref()
    }

    pub fn width(&self, alias: &str) -> Option<String> {
        self.columns_width
            .get(alias)
            .cloned()
            .and_then(loose::scalar_to_string)
    }

    pub fn lock_type(&self) -> Option<&str> {
        self.view_status
            .as_ref()?
            .lock_type
            .as_deref()
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyAclRule {
    #[serde(default, deserialize_with = "loose::string")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub title: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "loose::string")]
    pub model_type: Option<String>,
    #[serde(default, deserialize_with = "loose::boolean")]
    pub disabled: Option<bool>,
    #[serde(default, deserialize_with = "loose::string")]
    pub parent_model_title: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub project_id: Option<String>,
    #[serde(flatten)]
    pub stamps: LegacyStamps,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacySharedView {
    #[serde(default, deserialize_with = "loose::string")]
    pub model_name: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub view_type: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub view_id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub view_name: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacySharedBase {
    #[serde(default, deserialize_with = "loose::string")]
    pub roles: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub shared_base_id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyPlugin {
    #[serde(default, deserialize_with = "loose::string")]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default, deserialize_with = "loose::boolean")]
    pub active: Option<bool>,
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub docs: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub status_details: Option<Value>,
    #[serde(default)]
    pub logo: Option<Value>,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default)]
    pub category: Option<Value>,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub input_schema: Option<Value>,
    #[serde(default)]
    pub creator: Option<Value>,
    #[serde(default)]
    pub creator_website: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(flatten)]
    pub stamps: LegacyStamps,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyHook {
    #[serde(default, deserialize_with = "loose::string")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub env: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub tn: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "loose::string")]
    pub hook_type: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub event: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub operation: Option<String>,
    #[serde(rename = "async", default, deserialize_with = "loose::boolean")]
    pub is_async: Option<bool>,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default, deserialize_with = "loose::string")]
    pub url: Option<String>,
    #[serde(default)]
    pub headers: Option<Value>,
    #[serde(default)]
    pub condition: Value,
    #[serde(default)]
    pub notification: Option<Value>,
    #[serde(default, deserialize_with = "loose::int")]
    pub retries: Option<i64>,
    #[serde(default, deserialize_with = "loose::int")]
    pub retry_interval: Option<i64>,
    #[serde(default, deserialize_with = "loose::int")]
    pub timeout: Option<i64>,
    #[serde(default, deserialize_with = "loose::boolean")]
    pub active: Option<bool>,
    #[serde(flatten)]
    pub stamps: LegacyStamps,
}

impl LegacyHook {
    pub fn has_condition(&self) -> bool {
        loose::truthy(&self.condition)
    }

    /// Filters stored in the hook condition. Unparseable conditions carry none.
    pub fn condition_filters(&self) -> Vec<LegacyFilter> {
        let raw: Value = parse_blob(&self.condition, "hook condition");
        match raw {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyAudit {
    #[serde(default, deserialize_with = "loose::string")]
    pub user: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub ip: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub project_id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub model_name: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub model_id: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub op_type: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub op_sub_type: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "loose::string")]
    pub details: Option<String>,
    #[serde(flatten)]
    pub stamps: LegacyStamps,
}

/// Decodes every row of a collection, dropping rows that are not objects.
pub fn decode_rows<T: DeserializeOwned>(collection: &str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("skipping malformed {} row: {}", collection, e);
                None
            }
        })
        .collect()
}
