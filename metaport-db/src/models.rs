//! Entities of the normalized metadata schema.
//!
//! Every entity carries its own `id`. An empty id asks the store to generate one,
//! a non-empty id is kept as is (tenants and users keep their legacy identifiers).

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tenant,
    Base,
    User,
    TenantUser,
    Table,
    Column,
    View,
    ViewColumn,
    Sort,
    Filter,
    Hook,
    RoleVisibility,
    Plugin,
    Audit,
}

pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

macro_rules! entity {
    ($ty:ty, $kind:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = EntityKind::$kind;

            fn id(&self) -> &str {
                &self.id
            }
        }
    };
}

/// UI type tags written into `Column::uidt`.
pub mod uidt {
    pub const LINK_TO_ANOTHER_RECORD: &str = "LinkToAnotherRecord";
    pub const LOOKUP: &str = "Lookup";
    pub const ROLLUP: &str = "Rollup";
    pub const FORMULA: &str = "Formula";
    pub const FOREIGN_KEY: &str = "ForeignKey";
    pub const NUMBER: &str = "Number";
    pub const RATING: &str = "Rating";
}

pub const DEFAULT_LOCK_TYPE: &str = "collaborative";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stamps {
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(default)]
    pub id: String,
    pub title: Option<String>,
    pub prefix: Option<String>,
    pub is_meta: bool,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub roles: Option<String>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

/// A data source attached to a tenant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Base {
    #[serde(default)]
    pub id: String,
    pub tenant_id: String,
    pub client: Option<String>,
    pub config: Value,
    pub is_meta: bool,
    pub inflection_column: Option<String>,
    pub inflection_table: Option<String>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub salt: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub username: Option<String>,
    pub roles: Option<String>,
    pub email_verified: Option<bool>,
    pub email_verification_token: Option<String>,
    pub refresh_token: Option<String>,
    pub invite_token: Option<String>,
    pub invite_token_expires: Option<Value>,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<Value>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantUser {
    #[serde(default)]
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub roles: Option<String>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    #[default]
    Table,
    View,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub id: String,
    pub tenant_id: String,
    pub base_id: String,
    /// Canonical storage name.
    pub table_name: String,
    /// Display alias.
    pub title: String,
    pub kind: TableKind,
    pub order: Option<i64>,
    pub mm: bool,
    #[serde(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum RelationType {
    #[strum(serialize = "hm")]
    #[serde(rename = "hm")]
    HasMany,
    #[strum(serialize = "bt")]
    #[serde(rename = "bt")]
    BelongsTo,
    #[strum(serialize = "mm")]
    #[serde(rename = "mm")]
    ManyToMany,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Junction {
    pub table_id: String,
    pub child_column_id: String,
    pub parent_column_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationOptions {
    pub relation_type: RelationType,
    pub child_column_id: String,
    pub parent_column_id: String,
    pub related_table_id: String,
    pub junction: Option<Junction>,
    pub fk_index_name: Option<String>,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
    #[serde(rename = "virtual")]
    pub is_virtual: bool,
}

/// The endpoint pair a lookup or rollup uses to find the relation it rides on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSignature {
    pub relation_type: RelationType,
    pub child_column_id: String,
    pub parent_column_id: String,
    pub junction_table_id: Option<String>,
}

impl RelationSignature {
    /// Junction tables only take part in the comparison for many-to-many relations.
    pub fn matches(&self, other: &RelationSignature) -> bool {
        self.relation_type == other.relation_type
            && self.child_column_id == other.child_column_id
            && self.parent_column_id == other.parent_column_id
            && (self.relation_type != RelationType::ManyToMany
                || self.junction_table_id == other.junction_table_id)
    }
}

impl RelationOptions {
    pub fn signature(&self) -> RelationSignature {
        RelationSignature {
            relation_type: self.relation_type,
            child_column_id: self.child_column_id.clone(),
            parent_column_id: self.parent_column_id.clone(),
            junction_table_id: self.junction.as_ref().map(|j| j.table_id.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupOptions {
    pub relation_column_id: String,
    pub lookup_column_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollupOptions {
    pub relation_column_id: String,
    pub rollup_column_id: String,
    pub rollup_function: Option<String>,
}

/// A formula keeps its raw text. When the text could not be rewritten `formula`
/// is empty and `error` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaOptions {
    pub formula: Option<String>,
    pub formula_raw: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnOptions {
    #[default]
    Plain,
    ForeignKey,
    Relation(RelationOptions),
    Lookup(LookupOptions),
    Rollup(RollupOptions),
    Formula(FormulaOptions),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Column {
    #[serde(default)]
    pub id: String,
    pub table_id: String,
    /// Canonical storage name. Virtual columns have none.
    pub column_name: Option<String>,
    /// Display alias.
    pub title: String,
    pub uidt: String,
    pub system: bool,
    pub options: ColumnOptions,
    /// Legacy attributes carried over untouched (data type, precision, defaults...).
    #[serde(default)]
    pub meta: Map<String, Value>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl Column {
    pub fn relation(&self) -> Option<&RelationOptions> {
        match &self.options {
            ColumnOptions::Relation(rel) => Some(rel),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    Grid,
    Gallery,
    Form,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormOptions {
    pub heading: Option<String>,
    pub subheading: Option<String>,
    pub success_msg: Option<String>,
    pub redirect_url: Option<String>,
    /// Notification recipients, serialized.
    pub email: Option<String>,
    pub submit_another_form: Option<bool>,
    pub show_blank_form: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewOptions {
    #[default]
    Grid,
    Gallery {
        cover_image_column_id: Option<String>,
    },
    Form(FormOptions),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct View {
    #[serde(default)]
    pub id: String,
    pub tenant_id: String,
    pub base_id: String,
    pub table_id: String,
    pub title: String,
    pub show: bool,
    pub order: Option<i64>,
    pub show_system_fields: Option<bool>,
    pub lock_type: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    pub options: ViewOptions,
    #[serde(flatten)]
    pub stamps: Stamps,
}

impl View {
    pub fn view_type(&self) -> ViewType {
        match self.options {
            ViewOptions::Grid => ViewType::Grid,
            ViewOptions::Gallery { .. } => ViewType::Gallery,
            ViewOptions::Form(_) => ViewType::Form,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_system_fields: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<String>,
}

/// Per-column display settings of one view. Label, help, required and
/// description are only meaningful for form views.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewColumn {
    #[serde(default)]
    pub id: String,
    pub view_id: String,
    pub column_id: String,
    pub order: i64,
    pub show: bool,
    pub width: Option<String>,
    pub label: Option<String>,
    pub help: Option<String>,
    pub required: Option<bool>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sort {
    #[serde(default)]
    pub id: String,
    pub view_id: String,
    pub column_id: Option<String>,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Eq,
    Neq,
    Like,
    Nlike,
    Gt,
    Lt,
    Gte,
    Lte,
    Null,
    Notnull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
}

/// A filter belongs to a view or to a hook, never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub id: String,
    pub view_id: Option<String>,
    pub hook_id: Option<String>,
    pub column_id: Option<String>,
    pub comparison_op: Option<ComparisonOp>,
    pub logical_op: Option<LogicalOp>,
    pub value: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hook {
    #[serde(default)]
    pub id: String,
    pub tenant_id: String,
    pub table_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub env: Option<String>,
    #[serde(rename = "type")]
    pub hook_type: Option<String>,
    pub event: Option<String>,
    pub operation: Option<String>,
    #[serde(rename = "async")]
    pub is_async: Option<bool>,
    pub payload: Option<Value>,
    pub url: Option<String>,
    pub headers: Option<Value>,
    pub condition: bool,
    pub notification: Option<Value>,
    pub retries: Option<i64>,
    pub retry_interval: Option<i64>,
    pub timeout: Option<i64>,
    pub active: Option<bool>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleVisibility {
    #[serde(default)]
    pub id: String,
    pub view_id: String,
    pub role: String,
    pub disabled: bool,
    #[serde(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plugin {
    #[serde(default)]
    pub id: String,
    pub title: Option<String>,
    pub description: Option<Value>,
    pub active: Option<bool>,
    pub version: Option<Value>,
    pub docs: Option<Value>,
    pub status: Option<Value>,
    pub status_details: Option<Value>,
    pub logo: Option<Value>,
    pub tags: Option<Value>,
    pub category: Option<Value>,
    pub input: Option<Value>,
    pub input_schema: Option<Value>,
    pub creator: Option<Value>,
    pub creator_website: Option<Value>,
    pub price: Option<Value>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Audit {
    #[serde(default)]
    pub id: String,
    pub tenant_id: String,
    pub table_id: Option<String>,
    pub user: Option<String>,
    pub ip: Option<String>,
    pub row_id: Option<String>,
    pub op_type: Option<String>,
    pub op_sub_type: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub details: Option<String>,
    #[serde(flatten)]
    pub stamps: Stamps,
}

entity!(Tenant, Tenant);
entity!(Base, Base);
entity!(User, User);
entity!(TenantUser, TenantUser);
entity!(Table, Table);
entity!(Column, Column);
entity!(View, View);
entity!(ViewColumn, ViewColumn);
entity!(Sort, Sort);
entity!(Filter, Filter);
entity!(Hook, Hook);
entity!(RoleVisibility, RoleVisibility);
entity!(Plugin, Plugin);
entity!(Audit, Audit);
