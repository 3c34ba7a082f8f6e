//! View reconstructor.
//!
//! Every table gets a default grid view; saved legacy views become grid,
//! gallery or form views of their parent table. Per-column display settings
//! come from the legacy parameter blob of the view.

use std::sync::Arc;

use metaport_db::MetaStoreExt;
use metaport_db::models::{
    Column, DEFAULT_LOCK_TYPE, EntityKind, FormOptions, Stamps, View, ViewColumn, ViewOptions,
    ViewPatch,
};

use crate::context::MigrationCtx;
use crate::errors::{MigrateError, MigrateResult};
use crate::index::ViewRef;
use crate::legacy::{FormParams, QueryParams, collections, loose};

pub const HELP_MAX_CHARS: usize = 254;

/// Which kind of view the visibility rule is applied for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewScope {
    TableDefault,
    Declared,
}

#[derive(Debug, Clone)]
pub struct ViewJob {
    pub tenant: String,
    /// Canonical name of the table the view belongs to.
    pub table: Option<String>,
    /// Title of a declared view. The default view takes the table alias.
    pub title: Option<String>,
    pub show_as: Option<String>,
    pub order: Option<i64>,
    pub scope: ViewScope,
    pub params: QueryParams,
    /// Timestamps of the legacy view record. Default views have none.
    pub stamps: Stamps,
}

impl ViewJob {
    pub fn label(&self) -> String {
        format!(
            "{}/{}",
            self.table.as_deref().unwrap_or("?"),
            self.title.as_deref().unwrap_or("default")
        )
    }
}

/// Columns in the blob's field order. Unlisted columns follow, keeping their
/// relative order.
pub fn order_columns(mut columns: Vec<Column>, fields_order: &[String]) -> Vec<Column> {
    if fields_order.is_empty() {
        return columns;
    }
    columns.sort_by_key(|c| {
        fields_order
            .iter()
            .position(|f| *f == c.title)
            .unwrap_or(usize::MAX)
    });
    columns
}

/// Without a visibility map every field shows. With one, an explicit entry
/// decides; an absent field is hidden on table default views only.
pub fn is_visible(params: &QueryParams, alias: &str, scope: ViewScope) -> bool {
    match &params.show_fields {
        None => true,
        Some(fields) => match fields.get(alias) {
            Some(flag) => loose::truthy(flag),
            None => scope == ViewScope::Declared,
        },
    }
}

pub fn truncate_help(help: &str) -> String {
    help.chars().take(HELP_MAX_CHARS).collect()
}

fn form_options(form: Option<&FormParams>) -> FormOptions {
    let Some(form) = form else {
        return FormOptions::default();
    };
    let submit = form.submit.clone().unwrap_or_default();
    FormOptions {
        heading: form.name.clone(),
        subheading: form.description.clone(),
        success_msg: submit.message,
        redirect_url: submit.submit_redirect_url,
        email: form.email_me.as_ref().map(|v| v.to_string()),
        submit_another_form: submit.show_another_submit,
        show_blank_form: submit.show_blank_form,
    }
}

fn view_options(ctx: &MigrationCtx, job: &ViewJob, table: &str) -> MigrateResult<ViewOptions> {
    if job.scope == ViewScope::TableDefault {
        return Ok(ViewOptions::Grid);
    }
    match job.show_as.as_deref() {
        Some("grid") => Ok(ViewOptions::Grid),
        Some("gallery") => {
            let cover_image_column_id = job.params.cover_image_field.as_deref().and_then(|alias| {
                let index = ctx.index.read();
                index
                    .tenant(&job.tenant)?
                    .column_by_alias(table, alias)
                    .map(|c| c.id.clone())
            });
            Ok(ViewOptions::Gallery {
                cover_image_column_id,
            })
        }
        Some("form") => Ok(ViewOptions::Form(form_options(job.params.form_params()))),
        other => Err(MigrateError::UnsupportedViewType {
            view: job.label(),
            show_as: other.map(str::to_string),
        }),
    }
}

fn view_column(view_id: &str, column: &Column, order: usize, job: &ViewJob) -> ViewColumn {
    let alias = column.title.as_str();
    let mut vc = ViewColumn {
        view_id: view_id.to_string(),
        column_id: column.id.clone(),
        order: order as i64 + 1,
        show: is_visible(&job.params, alias, job.scope),
        width: job.params.width(alias),
        ..Default::default()
    };
    if job.scope == ViewScope::Declared && job.show_as.as_deref() == Some("form") {
        if let Some(field) = job.params.form_params().and_then(|f| f.fields.get(alias)) {
            vc.help = field.help.as_deref().map(truncate_help);
            vc.label = field.label.clone();
            vc.required = field.required;
            vc.description = field.description.clone();
        }
    }
    vc
}

pub async fn create_view(ctx: Arc<MigrationCtx>, job: ViewJob) -> MigrateResult<()> {
    let table = {
        let index = ctx.index.read();
        job.table
            .as_deref()
            .and_then(|name| index.tenant(&job.tenant)?.table_by_name(name).cloned())
    };
    let Some(table) = table else {
        ctx.skip(
            collections::MODELS,
            format!("view {} of tenant {} has no parent table", job.label(), job.tenant),
        );
        return Ok(());
    };

    let options = view_options(&ctx, &job, &table.table_name)?;
    let title = match job.scope {
        ViewScope::TableDefault => table.title.clone(),
        ViewScope::Declared => job.title.clone().unwrap_or_else(|| table.title.clone()),
    };
    let mut view = ctx
        .insert(View {
            tenant_id: job.tenant.clone(),
            base_id: table.base_id.clone(),
            table_id: table.id.clone(),
            title,
            show: true,
            order: job.order,
            show_system_fields: job.params.show_system_fields,
            lock_type: DEFAULT_LOCK_TYPE.to_string(),
            options,
            stamps: job.stamps.clone(),
            ..Default::default()
        })
        .await?;

    let columns = ctx.store.list_columns(&table.id).await?;
    for (i, column) in order_columns(columns, &job.params.fields_order).iter().enumerate() {
        ctx.insert(view_column(&view.id, column, i, &job)).await?;
    }

    if let Some(lock_type) = job.params.lock_type() {
        if lock_type != view.lock_type {
            let patch = ViewPatch {
                lock_type: Some(lock_type.to_string()),
                ..Default::default()
            };
            ctx.patch(EntityKind::View, &view.id, &patch).await?;
            view.lock_type = lock_type.to_string();
        }
    }

    tracing::debug!("created {} view {} on {}", view.view_type(), view.title, table.table_name);
    ctx.index.write().tenant_mut(&job.tenant).record_view(
        &table.table_name,
        ViewRef {
            view,
            params: job.params,
        },
    );
    Ok(())
}
