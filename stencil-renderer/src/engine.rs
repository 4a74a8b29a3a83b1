//! Tera rendering engine: [`build_funcs`] and [`Renderer`].
//!
//! # Resource paths
//!
//! | Descriptor                     | Output ext | Resource                 |
//! |--------------------------------|------------|--------------------------|
//! | `template: table`              | `.sql`     | `table.sql.tera`         |
//! | `set: pg`, `template: enum`    | `.go`      | `pg/enum.go.tera`        |
//! | `template: json`               | `.json`    | `json.json.tera`         |

use std::sync::Arc;

use tera::Tera;

use stencil_core::{CancelFlag, RunConfig, SourceError, Template, TemplateSource};

use crate::error::RenderError;
use crate::extension::load_extension;
use crate::funcs::FuncMap;

/// Fixed suffix of every template resource.
pub const TEMPLATE_SUFFIX: &str = "tera";

// ---------------------------------------------------------------------------
// Function environment
// ---------------------------------------------------------------------------

/// Build the function environment for a run.
///
/// `base` is the target's own set or [`FuncMap::base`]. Functions returned by
/// the source's script extension are merged on top and shadow same-named
/// entries.
pub fn build_funcs(
    base: FuncMap,
    source: &dyn TemplateSource,
    config: &RunConfig,
) -> Result<FuncMap, RenderError> {
    let mut funcs = base;
    if let Some(ext) = load_extension(source, config)? {
        funcs.merge(ext);
    }
    Ok(funcs)
}

// ---------------------------------------------------------------------------
// LoadedTemplate
// ---------------------------------------------------------------------------

/// A parsed template, ready to execute against descriptors.
#[derive(Debug)]
pub struct LoadedTemplate {
    path: String,
    tera: Tera,
}

impl LoadedTemplate {
    /// Resource path the template was read from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Execute with `tpl` as the data context.
    pub fn render(&self, tpl: &Template) -> Result<Vec<u8>, RenderError> {
        let ctx = tera::Context::from_serialize(tpl).map_err(RenderError::Context)?;
        let out = self.tera.render(&self.path, &ctx).map_err(|e| RenderError::Exec {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(out.into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Resolves, parses and executes templates for one run.
///
/// Built from the active resource tree (the run's override tree, else the
/// target's built-in one) and the run's function environment.
pub struct Renderer {
    source: Arc<dyn TemplateSource>,
    funcs: FuncMap,
    file_ext: String,
    cancel: CancelFlag,
}

impl Renderer {
    pub fn new(
        source: Arc<dyn TemplateSource>,
        funcs: FuncMap,
        file_ext: impl Into<String>,
    ) -> Self {
        Renderer {
            source,
            funcs,
            file_ext: file_ext.into(),
            cancel: CancelFlag::default(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn funcs(&self) -> &FuncMap {
        &self.funcs
    }

    /// `<set>/<template><file_ext>.tera`
    pub fn resource_path(&self, tpl: &Template) -> String {
        format!("{}{}.{}", tpl.file(), self.file_ext, TEMPLATE_SUFFIX)
    }

    /// Read and parse the template `tpl` names.
    pub fn load(&self, tpl: &Template) -> Result<LoadedTemplate, RenderError> {
        let path = self.resource_path(tpl);
        if self.cancel.is_cancelled() {
            return Err(RenderError::Open {
                path,
                source: SourceError::Cancelled,
            });
        }
        let buf = self.source.read(&path).map_err(|e| RenderError::Open {
            path: path.clone(),
            source: e,
        })?;
        let content = String::from_utf8(buf).map_err(|_| RenderError::Utf8 { path: path.clone() })?;

        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        self.funcs.register(&mut tera);
        tera.add_raw_template(&path, &content)
            .map_err(|e| RenderError::Parse {
                path: path.clone(),
                source: e,
            })?;
        Ok(LoadedTemplate { path, tera })
    }

    /// Load `tpl` and execute it with `tpl` itself as the context.
    pub fn exec(&self, tpl: &Template) -> Result<Vec<u8>, RenderError> {
        let loaded = self.load(tpl)?;
        tracing::trace!(template = %loaded.path(), "exec");
        loaded.render(tpl)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stencil_core::StaticSource;

    fn renderer(entries: &[(&str, &str)]) -> Renderer {
        Renderer::new(
            Arc::new(StaticSource::from_static(entries)),
            FuncMap::base(),
            ".sql",
        )
    }

    #[test]
    fn resource_path_includes_set_and_ext() {
        let r = renderer(&[]);
        assert_eq!(r.resource_path(&Template::new("table")), "table.sql.tera");
        assert_eq!(
            r.resource_path(&Template::new("enum").with_set("pg")),
            "pg/enum.sql.tera"
        );
    }

    #[test]
    fn exec_sees_descriptor_fields() {
        let r = renderer(&[(
            "table.sql.tera",
            "{{ type }}:{{ name | pascal_case }}:{{ data.cols }}:{{ extra.schema }}\n",
        )]);
        let tpl = Template::new("table")
            .with_kind("view")
            .with_name("author_books")
            .with_data(json!({"cols": 2}))
            .with_extra("schema", json!("public"));
        let out = r.exec(&tpl).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "view:AuthorBooks:2:public\n");
    }

    #[test]
    fn no_html_escaping() {
        let r = renderer(&[("table.sql.tera", "{{ data }}")]);
        let out = r
            .exec(&Template::new("table").with_data(json!("a < b && \"c\"")))
            .unwrap();
        assert_eq!(out, b"a < b && \"c\"");
    }

    #[test]
    fn missing_template_fails_to_open() {
        let err = renderer(&[]).exec(&Template::new("table")).unwrap_err();
        assert!(matches!(err, RenderError::Open { .. }), "got: {err}");
        assert!(err.to_string().contains("table.sql.tera"));
    }

    #[test]
    fn unparsable_template_fails_to_parse() {
        let err = renderer(&[("table.sql.tera", "{% if %}")])
            .load(&Template::new("table"))
            .unwrap_err();
        assert!(matches!(err, RenderError::Parse { .. }), "got: {err}");
    }

    #[test]
    fn undefined_field_fails_at_exec() {
        let err = renderer(&[("table.sql.tera", "{{ data.missing.deeper }}")])
            .exec(&Template::new("table"))
            .unwrap_err();
        assert!(matches!(err, RenderError::Exec { .. }), "got: {err}");
    }

    #[test]
    fn cancelled_renderer_refuses_to_load() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let r = renderer(&[("table.sql.tera", "x")]).with_cancel(cancel);
        let err = r.exec(&Template::new("table")).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Open { source: SourceError::Cancelled, .. }
        ));
    }
}
