//! Target configuration: everything a generation backend declares about
//! itself, built once and shared by every run against it.
//!
//! A target never holds run state. Fragments and file buffers live in the
//! [`Emitter`] and [`Emission`](crate::Emission) values each run creates.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use stencil_core::{FlagOption, FlagSet, RunConfig, Template, TemplateSource};
use stencil_renderer::FuncMap;

use crate::error::{BoxError, EngineError};
use crate::process::Emitter;

/// Per-run generation logic: walks the model and emits fragments.
pub type GenerateFn = dyn Fn(&mut Emitter<'_>, &Value) -> Result<(), EngineError> + Send + Sync;
type TemplateFn = dyn Fn(&RunConfig) -> Template + Send + Sync;
type TemplatesFn = dyn Fn(&RunConfig) -> Vec<Template> + Send + Sync;
type FuncsFn = dyn Fn(&RunConfig) -> FuncMap + Send + Sync;
type FileNameFn = dyn Fn(&RunConfig, &Template) -> String + Send + Sync;
type ContextFn = dyn Fn(&mut RunConfig) + Send + Sync;
type PostFn = dyn Fn(&RunConfig, &[u8]) -> Result<Vec<u8>, BoxError> + Send + Sync;

/// A named generation backend's static description.
pub struct Target {
    pub(crate) files: Arc<dyn TemplateSource>,
    pub(crate) generate: Box<GenerateFn>,
    pub(crate) for_commands: Vec<String>,
    pub(crate) file_ext: String,
    pub(crate) flags: Vec<FlagOption>,
    pub(crate) order: Vec<String>,
    pub(crate) header: Option<Box<TemplateFn>>,
    pub(crate) package_templates: Option<Box<TemplatesFn>>,
    pub(crate) funcs: Option<Box<FuncsFn>>,
    pub(crate) file_name: Box<FileNameFn>,
    pub(crate) build_context: Option<Box<ContextFn>>,
    pub(crate) post: Option<Box<PostFn>>,
}

impl Target {
    /// A target reading templates from `files` and driven by `generate`.
    pub fn new<S, G>(files: S, generate: G) -> Self
    where
        S: TemplateSource + 'static,
        G: Fn(&mut Emitter<'_>, &Value) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        Target {
            files: Arc::new(files),
            generate: Box::new(generate),
            for_commands: Vec::new(),
            file_ext: String::new(),
            flags: Vec::new(),
            order: Vec::new(),
            header: None,
            package_templates: None,
            funcs: None,
            file_name: Box::new(default_file_name),
            build_context: None,
            post: None,
        }
    }

    /// Commands the target supports. Leaving this empty means all of them.
    pub fn for_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.for_commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Output extension, including the dot (`.go`).
    pub fn file_ext(mut self, ext: impl Into<String>) -> Self {
        self.file_ext = ext.into();
        self
    }

    pub fn flag(mut self, flag: FlagOption) -> Self {
        self.flags.push(flag);
        self
    }

    /// Template names in the order their fragments are merged into files.
    pub fn order<I, S>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = order.into_iter().map(Into::into).collect();
        self
    }

    /// Template rendered at the top of every newly created file.
    pub fn header<F>(mut self, header: F) -> Self
    where
        F: Fn(&RunConfig) -> Template + Send + Sync + 'static,
    {
        self.header = Some(Box::new(header));
        self
    }

    /// Templates rendered once per non-append run, ahead of per-entity content.
    pub fn package_templates<F>(mut self, templates: F) -> Self
    where
        F: Fn(&RunConfig) -> Vec<Template> + Send + Sync + 'static,
    {
        self.package_templates = Some(Box::new(templates));
        self
    }

    /// Replace the baseline helper set with a target-specific one.
    pub fn funcs<F>(mut self, funcs: F) -> Self
    where
        F: Fn(&RunConfig) -> FuncMap + Send + Sync + 'static,
    {
        self.funcs = Some(Box::new(funcs));
        self
    }

    /// Output file stem for a fragment; the extension is appended by the run.
    pub fn file_name<F>(mut self, file_name: F) -> Self
    where
        F: Fn(&RunConfig, &Template) -> String + Send + Sync + 'static,
    {
        self.file_name = Box::new(file_name);
        self
    }

    pub fn build_context<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RunConfig) + Send + Sync + 'static,
    {
        self.build_context = Some(Box::new(hook));
        self
    }

    /// Post-process each merged file before it is written (e.g. a formatter).
    pub fn post<F>(mut self, post: F) -> Self
    where
        F: Fn(&RunConfig, &[u8]) -> Result<Vec<u8>, BoxError> + Send + Sync + 'static,
    {
        self.post = Some(Box::new(post));
        self
    }

    // -- accessors ----------------------------------------------------------

    pub fn files(&self) -> &Arc<dyn TemplateSource> {
        &self.files
    }

    pub fn commands(&self) -> &[String] {
        &self.for_commands
    }

    pub fn ext(&self) -> &str {
        &self.file_ext
    }

    pub fn flags(&self) -> &[FlagOption] {
        &self.flags
    }

    pub fn template_order(&self) -> &[String] {
        &self.order
    }

    /// True when the target applies to `command`.
    pub fn supports(&self, command: &str) -> bool {
        self.for_commands.is_empty() || self.for_commands.iter().any(|c| c == command)
    }

    /// This target's flags tagged with the name it is registered under.
    pub fn flag_sets(&self, name: &str) -> Vec<FlagSet> {
        self.flags
            .iter()
            .map(|flag| FlagSet {
                target: name.to_string(),
                name: flag.key.clone(),
                flag: flag.clone(),
            })
            .collect()
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("files", &self.files)
            .field("for_commands", &self.for_commands)
            .field("file_ext", &self.file_ext)
            .field("flags", &self.flags)
            .field("order", &self.order)
            .field("header", &self.header.is_some())
            .field("package_templates", &self.package_templates.is_some())
            .field("funcs", &self.funcs.is_some())
            .field("build_context", &self.build_context.is_some())
            .field("post", &self.post.is_some())
            .finish()
    }
}

/// Instance name, falling back to the template name.
fn default_file_name(_config: &RunConfig, tpl: &Template) -> String {
    if tpl.name.is_empty() {
        tpl.template.clone()
    } else {
        tpl.name.clone()
    }
}
