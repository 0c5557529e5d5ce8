use std::path::Path;

use tracing::{debug, error, warn};

use super::report::{Outcome, Report};
use super::{FieldDef, FieldVisitor, Node, NodeMut};
use crate::config::{load_document, locate_all, ConfigError};
use crate::context::Context;
use crate::env::Environment;
use crate::tag::{ConfigDirective, Tag};
use crate::Error;

/// Populates toolboxes from the config files of the active environment.
///
/// ## Example
///
/// ```no_run
/// use envbox::{toolbox, Context, Factory};
/// # use envbox::{Component, ComponentError, Contract};
/// # use std::path::PathBuf;
/// # #[derive(Default, PartialEq)] pub struct Postgres;
/// # impl Component for Postgres {
/// #     fn contract(&self) -> Contract { Contract::FILES }
/// #     fn configure(&mut self, _: &[PathBuf]) -> Result<(), ComponentError> { Ok(()) }
/// # }
/// # envbox::component!(Postgres);
///
/// toolbox! {
///     #[derive(Default)]
///     pub struct App {
///         pub db: Postgres => "postgres",
///     }
/// }
///
/// let factory = Factory::new(Context::default());
/// let mut app = App::default();
/// let report = factory.populate(&mut app, "config")?;
/// println!("{report}");
/// # Ok::<(), envbox::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Factory {
    context: Context,
}

impl Factory {
    pub fn new(context: Context) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Walks `root` depth-first in declaration order and configures every
    /// zero-valued field from the files under `base`.
    ///
    /// The first failure aborts the walk. Fields handled before it keep
    /// their new values.
    pub fn populate(&self, root: &mut dyn Node, base: impl AsRef<Path>) -> Result<Report, Error> {
        let mut report = Report::default();
        self.populate_into(root, base.as_ref(), &mut report)?;
        Ok(report)
    }

    /// Like [`populate`](Self::populate), writing outcomes into `report` so
    /// they remain available when the walk fails.
    pub fn populate_into(
        &self,
        root: &mut dyn Node,
        base: &Path,
        report: &mut Report,
    ) -> Result<(), Error> {
        let root_type = root.type_name();
        let namespace = match root.node_mut() {
            NodeMut::Namespace(namespace) => namespace,
            NodeMut::Optional(slot) => match slot.get_mut() {
                Some(inner) => match inner.node_mut() {
                    NodeMut::Namespace(namespace) => namespace,
                    _ => return Err(Error::InvalidRoot(root_type)),
                },
                None => return Err(Error::InvalidRoot(root_type)),
            },
            _ => return Err(Error::InvalidRoot(root_type)),
        };

        let resolution = self.context.resolve_environment();
        report.environment = resolution.id().to_string();
        debug!(root = root_type, base = %base.display(), "populating toolbox");

        let mut walker = Walker {
            base,
            environment: resolution.environment(),
            case_sensitive: self.context.case_sensitive(),
            prefix: String::new(),
            report,
        };
        namespace.visit_fields(&mut walker)
    }
}

struct Walker<'a> {
    base: &'a Path,
    environment: &'a Environment,
    case_sensitive: bool,
    prefix: String,
    report: &'a mut Report,
}

impl FieldVisitor for Walker<'_> {
    fn visit_field(&mut self, field: FieldDef, node: &mut dyn Node) -> Result<(), Error> {
        let path = if self.prefix.is_empty() {
            field.name.to_string()
        } else {
            format!("{}.{}", self.prefix, field.name)
        };
        let tag = Tag::parse(field.tag);
        if tag.has_directives() {
            warn!(field = %path, tag = field.tag, "value directives are ignored on toolbox fields");
        }
        self.visit(&path, &tag.directive(field.name), node)
    }
}

impl Walker<'_> {
    fn visit(
        &mut self,
        path: &str,
        directive: &ConfigDirective,
        node: &mut dyn Node,
    ) -> Result<(), Error> {
        let type_name = node.type_name();
        let is_zero = node.is_zero();

        match node.node_mut() {
            NodeMut::Scalar => Ok(()),
            _ if directive.omit => {
                debug!(field = path, "omitted");
                self.record(path, type_name, Outcome::Omitted);
                Ok(())
            }
            NodeMut::Optional(slot) => {
                let allocated = slot.get_mut().is_none();
                let recorded = self.report.fields.len();
                let result = self.visit(path, directive, slot.get_or_allocate());
                // Nothing was configured through the slot: an optional scalar stays None.
                if allocated && self.report.fields.len() == recorded {
                    slot.clear();
                }
                result
            }
            _ if !is_zero => {
                debug!(field = path, "already set, skipping");
                self.record(path, type_name, Outcome::Preset);
                Ok(())
            }
            NodeMut::Component(component) => {
                if !component.contract().files {
                    warn!(field = path, type_name, "component does not accept config files");
                    self.record(path, type_name, Outcome::NotConfigurable);
                    return Ok(());
                }

                let files = self.locate(directive);
                match component.configure(&files) {
                    Ok(()) => {
                        debug!(field = path, files = ?files, "configured component");
                        self.record(path, type_name, Outcome::Loaded(files));
                        Ok(())
                    }
                    Err(source) => Err(self.fail(
                        path,
                        type_name,
                        Error::Component {
                            field: path.to_string(),
                            source,
                        },
                    )),
                }
            }
            NodeMut::Namespace(namespace) => {
                self.record(path, type_name, Outcome::Namespace);
                let mut child = Walker {
                    base: self.base,
                    environment: self.environment,
                    case_sensitive: self.case_sensitive,
                    prefix: path.to_string(),
                    report: &mut *self.report,
                };
                namespace.visit_fields(&mut child)
            }
            NodeMut::Collection(collection) => {
                if !collection.element_contract().bytes {
                    warn!(
                        field = path,
                        element = collection.element_type(),
                        "collection elements do not accept encoded documents"
                    );
                    self.record(path, type_name, Outcome::NotConfigurable);
                    return Ok(());
                }

                let files = self.locate(directive);
                if files.is_empty() {
                    let err = ConfigError::FileNotFound {
                        names: directive.names.join("|"),
                        dir: self.base.to_path_buf(),
                    };
                    return Err(self.fail(path, type_name, err.into()));
                }

                let built = load_document(&files)
                    .map_err(Error::from)
                    .and_then(|merged| collection.configure_elements(path, merged.document));
                match built {
                    Ok(labels) => {
                        debug!(field = path, elements = ?labels, "configured collection");
                        self.record(path, type_name, Outcome::Loaded(files));
                        Ok(())
                    }
                    Err(err) => Err(self.fail(path, type_name, err)),
                }
            }
        }
    }

    fn locate(&self, directive: &ConfigDirective) -> Vec<std::path::PathBuf> {
        locate_all(
            self.base,
            &directive.names,
            self.environment,
            self.case_sensitive,
        )
    }

    fn record(&mut self, path: &str, type_name: &'static str, outcome: Outcome) {
        self.report.record(path.to_string(), type_name, outcome);
    }

    fn fail(&mut self, path: &str, type_name: &'static str, err: Error) -> Error {
        error!(field = path, error = %err, "failed to populate field");
        self.record(path, type_name, Outcome::Failed(err.to_string()));
        err
    }
}
