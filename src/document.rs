//! Document - Root of the Schema, Owner of Every Committed Entity
//!
//! CRITICAL: entities become reachable only through `insert_into_parent`,
//! which ALWAYS runs the final validation. No bypass.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::config::SchemaConfig;
use crate::enumeration::Enum;
use crate::error::{Attribute, Declared, Rejected, SchemaError};
use crate::hashing::compute_fingerprint;
use crate::identifier::{Identifier, ImportPath, PackageName};
use crate::ids::{Definition, DocumentTag, EnumId, ImportId, MessageId};
use crate::message::Message;
use crate::references::{ReferenceIndex, TypeSite};
use crate::scope::{replace_validated, DefinitionScope, FlagKind, FlagScope, LabelScope, Site};
use crate::service::Service;
use crate::types::ValueType;

#[cfg(feature = "test-hooks")]
use std::cell::Cell;

#[cfg(feature = "test-hooks")]
thread_local! {
    static COMMIT_VALIDATIONS: Cell<u32> = const { Cell::new(0) };
}

/// Number of commit validations run on this thread.
#[cfg(feature = "test-hooks")]
pub fn get_commit_validation_count() -> u32 {
    COMMIT_VALIDATIONS.with(Cell::get)
}

#[cfg(feature = "test-hooks")]
pub fn reset_commit_validation_count() {
    COMMIT_VALIDATIONS.with(|count| count.set(0));
}

/// Runs the final validation of a tentative builder.
///
/// On failure the builder is handed back untouched.
pub(crate) fn finalize<B, T>(
    builder: B,
    entity: &'static str,
    validate: impl FnOnce(&B) -> Result<T, SchemaError>,
) -> Result<T, Rejected<B>> {
    #[cfg(feature = "test-hooks")]
    COMMIT_VALIDATIONS.with(|count| count.set(count.get() + 1));

    match validate(&builder) {
        Ok(committed) => Ok(committed),
        Err(error) => {
            debug!(entity, %error, "commit rejected");
            Err(Rejected::new(builder, error))
        }
    }
}

/// Something that holds messages and enums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    Document,
    Message(MessageId),
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Container::Document => f.write_str("document"),
            Container::Message(id) => id.fmt(f),
        }
    }
}

/// Clones keep the original's tag, so handles minted before the clone stay
/// usable on both copies.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    #[serde(skip)]
    pub(crate) tag: DocumentTag,
    #[serde(skip)]
    config: SchemaConfig,
    package: Option<PackageName>,
    pub(crate) imports: Vec<Import>,
    pub(crate) services: Vec<Service>,
    /// Every committed message, nested ones included, indexed by id.
    pub(crate) messages: Vec<Message>,
    /// Every committed enum, nested ones included, indexed by id.
    pub(crate) enums: Vec<Enum>,
    pub(crate) top_messages: Vec<MessageId>,
    pub(crate) top_enums: Vec<EnumId>,
    #[serde(skip)]
    pub(crate) references: ReferenceIndex,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            tag: DocumentTag::next(),
            config: SchemaConfig::default(),
            package: None,
            imports: Vec::new(),
            services: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            top_messages: Vec::new(),
            top_enums: Vec::new(),
            references: ReferenceIndex::default(),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SchemaConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    pub fn package(&self) -> Option<&PackageName> {
        self.package.as_ref()
    }

    pub fn set_package(&mut self, value: &str) -> Result<(), SchemaError> {
        self.package = Some(PackageName::new(value)?);
        Ok(())
    }

    /// Removes the package declaration; a document without one stays valid.
    pub fn unset_package(&mut self) {
        self.package = None;
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn import(&self, id: ImportId) -> &Import {
        self.assert_owned(id.1, id);
        &self.imports[id.0]
    }

    pub fn new_import(&self) -> NewImport {
        NewImport::default()
    }

    pub fn import_mut(&mut self, id: ImportId) -> ImportMut<'_> {
        self.import(id);
        ImportMut { doc: self, id }
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Top-level messages in commit order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.top_messages.iter().map(|id| &self.messages[id.0])
    }

    /// Top-level enums in commit order.
    pub fn enums(&self) -> impl Iterator<Item = &Enum> {
        self.top_enums.iter().map(|id| &self.enums[id.0])
    }

    /// Every committed type cell that points at `definition`.
    pub fn references(&self, definition: Definition) -> impl Iterator<Item = TypeSite> + '_ {
        self.references.referrers(definition)
    }

    /// SHA-256 over the canonical JSON form of the committed document.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        compute_fingerprint(self)
    }

    /// Panics when a handle minted by another document is used here.
    #[track_caller]
    pub(crate) fn assert_owned(&self, tag: DocumentTag, id: impl fmt::Display) {
        assert!(tag == self.tag, "{id} belongs to another document");
    }

    pub(crate) fn label_scope(&self, container: Container) -> &dyn LabelScope {
        match container {
            Container::Document => self,
            Container::Message(id) => self.message(id),
        }
    }

    pub(crate) fn definition_scope(&self, definition: Definition) -> &dyn DefinitionScope {
        match definition {
            Definition::Message(id) => self.message(id),
            Definition::Enum(id) => self.enumeration(id),
        }
    }

    pub(crate) fn check_definition(&self, definition: Definition) -> Result<(), SchemaError> {
        let known = match definition {
            Definition::Message(id) => id.1 == self.tag && id.0 < self.messages.len(),
            Definition::Enum(id) => id.1 == self.tag && id.0 < self.enums.len(),
        };
        if known {
            Ok(())
        } else {
            Err(SchemaError::UnknownDefinition(definition))
        }
    }

    pub(crate) fn check_value_type(&self, value: &ValueType) -> Result<(), SchemaError> {
        match value.definition() {
            Some(definition) => self.check_definition(definition),
            None => Ok(()),
        }
    }

    fn validate_import_path(&self, path: &ImportPath, site: Option<Site>) -> Result<(), SchemaError> {
        let taken = self
            .imports
            .iter()
            .any(|i| site != Some(Site::Import(i.id)) && i.path == *path);
        if taken {
            return Err(SchemaError::ImportInUse {
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

/// Top-level declaration labels: services, messages and enums.
impl LabelScope for Document {
    fn validate_label(
        &self,
        _doc: &Document,
        label: &Identifier,
        site: Option<Site>,
    ) -> Result<(), SchemaError> {
        let in_use = |by| {
            Err(SchemaError::LabelInUse {
                label: label.to_string(),
                by,
            })
        };
        for service in &self.services {
            if site != Some(Site::Service(service.id())) && service.label() == label {
                return in_use(Declared::Service);
            }
        }
        for message in self.messages() {
            if site != Some(Site::Message(message.id())) && message.label() == label {
                return in_use(Declared::Message);
            }
        }
        for enumeration in self.enums() {
            if site != Some(Site::Enum(enumeration.id())) && enumeration.label() == label {
                return in_use(Declared::Enum);
            }
        }
        Ok(())
    }
}

impl FlagScope for Document {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Import {
    id: ImportId,
    path: ImportPath,
    public: bool,
}

impl Import {
    pub fn id(&self) -> ImportId {
        self.id
    }

    pub fn path(&self) -> &ImportPath {
        &self.path
    }

    pub fn public(&self) -> bool {
        self.public
    }
}

/// Tentative import.
#[derive(Debug, Clone, Default)]
pub struct NewImport {
    path: Option<ImportPath>,
    public: bool,
}

impl NewImport {
    pub fn path(&self) -> Option<&ImportPath> {
        self.path.as_ref()
    }

    pub fn set_path(&mut self, doc: &Document, value: &str) -> Result<(), SchemaError> {
        let path = ImportPath::new(value)?;
        replace_validated(self, |i| &mut i.path, Some(path), |i| i.check_path(doc)).map(drop)
    }

    pub fn public(&self) -> bool {
        self.public
    }

    pub fn set_public(&mut self, value: bool) {
        self.public = value;
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<ImportId, Rejected<Self>> {
        let id = ImportId(doc.imports.len(), doc.tag);
        let import = finalize(self, "import", |i| i.validated(doc, id))?;
        debug!(%id, path = %import.path, "import committed");
        doc.imports.push(import);
        Ok(id)
    }

    fn check_path(&self, doc: &Document) -> Result<(), SchemaError> {
        match &self.path {
            Some(path) => doc.validate_import_path(path, None),
            None => Err(SchemaError::Unset(Attribute::Path)),
        }
    }

    fn validated(&self, doc: &Document, id: ImportId) -> Result<Import, SchemaError> {
        self.check_path(doc)?;
        let path = self.path.clone().ok_or(SchemaError::Unset(Attribute::Path))?;
        Ok(Import {
            id,
            path,
            public: self.public,
        })
    }
}

pub struct ImportMut<'a> {
    doc: &'a mut Document,
    id: ImportId,
}

impl ImportMut<'_> {
    pub fn set_path(&mut self, value: &str) -> Result<(), SchemaError> {
        let path = ImportPath::new(value)?;
        let id = self.id;
        replace_validated(self.doc, |doc| &mut doc.imports[id.0].path, path, |doc| {
            doc.validate_import_path(&doc.import(id).path, Some(Site::Import(id)))
        })
        .map(drop)
    }

    pub fn set_public(&mut self, value: bool) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| &mut doc.imports[id.0].public, value, |doc| {
            doc.validate_flag(FlagKind::Public, value)
        })
        .map(drop)
    }
}
