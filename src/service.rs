//! Services - RPC Containers
//!
//! Service labels share the top-level namespace with messages and enums.
//! Each RPC names a committed request and response message, either of which
//! may be streamed.

use serde::Serialize;
use tracing::debug;

use crate::document::{finalize, Document};
use crate::error::{Attribute, Declared, Rejected, SchemaError};
use crate::identifier::Identifier;
use crate::ids::{MessageId, RpcId, ServiceId};
use crate::references::TypeSite;
use crate::scope::{replace_validated, FlagKind, FlagScope, LabelScope, Site};
use crate::types::MessageType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Service {
    id: ServiceId,
    label: Identifier,
    rpcs: Vec<Rpc>,
}

impl Service {
    pub fn id(&self) -> ServiceId {
        self.id
    }

    pub fn label(&self) -> &Identifier {
        &self.label
    }

    pub fn rpcs(&self) -> &[Rpc] {
        &self.rpcs
    }

    pub fn new_rpc(&self) -> NewRpc {
        NewRpc {
            service: self.id,
            label: None,
            request: None,
            request_stream: false,
            response: None,
            response_stream: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rpc {
    id: RpcId,
    label: Identifier,
    request: MessageType,
    response: MessageType,
}

impl Rpc {
    pub fn id(&self) -> RpcId {
        self.id
    }

    pub fn label(&self) -> &Identifier {
        &self.label
    }

    pub fn request(&self) -> MessageType {
        self.request
    }

    pub fn response(&self) -> MessageType {
        self.response
    }
}

impl LabelScope for Service {
    fn validate_label(
        &self,
        _doc: &Document,
        label: &Identifier,
        site: Option<Site>,
    ) -> Result<(), SchemaError> {
        let taken = self
            .rpcs
            .iter()
            .any(|rpc| site != Some(Site::Rpc(rpc.id)) && rpc.label == *label);
        if taken {
            return Err(SchemaError::LabelInUse {
                label: label.to_string(),
                by: Declared::Rpc,
            });
        }
        Ok(())
    }
}

impl FlagScope for Service {}

impl Document {
    pub fn service(&self, id: ServiceId) -> &Service {
        self.assert_owned(id.1, id);
        &self.services[id.0]
    }

    pub fn service_mut(&mut self, id: ServiceId) -> ServiceMut<'_> {
        self.service(id);
        ServiceMut { doc: self, id }
    }

    pub fn new_service(&self) -> NewService {
        NewService { label: None }
    }

    pub fn rpc(&self, id: RpcId) -> &Rpc {
        &self.service(id.service()).rpcs[id.index]
    }

    pub fn rpc_mut(&mut self, id: RpcId) -> RpcMut<'_> {
        self.rpc(id);
        RpcMut { doc: self, id }
    }
}

fn rpc_entry(doc: &mut Document, id: RpcId) -> &mut Rpc {
    &mut doc.services[id.service.0].rpcs[id.index]
}

/// Tentative service.
#[derive(Debug, Clone)]
pub struct NewService {
    label: Option<Identifier>,
}

impl NewService {
    pub fn label(&self) -> Option<&Identifier> {
        self.label.as_ref()
    }

    pub fn set_label(&mut self, doc: &Document, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        replace_validated(self, |s| &mut s.label, Some(label), |s| s.check_label(doc).map(drop))
            .map(drop)
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<ServiceId, Rejected<Self>> {
        let id = ServiceId(doc.services.len(), doc.tag);
        let service = finalize(self, "service", |s| {
            Ok(Service {
                id,
                label: s.check_label(doc)?,
                rpcs: Vec::new(),
            })
        })?;
        debug!(%id, label = %service.label, "service committed");
        doc.services.push(service);
        Ok(id)
    }

    fn check_label(&self, doc: &Document) -> Result<Identifier, SchemaError> {
        let label = self.label.as_ref().ok_or(SchemaError::Unset(Attribute::Label))?;
        doc.validate_label(doc, label, None)?;
        Ok(label.clone())
    }
}

/// Tentative RPC.
#[derive(Debug, Clone)]
pub struct NewRpc {
    service: ServiceId,
    label: Option<Identifier>,
    request: Option<MessageId>,
    request_stream: bool,
    response: Option<MessageId>,
    response_stream: bool,
}

impl NewRpc {
    pub fn service(&self) -> ServiceId {
        self.service
    }

    pub fn label(&self) -> Option<&Identifier> {
        self.label.as_ref()
    }

    pub fn request(&self) -> Option<MessageType> {
        self.request
            .map(|message| MessageType::new(message, self.request_stream))
    }

    pub fn response(&self) -> Option<MessageType> {
        self.response
            .map(|message| MessageType::new(message, self.response_stream))
    }

    pub fn set_label(&mut self, doc: &Document, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        replace_validated(self, |r| &mut r.label, Some(label), |r| r.check_label(doc).map(drop))
            .map(drop)
    }

    pub fn set_request(&mut self, doc: &Document, message: MessageId) -> Result<(), SchemaError> {
        doc.check_definition(message.into())?;
        self.request = Some(message);
        Ok(())
    }

    pub fn set_request_stream(&mut self, value: bool) {
        self.request_stream = value;
    }

    pub fn set_response(&mut self, doc: &Document, message: MessageId) -> Result<(), SchemaError> {
        doc.check_definition(message.into())?;
        self.response = Some(message);
        Ok(())
    }

    pub fn set_response_stream(&mut self, value: bool) {
        self.response_stream = value;
    }

    pub fn insert_into_parent(self, doc: &mut Document) -> Result<RpcId, Rejected<Self>> {
        let id = RpcId {
            service: self.service,
            index: doc.service(self.service).rpcs.len(),
        };
        let rpc = finalize(self, "rpc", |r| r.validated(doc, id))?;
        debug!(parent = %id.service(), label = %rpc.label, "rpc committed");
        doc.references
            .rebind(TypeSite::RpcRequest(id), None, Some(rpc.request.message().into()));
        doc.references
            .rebind(TypeSite::RpcResponse(id), None, Some(rpc.response.message().into()));
        doc.services[id.service.0].rpcs.push(rpc);
        Ok(id)
    }

    fn check_label(&self, doc: &Document) -> Result<Identifier, SchemaError> {
        let label = self.label.as_ref().ok_or(SchemaError::Unset(Attribute::Label))?;
        doc.service(self.service).validate_label(doc, label, None)?;
        Ok(label.clone())
    }

    fn validated(&self, doc: &Document, id: RpcId) -> Result<Rpc, SchemaError> {
        let label = self.check_label(doc)?;
        let request = self.request().ok_or(SchemaError::Unset(Attribute::Request))?;
        let response = self.response().ok_or(SchemaError::Unset(Attribute::Response))?;
        doc.check_definition(request.message().into())?;
        doc.check_definition(response.message().into())?;
        Ok(Rpc {
            id,
            label,
            request,
            response,
        })
    }
}

pub struct ServiceMut<'a> {
    doc: &'a mut Document,
    id: ServiceId,
}

impl ServiceMut<'_> {
    pub fn set_label(&mut self, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        let id = self.id;
        replace_validated(self.doc, |doc| &mut doc.services[id.0].label, label, |doc| {
            doc.validate_label(doc, &doc.service(id).label, Some(Site::Service(id)))
        })
        .map(drop)
    }
}

pub struct RpcMut<'a> {
    doc: &'a mut Document,
    id: RpcId,
}

impl RpcMut<'_> {
    pub fn set_label(&mut self, value: &str) -> Result<(), SchemaError> {
        let label = Identifier::new(value)?;
        let id = self.id;
        replace_validated(self.doc, |doc| &mut rpc_entry(doc, id).label, label, |doc| {
            doc.service(id.service())
                .validate_label(doc, &doc.rpc(id).label, Some(Site::Rpc(id)))
        })
        .map(drop)
    }

    pub fn set_request(&mut self, message: MessageId) -> Result<(), SchemaError> {
        let id = self.id;
        let previous = replace_validated(
            self.doc,
            |doc| rpc_entry(doc, id).request.message_mut(),
            message,
            |doc| doc.check_definition(message.into()),
        )?;
        self.doc.references.rebind(
            TypeSite::RpcRequest(id),
            Some(previous.into()),
            Some(message.into()),
        );
        Ok(())
    }

    pub fn set_request_stream(&mut self, value: bool) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| rpc_entry(doc, id).request.stream_mut(), value, |doc| {
            doc.service(id.service()).validate_flag(FlagKind::Stream, value)
        })
        .map(drop)
    }

    pub fn set_response(&mut self, message: MessageId) -> Result<(), SchemaError> {
        let id = self.id;
        let previous = replace_validated(
            self.doc,
            |doc| rpc_entry(doc, id).response.message_mut(),
            message,
            |doc| doc.check_definition(message.into()),
        )?;
        self.doc.references.rebind(
            TypeSite::RpcResponse(id),
            Some(previous.into()),
            Some(message.into()),
        );
        Ok(())
    }

    pub fn set_response_stream(&mut self, value: bool) -> Result<(), SchemaError> {
        let id = self.id;
        replace_validated(self.doc, |doc| rpc_entry(doc, id).response.stream_mut(), value, |doc| {
            doc.service(id.service()).validate_flag(FlagKind::Stream, value)
        })
        .map(drop)
    }
}
