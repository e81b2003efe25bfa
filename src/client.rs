//! Typed resource calls and the idempotent upsert.
//!
//! [`ResourceClient`] binds a remote channel to one resource description.
//! Besides the plain operations it offers [`ResourceClient::upsert`], which
//! makes a resource match caller data whether or not it exists yet:
//!
//! 1. resolve one identifier set from the data,
//! 2. probe the remote service with a fetch of just the identity fields,
//! 3. update with the data filtered to the update shape when found, or
//!    create from defaults overlaid with the data, filtered to the create
//!    shape, when the probe is rejected with a remote fault.
//!
//! Transport failures during the probe abort the upsert; they are never read
//! as "not found". Nothing guards the window between probe and write, so a
//! concurrent writer can interleave (last writer wins).

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::defaults::DefaultsRegistry;
use crate::error::{ClientError, RemoteFault, ServiceError};
use crate::identity::{check_identifiers, list_criteria, resolve_identity, ResolvedIdentity, ReturnedTags};
use crate::sanitize::sanitize;
use crate::schema::ResourceSchema;
use crate::service::{Page, RemoteService};
use crate::shape::{filter_to_shape, filter_to_target};
use crate::types::{ChoiceGroup, Operation, Record, ShapeKind, DEFAULT_PREFERRED_KEY};

/// Result of probing for an existing resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    Found(Record),
    NotFound(RemoteFault),
}

/// Branch an upsert took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Created,
    Updated,
}

/// Outcome of [`ResourceClient::upsert`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub action: UpsertAction,
    /// Reference returned by the create or update call.
    pub reference: String,
}

/// Calls on one resource type through a remote channel.
pub struct ResourceClient<'a, S> {
    service: S,
    schema: &'a ResourceSchema,
    defaults: Option<&'a DefaultsRegistry>,
    preferred_key: String,
    filter_depth: usize,
}

impl<'a, S: RemoteService> ResourceClient<'a, S> {
    /// Create a client with the `uuid` surrogate key and depth-1 filtering.
    pub fn new(service: S, schema: &'a ResourceSchema) -> Self {
        Self {
            service,
            schema,
            defaults: None,
            preferred_key: DEFAULT_PREFERRED_KEY.to_string(),
            filter_depth: 1,
        }
    }

    /// Set the registry consulted for create defaults.
    pub fn defaults(mut self, defaults: &'a DefaultsRegistry) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Set the surrogate key preferred during identity resolution.
    pub fn preferred_key(mut self, key: impl Into<String>) -> Self {
        self.preferred_key = key.into();
        self
    }

    /// Set how deep create and update payloads are filtered (default 1).
    pub fn filter_depth(mut self, depth: usize) -> Self {
        self.filter_depth = depth;
        self
    }

    pub fn schema(&self) -> &ResourceSchema {
        self.schema
    }

    /// Resolve the identity `data` addresses.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unsupported` if the description has no fetch request.
    pub fn resolve(&self, data: &Record) -> Result<ResolvedIdentity, ClientError> {
        let choices = self.choices(Operation::Fetch)?;
        Ok(resolve_identity(data, choices, &self.preferred_key))
    }

    /// Probe for an existing resource.
    ///
    /// A remote fault is the "not found" outcome; transport errors are returned as errors.
    pub fn probe(&self, identity: &ResolvedIdentity) -> Result<Probe, ServiceError> {
        let criteria = identity.criteria();
        let returned = identity.returned_tags();
        debug!(resource = self.resource(), ?criteria, "probing for existing resource");

        match self.service.fetch(self.resource(), &criteria, Some(&returned)) {
            Ok(found) => Ok(Probe::Found(found)),
            Err(ServiceError::Fault(fault)) => Ok(Probe::NotFound(fault)),
            Err(e) => Err(e),
        }
    }

    /// Make the remote resource match `data`, creating it if needed.
    ///
    /// Issues exactly one fetch, then exactly one create or update.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unsupported` when the description lacks a create,
    /// update or fetch shape, and `ClientError::Service` for transport failures
    /// and for faults raised by the create or update call.
    pub fn upsert(&self, data: &Record) -> Result<UpsertOutcome, ClientError> {
        let create_shape = self.shape(ShapeKind::Create)?;
        let update_shape = self.shape(ShapeKind::Update)?;
        let identity = self.resolve(data)?;

        match self.probe(&identity)? {
            Probe::Found(_) => {
                let fields = filter_to_shape(data, update_shape, self.filter_depth);
                debug!(resource = self.resource(), fields = fields.len(), "updating");
                let reference = self.service.update(self.resource(), &fields)?;
                info!(resource = self.resource(), %reference, "upsert updated existing resource");
                Ok(UpsertOutcome {
                    action: UpsertAction::Updated,
                    reference,
                })
            }
            Probe::NotFound(fault) => {
                debug!(resource = self.resource(), %fault, "probe rejected, creating");
                let merged = match self.defaults {
                    Some(defaults) => defaults.overlay(self.resource(), data),
                    None => data.clone(),
                };
                let fields = filter_to_shape(&merged, create_shape, self.filter_depth);
                let reference = self.service.create(self.resource(), &fields)?;
                info!(resource = self.resource(), %reference, "upsert created resource");
                Ok(UpsertOutcome {
                    action: UpsertAction::Created,
                    reference,
                })
            }
        }
    }

    /// Fetch one resource.
    ///
    /// `data` must fully supply at least one identifier alternative; it is
    /// reduced to a single alternative before the call. With `sanitized` set,
    /// wire leaf wrappers in the response are collapsed.
    pub fn get(
        &self,
        data: &Record,
        returned: &ReturnedTags,
        sanitized: bool,
    ) -> Result<Record, ClientError> {
        let choices = self.choices(Operation::Fetch)?;
        check_identifiers(choices, data)?;
        let identity = resolve_identity(data, choices, &self.preferred_key);

        let returned = returned.to_record(None);
        let mut found =
            self.service
                .fetch(self.resource(), &identity.criteria(), returned.as_ref())?;
        if sanitized {
            sanitize_record(&mut found);
        }
        Ok(found)
    }

    /// Create a resource from `fields` as given.
    pub fn add(&self, fields: &Record) -> Result<String, ClientError> {
        self.require(Operation::Create)?;
        Ok(self.service.create(self.resource(), fields)?)
    }

    /// Update a resource from `fields` as given.
    pub fn update(&self, fields: &Record) -> Result<String, ClientError> {
        self.require(Operation::Update)?;
        Ok(self.service.update(self.resource(), fields)?)
    }

    /// List resources.
    ///
    /// Unsupported criteria are dropped; with none left the first supported
    /// criterion is searched with `%`. `ReturnedTags::All` requests the whole
    /// list response model.
    pub fn list(
        &self,
        criteria: Option<&Record>,
        returned: &ReturnedTags,
        page: Page,
        sanitized: bool,
    ) -> Result<Vec<Record>, ClientError> {
        self.require(Operation::List)?;
        let criteria = list_criteria(criteria, self.schema.list_criteria())
            .or_else(|| criteria.cloned())
            .unwrap_or_default();
        let model = self.schema.model(ShapeKind::ListResponse, false);
        let returned = returned.to_record(model.as_ref()).unwrap_or_default();

        let mut rows = self
            .service
            .list(self.resource(), &criteria, &returned, page)?;
        if sanitized {
            rows.iter_mut().for_each(sanitize_record);
        }
        Ok(rows)
    }

    /// Remove a resource identified by `data`.
    pub fn remove(&self, data: &Record) -> Result<String, ClientError> {
        let choices = self.choices(Operation::Remove)?;
        check_identifiers(choices, data)?;
        let identity = resolve_identity(data, choices, &self.preferred_key);
        Ok(self.service.remove(self.resource(), &identity.criteria())?)
    }

    /// Push pending configuration to the device identified by `data`.
    pub fn apply(&self, data: &Record) -> Result<String, ClientError> {
        self.perform(Operation::Apply, data)
    }

    /// Restart the device identified by `data`.
    pub fn restart(&self, data: &Record) -> Result<String, ClientError> {
        self.perform(Operation::Restart, data)
    }

    /// Reset the device identified by `data`.
    pub fn reset(&self, data: &Record) -> Result<String, ClientError> {
        self.perform(Operation::Reset, data)
    }

    /// Run a device action the description declares.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unsupported` for record operations and for
    /// actions the resource does not declare.
    pub fn perform(&self, action: Operation, data: &Record) -> Result<String, ClientError> {
        if !action.is_action() {
            return Err(self.unsupported(action));
        }
        self.require(action)?;
        let choices = self.choices(action)?;
        check_identifiers(choices, data)?;
        let identity = resolve_identity(data, choices, &self.preferred_key);
        info!(resource = self.resource(), %action, "device action");
        Ok(self
            .service
            .perform(action, self.resource(), &identity.criteria())?)
    }

    /// Empty model for a shape.
    pub fn model(&self, kind: ShapeKind, include_types: bool) -> Result<Record, ClientError> {
        self.schema
            .model(kind, include_types)
            .ok_or_else(|| self.unsupported(kind.operation()))
    }

    /// Reshape a fetched record into a create request for this resource.
    pub fn create_request_from(&self, fetched: &Record) -> Result<Record, ClientError> {
        let target = Value::Object(self.model(ShapeKind::Create, false)?);
        match filter_to_target(&Value::Object(fetched.clone()), &target)? {
            Value::Object(request) => Ok(request),
            // filter_to_target only returns non-objects for wire leaves
            _ => Ok(Record::new()),
        }
    }

    fn resource(&self) -> &str {
        self.schema.resource()
    }

    fn choices(&self, operation: Operation) -> Result<&'a ChoiceGroup, ClientError> {
        self.schema
            .choice_groups()
            .ok_or_else(|| self.unsupported(operation))
    }

    fn shape(&self, kind: ShapeKind) -> Result<&'a Record, ClientError> {
        self.schema
            .shape(kind)
            .ok_or_else(|| self.unsupported(kind.operation()))
    }

    fn require(&self, operation: Operation) -> Result<(), ClientError> {
        if self.schema.supports(operation) {
            Ok(())
        } else {
            Err(self.unsupported(operation))
        }
    }

    fn unsupported(&self, operation: Operation) -> ClientError {
        ClientError::Unsupported {
            resource: self.resource().to_string(),
            operation,
        }
    }
}

fn sanitize_record(record: &mut Record) {
    let mut value = Value::Object(std::mem::take(record));
    sanitize(&mut value);
    if let Value::Object(map) = value {
        *record = map;
    }
}
