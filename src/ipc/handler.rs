//! Request/response handling for IPC connections.
//!
//! Routes a decoded method call to the addressed role (manager, target or
//! job) and turns the outcome into a `method_return` or `error` reply.

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::broadcast;

use super::call::{
    decode_introspect, CallError, Interface, JobMethod, ManagerMethod, PeerMethod,
    PropertiesMethod, TargetMethod,
};
use super::protocol::{
    decode_message, encode_message, error_name, IpcMessage, MethodCall, ProtocolError,
};
use crate::shutdown::ShutdownCoordinator;
use crate::sysupdate::{
    introspection_xml, Manager, ObjectPath, ObjectRef, Properties, Signal, Target,
};
use crate::telemetry;

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Handles IPC message processing against the object tree.
pub struct IpcHandler {
    manager: Arc<Manager>,
    shutdown: Arc<ShutdownCoordinator>,
}

impl IpcHandler {
    pub fn new(manager: Arc<Manager>, shutdown: Arc<ShutdownCoordinator>) -> Self {
        Self { manager, shutdown }
    }

    pub fn manager(&self) -> &Arc<Manager> {
        &self.manager
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.manager.subscribe()
    }

    /// Process incoming message bytes and return response bytes.
    pub fn process(&self, bytes: &[u8]) -> Result<Vec<u8>, HandlerError> {
        let message = decode_message(bytes)?;
        let response = self.handle_message(message);
        Ok(encode_message(&response)?)
    }

    /// Answer a single message. Subscriptions are connection state and are
    /// handled by the server before reaching this point.
    pub fn handle_message(&self, message: IpcMessage) -> IpcMessage {
        match message {
            IpcMessage::MethodCall(call) => self.handle_call(&call),
            _ => IpcMessage::error(
                None,
                error_name::INVALID_ARGS,
                "Unexpected message type",
            ),
        }
    }

    pub fn handle_call(&self, call: &MethodCall) -> IpcMessage {
        let Some(_guard) = self.shutdown.track() else {
            return reply_error(call, &CallError::ShuttingDown);
        };

        let result = self.dispatch(call);
        telemetry::record_call(&call.interface, &call.member, result.is_ok());
        match result {
            Ok(body) => IpcMessage::method_return(call.serial, body),
            Err(e) => {
                tracing::debug!(
                    path = %call.path,
                    interface = %call.interface,
                    member = %call.member,
                    error = %e,
                    "Call rejected"
                );
                reply_error(call, &e)
            }
        }
    }

    fn dispatch(&self, call: &MethodCall) -> Result<Vec<Value>, CallError> {
        let object = ObjectRef::parse(call.path.as_str())
            .ok_or_else(|| CallError::UnknownObject(call.path.to_string()))?;
        let interface = Interface::parse(&call.interface)?;

        match (&object, interface) {
            (_, Interface::Properties) => self.properties(&object, call),
            (_, Interface::Introspectable) => {
                decode_introspect(&call.member, &call.args)?;
                self.ensure_exists(&object)?;
                Ok(vec![json!(introspection_xml(&object))])
            }
            (ObjectRef::Manager, Interface::Peer) => {
                self.peer(PeerMethod::decode(&call.member, &call.args)?)
            }
            (ObjectRef::Manager, Interface::Manager) => {
                self.manager_method(ManagerMethod::decode(&call.member, &call.args)?)
            }
            (ObjectRef::Target(name), Interface::Target) => {
                let target = self.find_target(name)?;
                target_method(target, TargetMethod::decode(&call.member, &call.args)?)
            }
            (ObjectRef::Job(id), Interface::Job) => {
                let method = JobMethod::decode(&call.member, &call.args)?;
                let job = self
                    .manager
                    .job(*id)
                    .ok_or_else(|| CallError::UnknownObject(call.path.to_string()))?;
                match method {
                    JobMethod::Cancel => {
                        job.cancel();
                        Ok(Vec::new())
                    }
                }
            }
            _ => Err(CallError::UnknownInterface(call.interface.clone())),
        }
    }

    fn find_target(&self, name: &str) -> Result<&Arc<Target>, CallError> {
        self.manager
            .target(name)
            .ok_or_else(|| CallError::UnknownObject(ObjectPath::target(name).to_string()))
    }

    fn ensure_exists(&self, object: &ObjectRef) -> Result<(), CallError> {
        match object {
            ObjectRef::Manager => Ok(()),
            ObjectRef::Target(name) => self.find_target(name).map(|_| ()),
            ObjectRef::Job(id) => self
                .manager
                .job(*id)
                .map(|_| ())
                .ok_or_else(|| CallError::UnknownObject(ObjectPath::job(*id).to_string())),
        }
    }

    fn properties(&self, object: &ObjectRef, call: &MethodCall) -> Result<Vec<Value>, CallError> {
        let method = PropertiesMethod::decode(&call.member, &call.args)?;
        match object {
            ObjectRef::Manager => property_call(&*self.manager, method),
            ObjectRef::Target(name) => property_call(&**self.find_target(name)?, method),
            ObjectRef::Job(id) => {
                let job = self
                    .manager
                    .job(*id)
                    .ok_or_else(|| CallError::UnknownObject(call.path.to_string()))?;
                property_call(&*job, method)
            }
        }
    }

    fn peer(&self, method: PeerMethod) -> Result<Vec<Value>, CallError> {
        match method {
            PeerMethod::Ping => {
                self.manager.ping();
                Ok(Vec::new())
            }
            PeerMethod::GetMachineId => Ok(vec![json!(self.manager.machine_id())]),
        }
    }

    fn manager_method(&self, method: ManagerMethod) -> Result<Vec<Value>, CallError> {
        match method {
            ManagerMethod::ListTargets => {
                let rows: Vec<Value> = self
                    .manager
                    .list_targets()
                    .into_iter()
                    .map(|t| json!([t.class, t.name, t.path]))
                    .collect();
                Ok(vec![Value::Array(rows)])
            }
            ManagerMethod::ListJobs => {
                let rows: Vec<Value> = self
                    .manager
                    .list_jobs()
                    .into_iter()
                    .map(|j| json!([j.id, j.job_type, j.progress, j.path]))
                    .collect();
                Ok(vec![Value::Array(rows)])
            }
            ManagerMethod::ListAppStream => Ok(vec![json!(self.manager.list_appstream())]),
        }
    }
}

fn target_method(target: &Target, method: TargetMethod) -> Result<Vec<Value>, CallError> {
    match method {
        TargetMethod::List { offline } => Ok(vec![json!(target.list(offline))]),
        TargetMethod::Describe { version, offline } => {
            let description = target
                .describe(&version, offline)
                .map_err(|e| CallError::Failed(e.to_string()))?;
            Ok(vec![json!(description)])
        }
        TargetMethod::CheckNew => Ok(vec![json!(target.check_new().unwrap_or_default())]),
        TargetMethod::Update { version, flags } => {
            let started = target.update(&version, flags);
            Ok(vec![
                json!(started.version),
                json!(started.job_id),
                json!(started.job_path),
            ])
        }
        TargetMethod::Vacuum => Ok(vec![json!(target.vacuum())]),
        TargetMethod::GetAppStream => Ok(vec![json!(target.appstream())]),
        TargetMethod::GetVersion => Ok(vec![json!(target.version())]),
    }
}

fn property_call<P: Properties>(
    object: &P,
    method: PropertiesMethod,
) -> Result<Vec<Value>, CallError> {
    match method {
        PropertiesMethod::Get { interface, property } => {
            let value = object.get(&interface, &property)?;
            Ok(vec![json!(value)])
        }
        PropertiesMethod::GetAll { interface } => Ok(vec![json!(object.get_all(&interface))]),
        PropertiesMethod::Set { interface, property, value } => {
            object.set(&interface, &property, value)?;
            Ok(Vec::new())
        }
    }
}

fn reply_error(call: &MethodCall, error: &CallError) -> IpcMessage {
    IpcMessage::error(Some(call.serial), error.name(), error.to_string())
}
