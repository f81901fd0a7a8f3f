//! Ports: the connection points of a node.
//!
//! A [`Port`] is a plain value holder; inlets and outlets are ports with an
//! [`PortRole`] attached. Ports only hold ids of the ports and nodes they are
//! linked with; all graph operations live on [`crate::Patch`].

use crate::node::NodeView;
use crate::{NodeId, TypeCheck, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

pub type PortId = Uuid;

/// Hook an outlet evaluates against its owner to compute the current output
pub type OutletHook = Arc<dyn Fn(&NodeView<'_>) -> Value + Send + Sync>;

/// Connection status of a port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    #[default]
    NotConnected,
    Connected,
    TypeMismatch,
}

impl ConnectionStatus {
    /// Status after a value delivery that did or did not pass type checking
    pub fn after_delivery(self, type_ok: bool) -> Self {
        if type_ok {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::TypeMismatch
        }
    }
}

/// Something subscribed to a port's value changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observer {
    Port(PortId),
    Node(NodeId),
}

#[derive(Clone)]
pub enum PortRole {
    Plain,
    Inlet {
        hot: bool,
    },
    Outlet {
        hook: Option<OutletHook>,
        enforce_type: bool,
    },
}

impl fmt::Debug for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortRole::Plain => write!(f, "Plain"),
            PortRole::Inlet { hot } => f.debug_struct("Inlet").field("hot", hot).finish(),
            PortRole::Outlet { hook, enforce_type } => f
                .debug_struct("Outlet")
                .field("hook", &hook.is_some())
                .field("enforce_type", enforce_type)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Port {
    pub(crate) id: PortId,
    pub(crate) name: String,
    pub(crate) owner: Option<NodeId>,
    pub(crate) value: Value,
    pub(crate) open: bool,
    pub(crate) status: ConnectionStatus,
    pub(crate) accepts: TypeCheck,
    pub(crate) role: PortRole,
    /// Ports this port observes
    pub(crate) observed: Vec<PortId>,
    /// Ports and nodes observing this port, in subscription order
    pub(crate) subscribers: Vec<Observer>,
    pub(crate) forward: Option<PortId>,
    /// Outlet: connected inlets in order. Inlet: source outlets.
    pub(crate) connections: Vec<PortId>,
}

impl Port {
    /// Create a plain port
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_role(name, PortRole::Plain)
    }

    pub fn hot_inlet(name: impl Into<String>) -> Self {
        Self::with_role(name, PortRole::Inlet { hot: true })
    }

    pub fn cold_inlet(name: impl Into<String>) -> Self {
        Self::with_role(name, PortRole::Inlet { hot: false })
    }

    pub fn outlet(name: impl Into<String>) -> Self {
        Self::with_role(
            name,
            PortRole::Outlet {
                hook: None,
                enforce_type: false,
            },
        )
    }

    fn with_role(name: impl Into<String>, role: PortRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            owner: None,
            value: Value::Null,
            open: true,
            status: ConnectionStatus::NotConnected,
            accepts: TypeCheck::any(),
            role,
            observed: Vec::new(),
            subscribers: Vec::new(),
            forward: None,
            connections: Vec::new(),
        }
    }

    /// Restrict the values this port accepts
    pub fn accepting(mut self, check: TypeCheck) -> Self {
        self.accepts = check;
        self
    }

    /// Install a production hook. Has no effect on ports that are not outlets.
    pub fn with_hook(
        mut self,
        f: impl Fn(&NodeView<'_>) -> Value + Send + Sync + 'static,
    ) -> Self {
        if let PortRole::Outlet { hook, .. } = &mut self.role {
            *hook = Some(Arc::new(f));
        }
        self
    }

    /// Make an outlet drop values that fail its type check instead of emitting them
    pub fn enforcing_output_type(mut self) -> Self {
        if let PortRole::Outlet { enforce_type, .. } = &mut self.role {
            *enforce_type = true;
        }
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    pub fn id(&self) -> PortId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> Option<NodeId> {
        self.owner
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn role(&self) -> &PortRole {
        &self.role
    }

    pub fn is_inlet(&self) -> bool {
        matches!(self.role, PortRole::Inlet { .. })
    }

    pub fn is_outlet(&self) -> bool {
        matches!(self.role, PortRole::Outlet { .. })
    }

    /// `Some(true)` for hot inlets, `Some(false)` for cold inlets, `None` otherwise
    pub fn is_hot(&self) -> Option<bool> {
        match self.role {
            PortRole::Inlet { hot } => Some(hot),
            _ => None,
        }
    }

    pub fn type_ok(&self, value: &Value) -> bool {
        self.accepts.accepts(value)
    }

    pub fn type_check(&self) -> &TypeCheck {
        &self.accepts
    }

    pub fn observed_ports(&self) -> &[PortId] {
        &self.observed
    }

    pub fn subscribers(&self) -> &[Observer] {
        &self.subscribers
    }

    pub fn forward_target(&self) -> Option<PortId> {
        self.forward
    }

    pub fn connections(&self) -> &[PortId] {
        &self.connections
    }

    /// Stable key external observers subscribe with
    pub fn notification_name(&self) -> String {
        notification_name(self.id)
    }

    pub(crate) fn hook(&self) -> Option<OutletHook> {
        match &self.role {
            PortRole::Outlet { hook, .. } => hook.clone(),
            _ => None,
        }
    }

    pub(crate) fn enforces_type(&self) -> bool {
        matches!(self.role, PortRole::Outlet { enforce_type: true, .. })
    }

    /// Close the port and drop every link it holds. Peers are not touched.
    pub(crate) fn reset(&mut self) {
        self.open = false;
        self.status = ConnectionStatus::NotConnected;
        self.observed.clear();
        self.subscribers.clear();
        self.forward = None;
        self.connections.clear();
    }
}

pub fn notification_name(id: PortId) -> String {
    format!("patchcore.port.{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValueKind;

    #[test]
    fn test_new_port_defaults() {
        let port = Port::new("value");
        assert!(port.is_open());
        assert_eq!(port.connection_status(), ConnectionStatus::NotConnected);
        assert!(port.owner().is_none());
        assert!(port.value().is_null());
        assert_eq!(port.is_hot(), None);
    }

    #[test]
    fn test_inlet_temperature_is_fixed_by_constructor() {
        assert_eq!(Port::hot_inlet("left").is_hot(), Some(true));
        assert_eq!(Port::cold_inlet("right").is_hot(), Some(false));
        assert!(Port::outlet("out").is_outlet());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = Port::new("a");
        let b = Port::new("a");
        assert_ne!(a.id(), b.id());
        assert_ne!(a.notification_name(), b.notification_name());
    }

    #[test]
    fn test_notification_name_is_stable() {
        let port = Port::new("a");
        assert_eq!(port.notification_name(), port.notification_name());
        assert!(port.notification_name().ends_with(&port.id().to_string()));
    }

    #[test]
    fn test_hook_only_applies_to_outlets() {
        let inlet = Port::hot_inlet("in").with_hook(|_| Value::Bang);
        assert!(inlet.hook().is_none());
        let outlet = Port::outlet("out").with_hook(|_| Value::Bang).enforcing_output_type();
        assert!(outlet.hook().is_some());
        assert!(outlet.enforces_type());
    }

    #[test]
    fn test_status_after_delivery() {
        use ConnectionStatus::*;
        assert_eq!(NotConnected.after_delivery(true), Connected);
        assert_eq!(Connected.after_delivery(false), TypeMismatch);
        assert_eq!(TypeMismatch.after_delivery(true), Connected);
    }

    #[test]
    fn test_reset_closes_port() {
        let mut port = Port::hot_inlet("in").accepting(TypeCheck::only(ValueKind::Number));
        port.status = ConnectionStatus::Connected;
        port.connections.push(Uuid::new_v4());
        port.forward = Some(Uuid::new_v4());
        port.reset();
        assert!(!port.is_open());
        assert_eq!(port.connection_status(), ConnectionStatus::NotConnected);
        assert!(port.connections().is_empty());
        assert!(port.forward_target().is_none());
    }
}
