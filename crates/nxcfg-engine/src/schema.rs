//! Property schemas for resource kinds.
//!
//! A [`ResourceKind`] is pure data: identity-field names, property
//! descriptors, joint setter groups, an optional gate property, and
//! cross-property constraints. The delta engine and reconciler are generic
//! routines driven entirely by this schema; concrete resources only declare
//! one of these.
//!
//! Schema validation is deliberately strict and happens once, at
//! registration. A malformed schema is a programming error, not a runtime
//! condition, so `build()` fails fast rather than letting a bad definition
//! reach reconciliation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use nxcfg_types::PropertyValue;

use crate::error::{ReconcileError, ReconcileResult};

/// Category of a property's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Free-form scalar (string or integer), compared type-insensitively.
    Scalar,
    /// Boolean toggle.
    Bool,
    /// List of scalars, compared as a sorted set.
    List,
    /// Scalar whose canonical form is the VLAN range encoding.
    VlanRange,
}

impl ValueKind {
    /// Name for logs and `describe` output.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Scalar => "scalar",
            ValueKind::Bool => "bool",
            ValueKind::List => "list",
            ValueKind::VlanRange => "vlan_range",
        }
    }
}

/// Descriptor for a single property.
#[derive(Debug, Clone)]
pub struct PropertySpec {
    /// Property name.
    pub name: String,
    /// Value category.
    pub kind: ValueKind,
    /// Device default, used to resolve the `Default` sentinel and to
    /// backfill joint-group members the instance never had set.
    pub default: PropertyValue,
    /// Override for the `Unset` sentinel. When absent, a kind-derived
    /// representation is used (empty string, `false`, empty list).
    pub unset_override: Option<PropertyValue>,
}

impl PropertySpec {
    /// Creates a descriptor.
    pub fn new(
        name: impl Into<String>,
        kind: ValueKind,
        default: impl Into<PropertyValue>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            default: default.into(),
            unset_override: None,
        }
    }

    /// Sets the device-specific unset representation.
    pub fn with_unset(mut self, value: impl Into<PropertyValue>) -> Self {
        self.unset_override = Some(value.into());
        self
    }

    /// The value the `Unset` sentinel resolves to for this property.
    pub fn unset_value(&self) -> PropertyValue {
        match &self.unset_override {
            Some(v) => v.clone(),
            None => match self.kind {
                ValueKind::Scalar | ValueKind::VlanRange => PropertyValue::str(""),
                ValueKind::Bool => PropertyValue::Bool(false),
                ValueKind::List => PropertyValue::List(Vec::new()),
            },
        }
    }
}

/// A set of properties the device only accepts via one combined command.
#[derive(Debug, Clone)]
pub struct JointGroup {
    /// Group id, also the command selector passed to the driver.
    pub id: String,
    /// Member property names, in argument order.
    pub members: Vec<String>,
}

/// The property whose transition direction constrains mutation ordering.
#[derive(Debug, Clone)]
pub struct GateProperty {
    /// Gate property name; must be a `Bool` property.
    pub name: String,
    /// The boolean value meaning "object is active". An NX-OS style
    /// `shutdown` toggle is a gate with `enabled_when = false`.
    pub enabled_when: bool,
}

/// Cross-property precondition checked before delta construction.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// At most one of these properties may be managed to a value.
    MutuallyExclusive {
        /// The exclusive property names.
        properties: Vec<String>,
    },
    /// Managing `property` requires `requires` to be managed alongside it
    /// or already configured on the instance.
    RequiresSibling {
        /// The dependent property.
        property: String,
        /// Its required sibling.
        requires: String,
    },
}

/// Immutable schema for one configurable object type.
#[derive(Debug, Clone)]
pub struct ResourceKind {
    name: String,
    identity_fields: Vec<String>,
    properties: Vec<PropertySpec>,
    joint_groups: Vec<JointGroup>,
    gate: Option<GateProperty>,
    constraints: Vec<Constraint>,
    member_to_group: HashMap<String, String>,
}

impl ResourceKind {
    /// Starts a schema definition.
    pub fn builder(name: impl Into<String>) -> ResourceKindBuilder {
        ResourceKindBuilder {
            name: name.into(),
            identity_fields: Vec::new(),
            properties: Vec::new(),
            joint_groups: Vec::new(),
            gate: None,
            constraints: Vec::new(),
        }
    }

    /// The kind name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered identity-field names.
    pub fn identity_fields(&self) -> &[String] {
        &self.identity_fields
    }

    /// Property descriptors in declaration (setter) order.
    pub fn properties(&self) -> &[PropertySpec] {
        &self.properties
    }

    /// Looks up one property descriptor.
    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Joint setter groups in application order.
    pub fn joint_groups(&self) -> &[JointGroup] {
        &self.joint_groups
    }

    /// The group a property belongs to, if any.
    pub fn group_of(&self, property: &str) -> Option<&str> {
        self.member_to_group.get(property).map(|s| s.as_str())
    }

    /// The gate property, if declared.
    pub fn gate(&self) -> Option<&GateProperty> {
        self.gate.as_ref()
    }

    /// Cross-property constraints.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

/// Builder collecting a schema definition; `build()` validates it.
#[derive(Debug)]
pub struct ResourceKindBuilder {
    name: String,
    identity_fields: Vec<String>,
    properties: Vec<PropertySpec>,
    joint_groups: Vec<JointGroup>,
    gate: Option<GateProperty>,
    constraints: Vec<Constraint>,
}

impl ResourceKindBuilder {
    /// Declares the ordered identity fields.
    pub fn identity<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identity_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a scalar property.
    pub fn scalar(mut self, name: &str, default: impl Into<PropertyValue>) -> Self {
        self.properties
            .push(PropertySpec::new(name, ValueKind::Scalar, default));
        self
    }

    /// Adds a boolean property.
    pub fn boolean(mut self, name: &str, default: bool) -> Self {
        self.properties
            .push(PropertySpec::new(name, ValueKind::Bool, default));
        self
    }

    /// Adds a list-valued property.
    pub fn list(mut self, name: &str) -> Self {
        self.properties.push(PropertySpec::new(
            name,
            ValueKind::List,
            PropertyValue::List(Vec::new()),
        ));
        self
    }

    /// Adds a VLAN-range property.
    pub fn vlan_range(mut self, name: &str, default: impl Into<PropertyValue>) -> Self {
        self.properties
            .push(PropertySpec::new(name, ValueKind::VlanRange, default));
        self
    }

    /// Adds a pre-built descriptor (for unset overrides etc.).
    pub fn property(mut self, spec: PropertySpec) -> Self {
        self.properties.push(spec);
        self
    }

    /// Declares a joint setter group over existing properties.
    pub fn joint_group<I, S>(mut self, id: &str, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.joint_groups.push(JointGroup {
            id: id.to_string(),
            members: members.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declares the gate property and its active polarity.
    pub fn gate(mut self, name: &str, enabled_when: bool) -> Self {
        self.gate = Some(GateProperty {
            name: name.to_string(),
            enabled_when,
        });
        self
    }

    /// Declares a mutual-exclusion constraint.
    pub fn mutually_exclusive<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.push(Constraint::MutuallyExclusive {
            properties: properties.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declares a required-sibling constraint.
    pub fn requires(mut self, property: &str, sibling: &str) -> Self {
        self.constraints.push(Constraint::RequiresSibling {
            property: property.to_string(),
            requires: sibling.to_string(),
        });
        self
    }

    /// Validates and freezes the schema.
    pub fn build(self) -> ReconcileResult<ResourceKind> {
        let fail = |message: String| Err(ReconcileError::schema(&self.name, message));

        if self.identity_fields.is_empty() {
            return fail("identity-field list is empty".to_string());
        }
        let mut identity_seen = HashSet::new();
        for field in &self.identity_fields {
            if !identity_seen.insert(field.as_str()) {
                return fail(format!("duplicate identity field '{}'", field));
            }
        }

        let mut names = HashSet::new();
        for prop in &self.properties {
            if identity_seen.contains(prop.name.as_str()) {
                return fail(format!(
                    "property '{}' collides with an identity field",
                    prop.name
                ));
            }
            if !names.insert(prop.name.as_str()) {
                return fail(format!("duplicate property '{}'", prop.name));
            }
        }

        let mut member_to_group = HashMap::new();
        let mut group_ids = HashSet::new();
        for group in &self.joint_groups {
            if !group_ids.insert(group.id.as_str()) {
                return fail(format!("duplicate joint group '{}'", group.id));
            }
            if group.members.is_empty() {
                return fail(format!("joint group '{}' has no members", group.id));
            }
            for member in &group.members {
                if !names.contains(member.as_str()) {
                    return fail(format!(
                        "joint group '{}' references unknown property '{}'",
                        group.id, member
                    ));
                }
                if member_to_group
                    .insert(member.clone(), group.id.clone())
                    .is_some()
                {
                    return fail(format!(
                        "property '{}' belongs to more than one joint group",
                        member
                    ));
                }
            }
        }

        if let Some(gate) = &self.gate {
            match self.properties.iter().find(|p| p.name == gate.name) {
                None => return fail(format!("gate references unknown property '{}'", gate.name)),
                Some(spec) if spec.kind != ValueKind::Bool => {
                    return fail(format!("gate property '{}' must be boolean", gate.name))
                }
                Some(_) => {}
            }
            if member_to_group.contains_key(&gate.name) {
                return fail(format!(
                    "gate property '{}' cannot belong to a joint group",
                    gate.name
                ));
            }
        }

        for constraint in &self.constraints {
            match constraint {
                Constraint::MutuallyExclusive { properties } => {
                    if properties.len() < 2 {
                        return fail("mutual exclusion needs at least two properties".to_string());
                    }
                    for p in properties {
                        if !names.contains(p.as_str()) {
                            return fail(format!("constraint references unknown property '{}'", p));
                        }
                    }
                }
                Constraint::RequiresSibling { property, requires } => {
                    for p in [property, requires] {
                        if !names.contains(p.as_str()) {
                            return fail(format!("constraint references unknown property '{}'", p));
                        }
                    }
                }
            }
        }

        Ok(ResourceKind {
            name: self.name,
            identity_fields: self.identity_fields,
            properties: self.properties,
            joint_groups: self.joint_groups,
            gate: self.gate,
            constraints: self.constraints,
            member_to_group,
        })
    }
}

/// Registry of resource kinds, keyed by name.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    kinds: BTreeMap<String, Arc<ResourceKind>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a kind. Duplicate names are a schema error.
    pub fn register(&mut self, kind: ResourceKind) -> ReconcileResult<()> {
        let name = kind.name().to_string();
        if self.kinds.contains_key(&name) {
            return Err(ReconcileError::schema(&name, "kind already registered"));
        }
        self.kinds.insert(name, Arc::new(kind));
        Ok(())
    }

    /// Looks up a kind's schema for reconciliation or introspection.
    pub fn describe(&self, name: &str) -> Option<Arc<ResourceKind>> {
        self.kinds.get(name).cloned()
    }

    /// All registered kind names, sorted.
    pub fn kind_names(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }
}
