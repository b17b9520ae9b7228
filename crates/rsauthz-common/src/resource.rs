//! Resource descriptions for check and list requests.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::ident::{
    format_group_resource, new_folder_ident, new_group_resource_ident, new_resource_ident,
    new_typed_ident, TYPE_FOLDER, TYPE_RESOURCE, TYPE_SERVICE_ACCOUNT, TYPE_TEAM, TYPE_USER,
};
use crate::relations::{RELATIONS_FOLDER, RELATIONS_RESOURCE, RELATIONS_TYPED, VERB_CREATE};
use crate::tuple::{PARAM_REQUESTED_GROUP, PARAM_SUBRESOURCE};

pub const FOLDER_GROUP: &str = "folder.grafana.app";
pub const FOLDER_RESOURCE: &str = "folders";
pub const DASHBOARD_GROUP: &str = "dashboard.grafana.app";
pub const DASHBOARD_RESOURCE: &str = "dashboards";
pub const IAM_GROUP: &str = "iam.grafana.app";
pub const TEAM_RESOURCE: &str = "teams";
pub const USER_RESOURCE: &str = "users";
pub const SERVICE_ACCOUNT_RESOURCE: &str = "serviceaccounts";

/// Root folder that resources without a folder are created in.
pub const GENERAL_FOLDER_UID: &str = "general";

/// Store type and relation vocabulary of a first-class resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub relations: &'static [&'static str],
}

/// Returns the type info when `group/resource` is a typed resource.
pub fn typed_resource(group: &str, resource: &str) -> Option<TypeInfo> {
    let type_name = match (group, resource) {
        (FOLDER_GROUP, FOLDER_RESOURCE) => TYPE_FOLDER,
        (IAM_GROUP, TEAM_RESOURCE) => TYPE_TEAM,
        (IAM_GROUP, USER_RESOURCE) => TYPE_USER,
        (IAM_GROUP, SERVICE_ACCOUNT_RESOURCE) => TYPE_SERVICE_ACCOUNT,
        _ => return None,
    };
    let relations = if type_name == TYPE_FOLDER {
        RELATIONS_FOLDER
    } else {
        RELATIONS_TYPED
    };
    Some(TypeInfo {
        type_name,
        relations,
    })
}

/// The resource a check or list request is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    /// `resource` for generic platform resources, otherwise the store type.
    pub type_name: &'static str,
    pub group: String,
    pub resource: String,
    pub name: String,
    pub folder: String,
    pub subresource: String,
    pub relations: &'static [&'static str],
}

impl ResourceInfo {
    pub fn new(
        group: impl Into<String>,
        resource: impl Into<String>,
        subresource: impl Into<String>,
        name: impl Into<String>,
        folder: impl Into<String>,
    ) -> Self {
        let group = group.into();
        let resource = resource.into();
        let info = typed_resource(&group, &resource).unwrap_or(TypeInfo {
            type_name: TYPE_RESOURCE,
            relations: RELATIONS_RESOURCE,
        });
        Self {
            type_name: info.type_name,
            group,
            resource,
            name: name.into(),
            folder: folder.into(),
            subresource: subresource.into(),
            relations: info.relations,
        }
    }

    /// Builds the resource for a request carrying `verb`.
    ///
    /// Creating a folder without a name, or a resource without a folder,
    /// happens in the root folder.
    pub fn for_verb(
        verb: &str,
        group: impl Into<String>,
        resource: impl Into<String>,
        subresource: impl Into<String>,
        name: impl Into<String>,
        folder: impl Into<String>,
    ) -> Self {
        let mut info = Self::new(group, resource, subresource, name, folder);
        if verb == VERB_CREATE {
            if info.is_folder_resource() && info.name.is_empty() {
                info.name = GENERAL_FOLDER_UID.to_string();
            } else if info.has_folder_support() && info.folder.is_empty() {
                info.folder = GENERAL_FOLDER_UID.to_string();
            }
        }
        info
    }

    pub fn is_generic(&self) -> bool {
        self.type_name == TYPE_RESOURCE
    }

    pub fn is_folder_resource(&self) -> bool {
        self.type_name == TYPE_FOLDER
    }

    pub fn has_folder_support(&self) -> bool {
        self.is_generic()
    }

    pub fn is_valid_relation(&self, relation: &str) -> bool {
        self.relations.contains(&relation)
    }

    /// `group/resource[/subresource]`
    pub fn group_resource(&self) -> String {
        format_group_resource(&self.group, &self.resource, &self.subresource)
    }

    pub fn group_resource_ident(&self) -> String {
        new_group_resource_ident(&self.group, &self.resource, &self.subresource)
    }

    /// Object identifier of the resource itself, if it is named.
    pub fn resource_ident(&self) -> Option<String> {
        if self.name.is_empty() {
            return None;
        }
        if self.is_generic() {
            Some(new_resource_ident(
                &self.group,
                &self.resource,
                &self.subresource,
                &self.name,
            ))
        } else {
            Some(new_typed_ident(self.type_name, &self.name))
        }
    }

    /// Object identifier of the containing folder, if any.
    pub fn folder_ident(&self) -> Option<String> {
        if self.folder.is_empty() {
            None
        } else {
            Some(new_folder_ident(&self.folder))
        }
    }

    /// Condition inputs describing the requested resource. Only generic
    /// resources carry them.
    pub fn context(&self) -> Option<BTreeMap<String, Value>> {
        if !self.is_generic() {
            return None;
        }
        let group_resource = self.group_resource();
        let mut context = BTreeMap::new();
        context.insert(
            PARAM_REQUESTED_GROUP.to_string(),
            Value::String(group_resource.clone()),
        );
        context.insert(PARAM_SUBRESOURCE.to_string(), Value::String(group_resource));
        Some(context)
    }
}
