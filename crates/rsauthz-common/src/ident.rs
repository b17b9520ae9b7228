//! Codec for tuple identifiers.
//!
//! Users and objects are colon-delimited typed identifiers: `type:id`, or
//! `type:id#relation` when the identifier references the set of users holding
//! `relation` on another object (e.g. `team:eng#member`).
//!
//! Parsing splits on the first `:` and then splits the remainder on the last
//! `#`. Every identifier built in this workspace goes through this module.

use std::fmt;

use crate::error::{CommonError, CommonResult};

/// Separator between the type and the id.
pub const TYPE_SEPARATOR: char = ':';
/// Separator between the id and a userset relation.
pub const RELATION_SEPARATOR: char = '#';
/// Wildcard id matching every object of a type.
pub const WILDCARD: &str = "*";

pub const TYPE_USER: &str = "user";
pub const TYPE_SERVICE_ACCOUNT: &str = "service-account";
pub const TYPE_RENDER: &str = "render";
pub const TYPE_ANONYMOUS: &str = "anonymous";
pub const TYPE_TEAM: &str = "team";
pub const TYPE_ROLE: &str = "role";
pub const TYPE_FOLDER: &str = "folder";
pub const TYPE_RESOURCE: &str = "resource";
pub const TYPE_GROUP_RESOURCE: &str = "group_resource";

/// A parsed `type:id[#relation]` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    /// The type portion (e.g., "folder").
    pub type_name: String,
    /// The id portion (e.g., "abc" or "dashboard.grafana.app/dashboards/abc").
    pub id: String,
    /// Optional userset relation (e.g., "member" in `team:eng#member`).
    pub relation: Option<String>,
}

impl Ident {
    /// Creates a plain `type:id` identifier.
    pub fn new(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
            relation: None,
        }
    }

    /// Creates a `type:id#relation` userset identifier.
    pub fn userset(
        type_name: impl Into<String>,
        id: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
            relation: Some(relation.into()),
        }
    }

    /// Parses an identifier.
    pub fn parse(value: &str) -> CommonResult<Self> {
        let invalid = |message: &str| CommonError::InvalidIdentifier {
            value: value.to_string(),
            message: message.to_string(),
        };

        let (type_name, rest) = value
            .split_once(TYPE_SEPARATOR)
            .ok_or_else(|| invalid("missing ':' separator"))?;
        if type_name.is_empty() {
            return Err(invalid("type cannot be empty"));
        }

        let (id, relation) = match rest.rsplit_once(RELATION_SEPARATOR) {
            Some((id, relation)) => {
                if relation.is_empty() {
                    return Err(invalid("relation cannot be empty"));
                }
                (id, Some(relation.to_string()))
            }
            None => (rest, None),
        };
        if id.is_empty() {
            return Err(invalid("id cannot be empty"));
        }

        Ok(Self {
            type_name: type_name.to_string(),
            id: id.to_string(),
            relation,
        })
    }

    /// Returns true for `type:*`.
    pub fn is_wildcard(&self) -> bool {
        self.id == WILDCARD && self.relation.is_none()
    }

    /// Returns true for `type:id#relation`.
    pub fn is_userset(&self) -> bool {
        self.relation.is_some()
    }

    /// Returns the identifier without its userset relation.
    pub fn object(&self) -> String {
        format!("{}{}{}", self.type_name, TYPE_SEPARATOR, self.id)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.type_name, TYPE_SEPARATOR, self.id)?;
        if let Some(relation) = &self.relation {
            write!(f, "{RELATION_SEPARATOR}{relation}")?;
        }
        Ok(())
    }
}

/// Returns the type portion of an identifier, or the whole string when it has
/// no separator.
pub fn type_of(value: &str) -> &str {
    value
        .split_once(TYPE_SEPARATOR)
        .map_or(value, |(type_name, _)| type_name)
}

/// Formats `group/resource[/subresource]`.
pub fn format_group_resource(group: &str, resource: &str, subresource: &str) -> String {
    if subresource.is_empty() {
        format!("{group}/{resource}")
    } else {
        format!("{group}/{resource}/{subresource}")
    }
}

/// `type:name`
pub fn new_typed_ident(type_name: &str, name: &str) -> String {
    format!("{type_name}{TYPE_SEPARATOR}{name}")
}

/// `resource:group/resource[/subresource]/name`
pub fn new_resource_ident(group: &str, resource: &str, subresource: &str, name: &str) -> String {
    format!(
        "{TYPE_RESOURCE}{TYPE_SEPARATOR}{}/{name}",
        format_group_resource(group, resource, subresource)
    )
}

/// `folder:uid`
pub fn new_folder_ident(uid: &str) -> String {
    new_typed_ident(TYPE_FOLDER, uid)
}

/// `group_resource:group/resource[/subresource]`
pub fn new_group_resource_ident(group: &str, resource: &str, subresource: &str) -> String {
    format!(
        "{TYPE_GROUP_RESOURCE}{TYPE_SEPARATOR}{}",
        format_group_resource(group, resource, subresource)
    )
}

/// `type:id#relation`
pub fn new_userset_ident(type_name: &str, id: &str, relation: &str) -> String {
    format!("{type_name}{TYPE_SEPARATOR}{id}{RELATION_SEPARATOR}{relation}")
}

/// Strips `type:` from an object returned by the store.
pub fn strip_type_prefix<'a>(type_name: &str, object: &'a str) -> &'a str {
    object
        .strip_prefix(type_name)
        .and_then(|rest| rest.strip_prefix(TYPE_SEPARATOR))
        .unwrap_or(object)
}

/// Rejects names containing tuple-syntax metacharacters.
pub fn validate_name(value: &str) -> CommonResult<()> {
    if value.contains(RELATION_SEPARATOR) || value.contains(TYPE_SEPARATOR) {
        return Err(CommonError::ReservedCharacter {
            value: value.to_string(),
        });
    }
    Ok(())
}
