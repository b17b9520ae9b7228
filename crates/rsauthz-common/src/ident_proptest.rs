//! Property-based tests for the identifier codec.

use proptest::prelude::*;

use crate::ident::{new_resource_ident, Ident, TYPE_RESOURCE};

/// Strategy to generate plain `type:id` identifiers
fn typed_ident_strategy() -> impl Strategy<Value = (String, String)> {
    ("[a-z_-]{1,12}", "[a-zA-Z0-9._/-]{1,24}")
}

proptest! {
    #[test]
    fn test_typed_ident_roundtrip((type_name, id) in typed_ident_strategy()) {
        let ident = Ident::new(&type_name, &id);
        let parsed = Ident::parse(&ident.to_string());
        prop_assert!(parsed.is_ok());
        prop_assert_eq!(parsed.unwrap(), ident);
    }

    #[test]
    fn test_userset_ident_roundtrip(
        (type_name, id) in typed_ident_strategy(),
        relation in "[a-z_]{1,16}"
    ) {
        let ident = Ident::userset(&type_name, &id, &relation);
        let parsed = Ident::parse(&ident.to_string()).unwrap();
        prop_assert_eq!(parsed.relation.as_deref(), Some(relation.as_str()));
        prop_assert_eq!(parsed, ident);
    }

    #[test]
    fn test_resource_ident_keeps_colons_in_id(
        group in "[a-z.]{1,20}",
        resource in "[a-z]{1,12}",
        name in "[a-z0-9:]{1,12}"
    ) {
        // Only the first ':' separates the type
        let value = new_resource_ident(&group, &resource, "", &name);
        let parsed = Ident::parse(&value).unwrap();
        prop_assert_eq!(parsed.type_name, TYPE_RESOURCE);
        prop_assert_eq!(parsed.id, format!("{group}/{resource}/{name}"));
    }

    #[test]
    fn test_string_without_colon_is_rejected(s in "[a-z#]{1,20}") {
        prop_assert!(Ident::parse(&s).is_err());
    }
}
