//! Builds typed credentials from tagged descriptors.
//!
//! A descriptor is either a bare tag string (`"null"`) or an array
//! `[tag, arg1, arg2, …]` (`["pat", "ghp_…"]`, `["client_secret", id, secret]`).
//! The factory is a pure function over a constant tag table.

use serde_json::Value;
use std::collections::HashMap;

use super::Credential;
use crate::error::FactoryError;

/// Recognized descriptor tags, in the order reported by [`supports`].
const TAGS: [&str; 3] = ["null", "pat", "client_secret"];

/// The full recognized tag list.
pub fn supports() -> &'static [&'static str] {
    &TAGS
}

/// Whether `tag` is a recognized descriptor tag.
pub fn supports_tag(tag: &str) -> bool {
    TAGS.contains(&tag)
}

/// Build a credential from a tag and positional arguments.
pub fn create(tag: &str, args: &[&str]) -> Result<Credential, FactoryError> {
    if tag.is_empty() {
        return Err(FactoryError::BadDescriptor("empty tag".to_string()));
    }
    match (tag, args) {
        ("null", []) => Ok(Credential::anonymous()),
        ("pat", [token]) => Ok(Credential::pat(*token)?),
        ("client_secret", [client_id, client_secret]) => {
            Ok(Credential::client_secret(*client_id, *client_secret)?)
        }
        ("null" | "pat" | "client_secret", _) => Err(FactoryError::BadDescriptor(format!(
            "tag {tag:?} takes {} argument(s), got {}",
            arity(tag),
            args.len()
        ))),
        _ => Err(FactoryError::BadDescriptor(format!("unknown tag {tag:?}"))),
    }
}

fn arity(tag: &str) -> usize {
    match tag {
        "pat" => 1,
        "client_secret" => 2,
        _ => 0,
    }
}

/// Build a credential from a descriptor value.
pub fn from_value(descriptor: &Value) -> Result<Credential, FactoryError> {
    match descriptor {
        Value::String(tag) => create(tag, &[]),
        Value::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                let Some(part) = item.as_str() else {
                    return Err(FactoryError::BadDescriptor(format!(
                        "descriptor entries must be strings, got {item}"
                    )));
                };
                parts.push(part);
            }
            let [tag, args @ ..] = parts.as_slice() else {
                return Err(FactoryError::BadDescriptor(
                    "empty descriptor".to_string(),
                ));
            };
            create(tag, args)
        }
        other => Err(FactoryError::BadDescriptor(format!(
            "expected a tag string or [tag, arg…], got {other}"
        ))),
    }
}

/// Build a batch of credentials from descriptors.
///
/// Duplicate identities collapse to a single instance: the last descriptor
/// wins, the first occurrence keeps its position.
pub fn create_batch(descriptors: &[Value]) -> Result<Vec<Credential>, FactoryError> {
    let mut out: Vec<Credential> = Vec::with_capacity(descriptors.len());
    let mut positions: HashMap<String, usize> = HashMap::new();
    for descriptor in descriptors {
        let credential = from_value(descriptor)?;
        let identity = credential.identity();
        match positions.get(&identity) {
            Some(&at) => out[at] = credential,
            None => {
                positions.insert(identity, out.len());
                out.push(credential);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FactoryError;
    use serde_json::json;

    #[test]
    fn supports_lists_every_tag_and_answers_membership() {
        assert_eq!(supports(), &["null", "pat", "client_secret"]);
        for tag in supports() {
            assert!(supports_tag(tag));
        }
        assert!(!supports_tag("jwt"));
        assert!(!supports_tag(""));
    }

    #[test]
    fn create_builds_each_variant() {
        assert!(create("null", &[]).expect("null").is_anonymous());
        assert_eq!(
            create("pat", &["t"]).expect("pat").identity(),
            Credential::pat("t").expect("pat").identity()
        );
        assert!(
            create("client_secret", &["id", "secret"])
                .expect("client secret")
                .identity()
                .starts_with("cst#")
        );
    }

    #[test]
    fn wrong_arity_is_a_bad_descriptor() {
        assert!(matches!(
            create("null", &["extra"]),
            Err(FactoryError::BadDescriptor(_))
        ));
        assert!(matches!(
            create("pat", &[]),
            Err(FactoryError::BadDescriptor(_))
        ));
        assert!(matches!(
            create("client_secret", &["only-id"]),
            Err(FactoryError::BadDescriptor(_))
        ));
    }

    #[test]
    fn unknown_and_empty_tags_are_bad_descriptors() {
        assert!(matches!(
            create("jwt", &["x"]),
            Err(FactoryError::BadDescriptor(_))
        ));
        assert!(matches!(
            create("", &[]),
            Err(FactoryError::BadDescriptor(_))
        ));
    }

    #[test]
    fn constructor_failures_are_wrapped() {
        assert!(matches!(
            create("pat", &[""]),
            Err(FactoryError::Construction(_))
        ));
    }

    #[test]
    fn from_value_accepts_bare_tags_and_arrays() {
        assert!(from_value(&json!("null")).expect("bare tag").is_anonymous());
        let cred = from_value(&json!(["pat", "t"])).expect("array descriptor");
        assert!(cred.identity().starts_with("pat#"));
        assert!(matches!(
            from_value(&json!(42)),
            Err(FactoryError::BadDescriptor(_))
        ));
        assert!(matches!(
            from_value(&json!([])),
            Err(FactoryError::BadDescriptor(_))
        ));
        assert!(matches!(
            from_value(&json!(["pat", 42])),
            Err(FactoryError::BadDescriptor(_))
        ));
    }

    #[test]
    fn batch_collapses_duplicate_identities_last_wins() {
        let batch = create_batch(&[
            json!(["pat", "a"]),
            json!("null"),
            json!(["pat", "a"]),
            json!(["pat", "b"]),
        ])
        .expect("batch");
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0].identity(), Credential::pat("a").expect("pat").identity());
        assert_eq!(batch[1].identity(), "null");
        assert_eq!(batch[2].identity(), Credential::pat("b").expect("pat").identity());
    }

    #[test]
    fn identities_round_trip_through_the_factory() {
        for tag in supports() {
            let args: Vec<&str> = match *tag {
                "pat" => vec!["fixed-token"],
                "client_secret" => vec!["fixed-id", "fixed-secret"],
                _ => vec![],
            };
            let first = create(tag, &args).expect("create");
            let second = create(tag, &args).expect("create again");
            assert_eq!(first.identity(), second.identity());
        }
    }
}
