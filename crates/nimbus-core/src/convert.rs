//! Conversion between trees and serde host values.
//!
//! `serde_yaml::Value` is the bridge: anything serde can produce becomes a
//! value first, then a [`Node`]; the reverse direction goes through
//! [`Node::to_value`].

use log::debug;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{DeserializeOwned, Error as _},
    ser::{Error as _, SerializeMap, SerializeSeq},
};
use serde_yaml::{Number, Value, value::TaggedValue};

use crate::{
    error::{NodeError, Result},
    node::{Mapping, Node, Scalar, ScalarKind, Sequence},
    path::Path,
};

/// Builds the long-form key for a short-form intrinsic tag.
fn intrinsic_key(tag: &str) -> Result<String> {
    let name = tag.trim_start_matches('!');
    match name {
        "" => Err(NodeError::encoding("empty tag")),
        "Ref" | "Condition" => Ok(name.to_string()),
        _ => Ok(format!("Fn::{name}")),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn mapping_key(key: Value) -> Result<String> {
    match key {
        Value::String(key) => Ok(key),
        other => Err(NodeError::encoding(format!(
            "mapping keys must be strings, found {}",
            describe(&other)
        ))),
    }
}

fn parse_number(repr: &str) -> Option<Number> {
    if let Ok(value) = repr.parse::<u64>() {
        return Some(value.into());
    }
    if let Ok(value) = repr.parse::<i64>() {
        return Some(value.into());
    }
    match repr {
        ".inf" | "+.inf" => Some(f64::INFINITY.into()),
        "-.inf" => Some(f64::NEG_INFINITY.into()),
        ".nan" => Some(f64::NAN.into()),
        _ => repr.parse::<f64>().ok().map(Into::into),
    }
}

impl TryFrom<Value> for Node {
    type Error = NodeError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Node::null()),
            Value::Bool(flag) => Ok(Node::from(flag)),
            Value::Number(number) => Ok(Node::Scalar(Scalar::new(
                number.to_string(),
                ScalarKind::Number,
            ))),
            Value::String(text) => Ok(Node::from(text)),
            Value::Sequence(items) => items
                .into_iter()
                .map(Node::try_from)
                .collect::<Result<Sequence>>()
                .map(Node::Sequence),
            Value::Mapping(entries) => {
                let mut mapping = Mapping::new();
                for (key, value) in entries {
                    mapping.insert(mapping_key(key)?, Node::try_from(value)?);
                }
                Ok(Node::Mapping(mapping))
            }
            Value::Tagged(tagged) => {
                let TaggedValue { tag, value } = *tagged;
                let key = intrinsic_key(&tag.to_string())?;
                let mut mapping = Mapping::new();
                mapping.insert(key, Node::try_from(value)?);
                Ok(Node::Mapping(mapping))
            }
        }
    }
}

impl Scalar {
    /// Converts the scalar to a host value.
    ///
    /// A number whose representation does not parse is emitted as a string.
    pub fn to_value(&self) -> Value {
        match self.kind() {
            ScalarKind::Null => Value::Null,
            ScalarKind::Boolean => Value::Bool(self.repr() == "true"),
            ScalarKind::Number => parse_number(self.repr())
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(self.repr().to_string())),
            ScalarKind::String => Value::String(self.repr().to_string()),
        }
    }
}

impl Node {
    /// Converts the tree to a host value. Comments are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::UnsupportedNode`] if the tree contains an alias.
    pub fn to_value(&self) -> Result<Value> {
        self.to_value_at(&Path::root())
    }

    fn to_value_at(&self, path: &Path) -> Result<Value> {
        match self {
            Node::Scalar(scalar) => Ok(scalar.to_value()),
            Node::Sequence(sequence) => sequence
                .iter()
                .enumerate()
                .map(|(index, item)| item.to_value_at(&path.child(index)))
                .collect::<Result<Vec<_>>>()
                .map(Value::Sequence),
            Node::Mapping(mapping) => {
                let mut out = serde_yaml::Mapping::with_capacity(mapping.len());
                for (key, value) in mapping.iter() {
                    out.insert(Value::String(key.to_string()), value.to_value_at(&path.child(key))?);
                }
                Ok(Value::Mapping(out))
            }
            Node::Alias(alias) => Err(NodeError::UnsupportedNode {
                path: path.clone(),
                anchor: alias.anchor().to_string(),
            }),
        }
    }

    /// Builds a tree from any serializable host value.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Encoding`] if the value cannot be represented.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Node> {
        let value = serde_yaml::to_value(value).map_err(|err| {
            debug!(err:% = err; "Failed to encode host value");
            NodeError::encoding(err.to_string())
        })?;
        Node::try_from(value)
    }

    /// Decodes the tree into a host type.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::UnsupportedNode`] for aliases and
    /// [`NodeError::Encoding`] when the shape does not fit `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let value = self.to_value()?;
        serde_yaml::from_value(value).map_err(|err| {
            debug!(err:% = err; "Failed to decode tree");
            NodeError::encoding(err.to_string())
        })
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Node::Scalar(scalar) => scalar.to_value().serialize(serializer),
            Node::Sequence(sequence) => {
                let mut seq = serializer.serialize_seq(Some(sequence.len()))?;
                for item in sequence.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Node::Mapping(mapping) => {
                let mut map = serializer.serialize_map(Some(mapping.len()))?;
                for (key, value) in mapping.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Node::Alias(alias) => Err(S::Error::custom(format!(
                "alias `*{}` cannot be serialized",
                alias.anchor()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Node::try_from(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{node::NodeKind, path};

    fn yaml(text: &str) -> Node {
        let value: Value = serde_yaml::from_str(text).unwrap();
        Node::try_from(value).unwrap()
    }

    #[test]
    fn test_from_value_preserves_order() {
        let node = yaml("zeta: 1\nalpha: 2\nmid: 3\n");
        let keys: Vec<&str> = node.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_scalar_kinds() {
        let node = yaml("s: hello\nn: 42\nf: 1.5\nb: true\nz: ~\nq: '42'\n");
        let kind = |key: &str| node.get(&path![key]).unwrap().as_scalar().unwrap().kind();
        assert_eq!(kind("s"), ScalarKind::String);
        assert_eq!(kind("n"), ScalarKind::Number);
        assert_eq!(kind("f"), ScalarKind::Number);
        assert_eq!(kind("b"), ScalarKind::Boolean);
        assert_eq!(kind("z"), ScalarKind::Null);
        assert_eq!(kind("q"), ScalarKind::String);
    }

    #[test]
    fn test_short_form_tags_expand() {
        let node = yaml(
            "a: !Ref Name\nb: !GetAtt Bucket.Arn\nc: !Sub '${Bucket}'\nd: !Condition IsProd\n",
        );
        assert_eq!(node.get(&path!["a", "Ref"]).unwrap().as_str(), Some("Name"));
        assert_eq!(
            node.get(&path!["b", "Fn::GetAtt"]).unwrap().as_str(),
            Some("Bucket.Arn")
        );
        assert_eq!(
            node.get(&path!["c", "Fn::Sub"]).unwrap().as_str(),
            Some("${Bucket}")
        );
        assert_eq!(
            node.get(&path!["d", "Condition"]).unwrap().as_str(),
            Some("IsProd")
        );
    }

    #[test]
    fn test_short_form_tag_on_sequence() {
        let node = yaml("v: !GetAtt [Bucket, Arn]\n");
        let inner = node.get(&path!["v", "Fn::GetAtt"]).unwrap();
        assert_eq!(inner.kind(), NodeKind::Sequence);
        assert_eq!(inner.to_string(), "[Bucket, Arn]");
    }

    #[test]
    fn test_non_string_keys_rejected() {
        for text in ["1: one\n", "true: yes\n", "1.5: half\n"] {
            let value: Value = serde_yaml::from_str(text).unwrap();
            let err = Node::try_from(value).unwrap_err();
            assert!(
                err.to_string().contains("mapping keys must be strings"),
                "{text:?}: {err}"
            );
        }
    }

    #[test]
    fn test_encode_rejects_integer_keys() {
        let err = Node::encode(&BTreeMap::from([(1i64, "one")])).unwrap_err();
        assert!(matches!(err, NodeError::Encoding(_)));

        let node = Node::encode(&BTreeMap::from([("1", "one")])).unwrap();
        assert_eq!(node.get(&path!["1"]).unwrap().as_str(), Some("one"));
    }

    #[test]
    fn test_composite_key_rejected() {
        let value: Value = serde_yaml::from_str("? [a, b]\n: value\n").unwrap();
        let err = Node::try_from(value).unwrap_err();
        assert!(matches!(err, NodeError::Encoding(_)), "{err}");
    }

    #[test]
    fn test_null_key_rejected() {
        let value: Value = serde_yaml::from_str("~: value\n").unwrap();
        assert!(matches!(
            Node::try_from(value).unwrap_err(),
            NodeError::Encoding(_)
        ));
    }

    #[test]
    fn test_to_value_numbers() {
        let node = yaml("i: -7\nu: 18446744073709551615\nf: 2.5\ninf: .inf\n");
        let value = node.to_value().unwrap();
        assert_eq!(value["i"], Value::from(-7i64));
        assert_eq!(value["u"], Value::from(u64::MAX));
        assert_eq!(value["f"], Value::from(2.5f64));
        assert_eq!(value["inf"], Value::from(f64::INFINITY));
    }

    #[test]
    fn test_to_value_rejects_alias() {
        let mut root = Node::empty_mapping();
        root.set(&path!["A", 0], crate::node::Alias::new("x")).unwrap();
        let err = root.to_value().unwrap_err();
        assert_eq!(
            err,
            NodeError::UnsupportedNode {
                path: path!["A", 0],
                anchor: "x".to_string(),
            }
        );
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Bucket {
        #[serde(rename = "Type")]
        kind: String,
        #[serde(rename = "Properties")]
        properties: BTreeMap<String, String>,
    }

    #[test]
    fn test_encode_decode_host_type() {
        let bucket = Bucket {
            kind: "AWS::S3::Bucket".to_string(),
            properties: BTreeMap::from([("BucketName".to_string(), "logs".to_string())]),
        };

        let node = Node::encode(&bucket).unwrap();
        assert_eq!(
            node.get(&path!["Properties", "BucketName"]).unwrap().as_str(),
            Some("logs")
        );

        let back: Bucket = node.decode().unwrap();
        assert_eq!(back, bucket);
    }

    #[test]
    fn test_decode_shape_mismatch() {
        let node = Node::from("just a string");
        let err = node.decode::<Bucket>().unwrap_err();
        assert!(matches!(err, NodeError::Encoding(_)));
    }

    #[test]
    fn test_serialize_keeps_insertion_order() {
        let node = yaml("b: 1\na: [x, y]\n");
        let text = serde_yaml::to_string(&node).unwrap();
        assert_eq!(text, "b: 1\na:\n- x\n- y\n");
    }

    #[test]
    fn test_deserialize_from_json() {
        let node: Node = serde_yaml::from_str(r#"{"Resources": {"Bucket": {"Type": "X"}}}"#).unwrap();
        assert_eq!(
            node.get(&path!["Resources", "Bucket", "Type"]).unwrap().as_str(),
            Some("X")
        );
    }

    #[test]
    fn test_comments_dropped_on_conversion() {
        let mut node = yaml("a: 1\n");
        node.set_comment("header").unwrap();
        let back = Node::try_from(node.to_value().unwrap()).unwrap();
        assert_eq!(back, node);
        assert_eq!(back.comment(), None);
    }
}

#[cfg(test)]
mod proptest_tests {
    use std::result::Result;

    use proptest::prelude::*;

    use super::*;

    // ===================
    // Strategies
    // ===================

    fn scalar_strategy() -> impl Strategy<Value = Node> {
        prop_oneof![
            "[a-zA-Z0-9 :._-]{0,12}".prop_map(Node::from),
            any::<i64>().prop_map(Node::from),
            any::<u64>().prop_map(Node::from),
            (-1.0e9f64..1.0e9f64).prop_map(Node::from),
            any::<bool>().prop_map(Node::from),
            Just(Node::null()),
        ]
    }

    fn node_strategy() -> impl Strategy<Value = Node> {
        scalar_strategy().prop_recursive(4, 32, 5, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..5).prop_map(Node::from),
                prop::collection::vec(("[A-Za-z:]{1,8}", inner), 0..5)
                    .prop_map(|entries| Node::from(Mapping::from_iter(entries))),
            ]
        })
    }

    // ===================
    // Property Test Functions
    // ===================

    /// tree -> host value -> tree is the identity.
    fn check_value_round_trip(node: Node) -> Result<(), TestCaseError> {
        let value = node
            .to_value()
            .map_err(|err| TestCaseError::fail(err.to_string()))?;
        let back = Node::try_from(value).map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert_eq!(back, node);
        Ok(())
    }

    /// tree -> YAML text -> tree is the identity.
    fn check_text_round_trip(node: Node) -> Result<(), TestCaseError> {
        let text = serde_yaml::to_string(&node).map_err(|err| TestCaseError::fail(err.to_string()))?;
        let back: Node =
            serde_yaml::from_str(&text).map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert_eq!(back, node, "yaml:\n{}", text);
        Ok(())
    }

    // ===================
    // Proptest Wrappers
    // ===================

    proptest! {
        #[test]
        fn value_round_trip(node in node_strategy()) {
            check_value_round_trip(node)?;
        }

        #[test]
        fn text_round_trip(node in node_strategy()) {
            check_text_round_trip(node)?;
        }
    }
}
