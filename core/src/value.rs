use serde::{
    de::{
        self,
        SeqAccess,
        Visitor,
    },
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use std::{
    fmt,
    hash::{
        Hash,
        Hasher,
    },
};

/// The value of a single data point.
///
/// Open-Falcon only stores numbers, but gauges may report any primitive, so
/// the value is kept as reported and serialized untagged. Floats compare and
/// hash by bit pattern, which makes `NaN` equal to itself and lets records be
/// used as set keys. A non-negative `Int` is equal to the `UInt` of the same
/// magnitude since both encode to the same JSON number.
#[derive(Debug, Clone)]
pub enum MetricValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Text(String),
    List(Vec<MetricValue>),
}

impl MetricValue {
    /// `true` for a list without elements. Such gauges carry no information
    /// and are not reported.
    pub fn is_empty_list(&self) -> bool {
        matches!(self, MetricValue::List(values) if values.is_empty())
    }

    /// The value as a float, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Int(v) => Some(*v as f64),
            MetricValue::UInt(v) => Some(*v as f64),
            MetricValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn unsigned(&self) -> Option<u64> {
        match self {
            MetricValue::Int(v) => u64::try_from(*v).ok(),
            MetricValue::UInt(v) => Some(*v),
            _ => None,
        }
    }
}

impl Default for MetricValue {
    fn default() -> Self {
        MetricValue::Int(0)
    }
}

impl PartialEq for MetricValue {
    fn eq(&self, other: &Self) -> bool {
        use MetricValue::*;
        match (self, other) {
            (Int(a), Int(b)) => a == b,
            (Int(_) | UInt(_), Int(_) | UInt(_)) => self.unsigned().is_some() && self.unsigned() == other.unsigned(),
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Bool(a), Bool(b)) => a == b,
            (Text(a), Text(b)) => a == b,
            (List(a), List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for MetricValue {}

impl Hash for MetricValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            MetricValue::UInt(v) => {
                state.write_u8(0);
                v.hash(state);
            }
            MetricValue::Int(v) if *v >= 0 => {
                state.write_u8(0);
                (*v as u64).hash(state);
            }
            MetricValue::Int(v) => {
                state.write_u8(1);
                v.hash(state);
            }
            MetricValue::Float(v) => {
                state.write_u8(2);
                v.to_bits().hash(state);
            }
            MetricValue::Bool(v) => {
                state.write_u8(3);
                v.hash(state);
            }
            MetricValue::Text(v) => {
                state.write_u8(4);
                v.hash(state);
            }
            MetricValue::List(v) => {
                state.write_u8(5);
                v.hash(state);
            }
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Int(v) => serializer.serialize_i64(*v),
            MetricValue::UInt(v) => serializer.serialize_u64(*v),
            // serde_json writes non-finite floats as `null`
            MetricValue::Float(v) => serializer.serialize_f64(*v),
            MetricValue::Bool(v) => serializer.serialize_bool(*v),
            MetricValue::Text(v) => serializer.serialize_str(v),
            MetricValue::List(v) => serializer.collect_seq(v),
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = MetricValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number, bool, string, list or null")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<MetricValue, E> {
                Ok(MetricValue::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<MetricValue, E> {
                Ok(MetricValue::UInt(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<MetricValue, E> {
                Ok(MetricValue::Float(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<MetricValue, E> {
                Ok(MetricValue::Bool(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<MetricValue, E> {
                Ok(MetricValue::Text(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<MetricValue, E> {
                Ok(MetricValue::Text(v))
            }

            fn visit_unit<E: de::Error>(self) -> Result<MetricValue, E> {
                Ok(MetricValue::Float(f64::NAN))
            }

            fn visit_none<E: de::Error>(self) -> Result<MetricValue, E> {
                Ok(MetricValue::Float(f64::NAN))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<MetricValue, A::Error> {
                let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(value) = seq.next_element()? {
                    values.push(value);
                }
                Ok(MetricValue::List(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for MetricValue {
                fn from(value: $ty) -> Self {
                    MetricValue::$variant(value.into())
                }
            }
        )*
    };
}

impl_from! {
    i64 => Int,
    i32 => Int,
    u64 => UInt,
    u32 => UInt,
    f64 => Float,
    f32 => Float,
    bool => Bool,
    String => Text,
    &str => Text,
    Vec<MetricValue> => List,
}

impl From<usize> for MetricValue {
    fn from(value: usize) -> Self {
        MetricValue::UInt(value as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn signed_and_unsigned_of_same_magnitude_are_equal() {
        assert_eq!(MetricValue::Int(7), MetricValue::UInt(7));
        assert_ne!(MetricValue::Int(-7), MetricValue::UInt(7));
        assert_ne!(MetricValue::Int(7), MetricValue::Float(7.0));

        let set: HashSet<_> = [MetricValue::Int(7), MetricValue::UInt(7)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn nan_is_equal_to_itself() {
        assert_eq!(MetricValue::Float(f64::NAN), MetricValue::Float(f64::NAN));
    }

    #[test]
    fn serializes_untagged() {
        let value = MetricValue::List(vec![1u64.into(), (-2i64).into(), 0.5f64.into(), true.into(), "x".into()]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[1,-2,0.5,true,"x"]"#);
        assert_eq!(serde_json::to_string(&MetricValue::Float(f64::NAN)).unwrap(), "null");
    }

    #[test]
    fn deserializes_json_numbers() {
        let value: MetricValue = serde_json::from_str("2.0").unwrap();
        assert_eq!(value, MetricValue::Float(2.0));
        let value: MetricValue = serde_json::from_str("42").unwrap();
        assert_eq!(value, MetricValue::UInt(42));
        let value: MetricValue = serde_json::from_str("[]").unwrap();
        assert!(value.is_empty_list());
    }
}
