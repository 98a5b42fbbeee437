//! Named fact schemas with typed, optionally repeatable attributes.
use std::collections::HashMap;

/// One attribute declared by a [`Schema`]: a name plus whether values
/// accumulate into a list (`repeatable`) or overwrite a single scalar slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrDef {
    pub name: String,
    pub repeatable: bool,
}

/// One entry passed to [`Schema::define`]: either a plain attribute name or
/// a `repeatable` one.
pub enum AttrSpec {
    Name(String),
    Repeatable(String),
}

pub fn attr(name: impl Into<String>) -> AttrSpec {
    AttrSpec::Name(name.into())
}
pub fn repeatable_attr(name: impl Into<String>) -> AttrSpec {
    AttrSpec::Repeatable(name.into())
}

/// A named, ordered list of attribute declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub name: String,
    pub attrs: Vec<AttrDef>,
}

impl Schema {
    pub fn define(name: impl Into<String>, attrs: Vec<AttrSpec>) -> Self {
        let attrs = attrs
            .into_iter()
            .map(|a| match a {
                AttrSpec::Name(n) => AttrDef { name: n, repeatable: false },
                AttrSpec::Repeatable(n) => AttrDef { name: n, repeatable: true },
            })
            .collect();
        Schema { name: name.into(), attrs }
    }
}

/// A lookup table of [`Schema`]s by name, passed to the interpreter so
/// `fact(schema)` specs know the declared attribute shape to build.
pub type SchemaRegistry = HashMap<String, Schema>;

/// The final, normalized result of interpreting a parse tree: either a fully
/// assembled [`Fact`] or a bare [`Value`] when the tree's root carries no
/// `fact(...)` interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum FactOutcome {
    Fact(Fact),
    Value(Value),
}

/// A value an interpretation spec can produce: the raw token text, an
/// integer (via a `custom`/`attr_custom` conversion), or a nested fact.
/// Repeatable attributes hold a list of these directly in
/// [`AttrSlot::Repeated`] rather than wrapping them in a list variant here.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Fact(Fact),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Fact(f) => f.as_json(),
        }
    }
}

/// The storage slot for one declared attribute: a nullable scalar, or an
/// always-present (possibly empty) list.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrSlot {
    Scalar(Option<Value>),
    Repeated(Vec<Value>),
}

impl AttrSlot {
    pub fn is_null(&self) -> bool {
        match self {
            AttrSlot::Scalar(None) => true,
            _ => false,
        }
    }
}

/// A named record produced by interpretation: a schema name, its attribute
/// values, and the ordered union of character-offset spans that contributed
/// to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub schema_name: String,
    attrs: Vec<(String, AttrSlot)>,
    pub spans: Vec<(usize, usize)>,
}

impl Fact {
    pub fn new(schema: &Schema) -> Self {
        let attrs = schema
            .attrs
            .iter()
            .map(|a| {
                let slot = if a.repeatable {
                    AttrSlot::Repeated(Vec::new())
                } else {
                    AttrSlot::Scalar(None)
                };
                (a.name.clone(), slot)
            })
            .collect();
        Fact { schema_name: schema.name.clone(), attrs, spans: Vec::new() }
    }

    pub fn get(&self, key: &str) -> Option<&AttrSlot> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// `set(fact, schema, key, v)` — overwrite a scalar, or append to a
    /// repeatable list. Setting a key the schema did not declare is a no-op:
    /// undeclared attributes simply don't exist on this fact.
    pub fn set(&mut self, key: &str, v: Value) {
        if let Some((_, slot)) = self.attrs.iter_mut().find(|(k, _)| k == key) {
            match slot {
                AttrSlot::Scalar(s) => *s = Some(v),
                AttrSlot::Repeated(list) => list.push(v),
            }
        }
    }

    /// `merge(target, source)` — copy every non-null source attribute into
    /// `self`, and union in `source`'s spans.
    pub fn merge(&mut self, source: &Fact) {
        for (k, slot) in source.attrs.iter() {
            match slot {
                AttrSlot::Scalar(Some(v)) => self.set(k, v.clone()),
                AttrSlot::Scalar(None) => {}
                AttrSlot::Repeated(vs) => {
                    for v in vs {
                        self.set(k, v.clone());
                    }
                }
            }
        }
        self.spans.extend(source.spans.iter().cloned());
    }

    /// `as_json(fact)` — omits null scalars, recurses into nested facts and
    /// lists.
    pub fn as_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (k, slot) in &self.attrs {
            match slot {
                AttrSlot::Scalar(None) => {}
                AttrSlot::Scalar(Some(v)) => {
                    map.insert(k.clone(), v.to_json());
                }
                AttrSlot::Repeated(vs) => {
                    map.insert(
                        k.clone(),
                        serde_json::Value::Array(vs.iter().map(Value::to_json).collect()),
                    );
                }
            }
        }
        serde_json::Value::Object(map)
    }

    /// `spans(fact)` — ordered union of spans across this fact and every
    /// nested fact reachable through its attributes.
    pub fn spans(&self) -> Vec<(usize, usize)> {
        let mut out = self.spans.clone();
        for (_, slot) in &self.attrs {
            match slot {
                AttrSlot::Scalar(Some(Value::Fact(f))) => out.extend(f.spans()),
                AttrSlot::Repeated(vs) => {
                    for v in vs {
                        if let Value::Fact(f) = v {
                            out.extend(f.spans());
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date_schema() -> Schema {
        Schema::define("Date", vec![attr("day"), attr("month"), attr("year")])
    }

    #[test]
    fn scalar_set_overwrites_last_value() {
        let schema = date_schema();
        let mut f = Fact::new(&schema);
        f.set("day", Value::Int(1));
        f.set("day", Value::Int(15));
        assert_eq!(f.get("day"), Some(&AttrSlot::Scalar(Some(Value::Int(15)))));
    }

    #[test]
    fn repeatable_preserves_insertion_order() {
        let schema = Schema::define("List", vec![repeatable_attr("items")]);
        let mut f = Fact::new(&schema);
        f.set("items", Value::Str("a".into()));
        f.set("items", Value::Str("b".into()));
        assert_eq!(
            f.get("items"),
            Some(&AttrSlot::Repeated(vec![Value::Str("a".into()), Value::Str("b".into())]))
        );
    }

    #[test]
    fn as_json_omits_null_scalars() {
        let schema = date_schema();
        let mut f = Fact::new(&schema);
        f.set("day", Value::Int(15));
        f.set("month", Value::Int(3));
        let json = f.as_json();
        assert!(json.get("day").is_some());
        assert!(json.get("year").is_none());
    }

    #[test]
    fn merge_copies_non_null_attributes_and_spans() {
        let schema = date_schema();
        let mut target = Fact::new(&schema);
        let mut source = Fact::new(&schema);
        source.set("day", Value::Int(1));
        source.spans.push((0, 2));
        target.merge(&source);
        assert_eq!(target.get("day"), Some(&AttrSlot::Scalar(Some(Value::Int(1)))));
        assert_eq!(target.spans, vec![(0, 2)]);
    }

    #[test]
    fn spans_recurse_into_nested_facts() {
        let inner_schema = Schema::define("Inner", vec![attr("x")]);
        let mut inner = Fact::new(&inner_schema);
        inner.spans.push((2, 4));

        let outer_schema = Schema::define("Outer", vec![attr("inner")]);
        let mut outer = Fact::new(&outer_schema);
        outer.spans.push((0, 6));
        outer.set("inner", Value::Fact(inner));

        assert_eq!(outer.spans(), vec![(0, 6), (2, 4)]);
    }
}
