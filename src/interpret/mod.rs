//! Bottom-up evaluation of a parse tree through the closed interpretation
//! spec algebra: attribute/fact assembly, normalization, and inflection.
use crate::error::InterpretError;
use crate::fact::{Fact, FactOutcome, SchemaRegistry, Value};
use crate::grammar::Rule;
use crate::morph::{MorphService, Parse};
use crate::token::Token;
use crate::tree::Tree;
use std::collections::BTreeSet;
use std::rc::Rc;

/// A custom interpretation function: takes the joined value computed by the
/// spec it's attached to, returns a replacement value or an error message
/// (propagated to the caller of `Match::fact` as an [`InterpretError`]).
pub type CustomFn = Rc<dyn Fn(&Value) -> Result<Value, String>>;

/// A node in the interpretation spec algebra, attached to a [`Rule`] via
/// [`crate::grammar::interpretation`].
#[derive(Clone)]
pub enum Spec {
    Fact(String),
    Attribute(String, String),
    Normalized,
    Inflected(BTreeSet<String>),
    Const(Value),
    Custom(CustomFn),
    CustomChain(Vec<CustomFn>),
    AttrNormalized(String, String),
    AttrInflected(String, String, BTreeSet<String>),
    AttrConst(String, String, Value),
    AttrCustom(String, String, CustomFn),
    AttrNormalizedCustom(String, String, CustomFn),
    AttrInflectedCustom(String, String, BTreeSet<String>, CustomFn),
    NormalizedCustom(CustomFn),
    InflectedCustom(BTreeSet<String>, CustomFn),
}

pub fn fact(schema: impl Into<String>) -> Spec {
    Spec::Fact(schema.into())
}
pub fn attribute(schema: impl Into<String>, key: impl Into<String>) -> Spec {
    Spec::Attribute(schema.into(), key.into())
}
pub fn normalized() -> Spec {
    Spec::Normalized
}
pub fn inflected(grams: impl IntoIterator<Item = String>) -> Spec {
    Spec::Inflected(grams.into_iter().collect())
}
pub fn const_(v: Value) -> Spec {
    Spec::Const(v)
}
pub fn custom(f: impl Fn(&Value) -> Result<Value, String> + 'static) -> Spec {
    Spec::Custom(Rc::new(f))
}
pub fn custom_chain(fns: Vec<Rc<dyn Fn(&Value) -> Result<Value, String>>>) -> Spec {
    Spec::CustomChain(fns)
}
pub fn attr_normalized(schema: impl Into<String>, key: impl Into<String>) -> Spec {
    Spec::AttrNormalized(schema.into(), key.into())
}
pub fn attr_inflected(
    schema: impl Into<String>,
    key: impl Into<String>,
    grams: impl IntoIterator<Item = String>,
) -> Spec {
    Spec::AttrInflected(schema.into(), key.into(), grams.into_iter().collect())
}
pub fn attr_const(schema: impl Into<String>, key: impl Into<String>, v: Value) -> Spec {
    Spec::AttrConst(schema.into(), key.into(), v)
}
pub fn attr_custom(
    schema: impl Into<String>,
    key: impl Into<String>,
    f: impl Fn(&Value) -> Result<Value, String> + 'static,
) -> Spec {
    Spec::AttrCustom(schema.into(), key.into(), Rc::new(f))
}
pub fn attr_normalized_custom(
    schema: impl Into<String>,
    key: impl Into<String>,
    f: impl Fn(&Value) -> Result<Value, String> + 'static,
) -> Spec {
    Spec::AttrNormalizedCustom(schema.into(), key.into(), Rc::new(f))
}
pub fn attr_inflected_custom(
    schema: impl Into<String>,
    key: impl Into<String>,
    grams: impl IntoIterator<Item = String>,
    f: impl Fn(&Value) -> Result<Value, String> + 'static,
) -> Spec {
    Spec::AttrInflectedCustom(schema.into(), key.into(), grams.into_iter().collect(), Rc::new(f))
}
pub fn normalized_custom(f: impl Fn(&Value) -> Result<Value, String> + 'static) -> Spec {
    Spec::NormalizedCustom(Rc::new(f))
}
pub fn inflected_custom(
    grams: impl IntoIterator<Item = String>,
    f: impl Fn(&Value) -> Result<Value, String> + 'static,
) -> Spec {
    Spec::InflectedCustom(grams.into_iter().collect(), Rc::new(f))
}

/// The tagged intermediate result of evaluating one tree node.
#[derive(Clone)]
enum EvalResult {
    Token(Token),
    Value(Value),
    Attr(String, String, Value),
    FactResult(Fact),
    Items(Vec<EvalResult>),
}

fn leaf_normalized(t: &Token) -> String {
    t.forms.first().map(|f| f.normalized.clone()).unwrap_or_else(|| t.value.clone())
}

/// `join_normalized` — space-joined normalized forms of descendant leaves,
/// short-circuited by a rule's `pipeline_key` if one was set.
fn join_normalized(tree: &Tree) -> String {
    match tree {
        Tree::Leaf(t) => leaf_normalized(t),
        Tree::Node { rule, children } => {
            if let Some(key) = rule.pipeline_key() {
                return key;
            }
            children.iter().map(join_normalized).collect::<Vec<_>>().join(" ")
        }
    }
}

fn join_inflected(tree: &Tree, grams: &BTreeSet<String>, morph: &dyn MorphService) -> String {
    tree.leaves()
        .into_iter()
        .map(|t| {
            t.forms
                .first()
                .and_then(|f| morph.inflect(&Parse::from(f), grams))
                .unwrap_or_else(|| t.value.clone())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_values(children: &[Tree]) -> String {
    children
        .iter()
        .flat_map(Tree::leaves)
        .map(|t| t.value.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

fn collect_leaf_spans(tree: &Tree) -> Vec<(usize, usize)> {
    tree.leaves().into_iter().map(|t| (t.start, t.stop)).collect()
}

/// The unique non-`Items` child result an `attribute` spec assigns as its
/// value: when more than one such child exists the last one wins (no
/// grammar in this crate's test suite produces that ambiguity; this keeps
/// the rule total and deterministic rather than panicking).
fn unique_non_items_value(results: &[EvalResult]) -> Option<Value> {
    let mut found = None;
    for r in results {
        match r {
            EvalResult::Items(_) => continue,
            EvalResult::FactResult(f) => found = Some(Value::Fact(f.clone())),
            EvalResult::Value(v) => found = Some(v.clone()),
            EvalResult::Attr(_, _, v) => found = Some(v.clone()),
            EvalResult::Token(t) => found = Some(Value::Str(t.value.clone())),
        }
    }
    found
}

fn eval_node(
    tree: &Tree,
    morph: &dyn MorphService,
    schemas: &SchemaRegistry,
) -> Result<EvalResult, InterpretError> {
    match tree {
        Tree::Leaf(t) => Ok(EvalResult::Token(t.clone())),
        Tree::Node { rule, children } => {
            let child_results = children
                .iter()
                .map(|c| eval_node(c, morph, schemas))
                .collect::<Result<Vec<_>, _>>()?;
            match rule.interpretation() {
                None => Ok(EvalResult::Items(child_results)),
                Some(spec) => apply_spec(&spec, rule, children, &child_results, morph, schemas),
            }
        }
    }
}

fn apply_custom(f: &CustomFn, input: Value) -> Result<Value, InterpretError> {
    f(&input).map_err(InterpretError)
}

fn apply_spec(
    spec: &Spec,
    rule: &Rule,
    children: &[Tree],
    child_results: &[EvalResult],
    morph: &dyn MorphService,
    schemas: &SchemaRegistry,
) -> Result<EvalResult, InterpretError> {
    match spec {
        Spec::Fact(schema_name) => {
            let schema = schemas
                .get(schema_name)
                .ok_or_else(|| InterpretError(format!("undefined schema {}", schema_name)))?;
            let mut built = Fact::new(schema);
            let mut spans = Vec::new();
            for (child_tree, child_result) in children.iter().zip(child_results.iter()) {
                match child_result {
                    EvalResult::Attr(s, k, v) if s == schema_name => {
                        built.set(k, v.clone());
                        spans.extend(collect_leaf_spans(child_tree));
                    }
                    EvalResult::FactResult(f) if &f.schema_name == schema_name => {
                        spans.extend(f.spans.clone());
                        built.merge(f);
                    }
                    _ => spans.extend(collect_leaf_spans(child_tree)),
                }
            }
            built.spans = spans;
            Ok(EvalResult::FactResult(built))
        }
        Spec::Attribute(schema, key) => {
            let v = unique_non_items_value(child_results)
                .unwrap_or_else(|| Value::Str(join_values(children)));
            Ok(EvalResult::Attr(schema.clone(), key.clone(), v))
        }
        Spec::Normalized => {
            let joined = if let Some(key) = rule.pipeline_key() {
                key
            } else {
                children.iter().map(join_normalized).collect::<Vec<_>>().join(" ")
            };
            Ok(EvalResult::Value(Value::Str(joined)))
        }
        Spec::Inflected(grams) => {
            let joined = children
                .iter()
                .map(|c| join_inflected(c, grams, morph))
                .collect::<Vec<_>>()
                .join(" ");
            Ok(EvalResult::Value(Value::Str(joined)))
        }
        Spec::Const(v) => Ok(EvalResult::Value(v.clone())),
        Spec::Custom(f) => {
            let input = Value::Str(join_values(children));
            Ok(EvalResult::Value(apply_custom(f, input)?))
        }
        Spec::CustomChain(fns) => {
            let mut cur = Value::Str(join_values(children));
            for f in fns {
                cur = apply_custom(f, cur)?;
            }
            Ok(EvalResult::Value(cur))
        }
        Spec::AttrNormalized(schema, key) => {
            let joined = if let Some(k) = rule.pipeline_key() {
                k
            } else {
                children.iter().map(join_normalized).collect::<Vec<_>>().join(" ")
            };
            Ok(EvalResult::Attr(schema.clone(), key.clone(), Value::Str(joined)))
        }
        Spec::AttrInflected(schema, key, grams) => {
            let joined = children
                .iter()
                .map(|c| join_inflected(c, grams, morph))
                .collect::<Vec<_>>()
                .join(" ");
            Ok(EvalResult::Attr(schema.clone(), key.clone(), Value::Str(joined)))
        }
        Spec::AttrConst(schema, key, v) => {
            Ok(EvalResult::Attr(schema.clone(), key.clone(), v.clone()))
        }
        Spec::AttrCustom(schema, key, f) => {
            let input = Value::Str(join_values(children));
            let v = apply_custom(f, input)?;
            Ok(EvalResult::Attr(schema.clone(), key.clone(), v))
        }
        Spec::AttrNormalizedCustom(schema, key, f) => {
            let joined = children.iter().map(join_normalized).collect::<Vec<_>>().join(" ");
            let v = apply_custom(f, Value::Str(joined))?;
            Ok(EvalResult::Attr(schema.clone(), key.clone(), v))
        }
        Spec::AttrInflectedCustom(schema, key, grams, f) => {
            let joined = children
                .iter()
                .map(|c| join_inflected(c, grams, morph))
                .collect::<Vec<_>>()
                .join(" ");
            let v = apply_custom(f, Value::Str(joined))?;
            Ok(EvalResult::Attr(schema.clone(), key.clone(), v))
        }
        Spec::NormalizedCustom(f) => {
            let joined = children.iter().map(join_normalized).collect::<Vec<_>>().join(" ");
            Ok(EvalResult::Value(apply_custom(f, Value::Str(joined))?))
        }
        Spec::InflectedCustom(grams, f) => {
            let joined = children
                .iter()
                .map(|c| join_inflected(c, grams, morph))
                .collect::<Vec<_>>()
                .join(" ");
            Ok(EvalResult::Value(apply_custom(f, Value::Str(joined))?))
        }
    }
}

fn normalize_root(r: EvalResult) -> FactOutcome {
    match r {
        EvalResult::FactResult(f) => FactOutcome::Fact(f),
        EvalResult::Value(v) => FactOutcome::Value(v),
        EvalResult::Attr(_, _, v) => FactOutcome::Value(v),
        EvalResult::Token(t) => FactOutcome::Value(Value::Str(t.value)),
        EvalResult::Items(mut xs) => match xs.pop() {
            Some(last) => normalize_root(last),
            None => FactOutcome::Value(Value::Str(String::new())),
        },
    }
}

/// Walks `tree` bottom-up through the spec algebra, then applies the final
/// root normalization (unwrapping a `Fact`/`Value`/`Attr`/`Token`/`Items`
/// result down to a plain [`FactOutcome`]).
pub fn interpret(
    tree: &Tree,
    morph: &dyn MorphService,
    schemas: &SchemaRegistry,
) -> Result<FactOutcome, InterpretError> {
    let result = eval_node(tree, morph, schemas)?;
    Ok(normalize_root(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fact::{attr, Schema};
    use crate::grammar::{self, Term};
    use crate::morph::DictionaryMorphService;
    use crate::predicate::eq;
    use crate::token::TokenKind;

    fn leaf(v: &str, kind: TokenKind, start: usize) -> Tree {
        Tree::Leaf(Token::new(v, kind, start, start + v.chars().count()))
    }

    fn to_int(v: &Value) -> Result<Value, String> {
        let s = v.as_str().ok_or_else(|| "expected string".to_string())?;
        s.parse::<i64>().map(Value::Int).map_err(|e| e.to_string())
    }

    #[test]
    fn dot_date_fact_extraction() {
        let mut schemas = SchemaRegistry::new();
        schemas.insert(
            "Date".to_string(),
            Schema::define("Date", vec![attr("day"), attr("month"), attr("year")]),
        );

        let day_rule = grammar::interpretation(
            &grammar::rule(vec![Term::predicate(eq("15"))]),
            attr_custom("Date", "day", to_int),
        );
        let month_rule = grammar::interpretation(
            &grammar::rule(vec![Term::predicate(eq("03"))]),
            attr_custom("Date", "month", to_int),
        );
        let year_rule = grammar::interpretation(
            &grammar::rule(vec![Term::predicate(eq("2024"))]),
            attr_custom("Date", "year", to_int),
        );
        let top = grammar::interpretation(
            &grammar::rule(vec![
                Term::rule(&day_rule),
                Term::predicate(eq(".")),
                Term::rule(&month_rule),
                Term::predicate(eq(".")),
                Term::rule(&year_rule),
            ]),
            fact("Date"),
        );

        let tree = Tree::Node {
            rule: top,
            children: vec![
                Tree::Node { rule: day_rule, children: vec![leaf("15", TokenKind::Int, 0)] },
                leaf(".", TokenKind::Punct, 2),
                Tree::Node { rule: month_rule, children: vec![leaf("03", TokenKind::Int, 3)] },
                leaf(".", TokenKind::Punct, 5),
                Tree::Node { rule: year_rule, children: vec![leaf("2024", TokenKind::Int, 6)] },
            ],
        };

        let morph = DictionaryMorphService::new();
        let outcome = interpret(&tree, &morph, &schemas).unwrap();
        match outcome {
            FactOutcome::Fact(f) => {
                assert_eq!(f.schema_name, "Date");
                assert_eq!(f.get("day"), Some(&crate::fact::AttrSlot::Scalar(Some(Value::Int(15)))));
                assert_eq!(f.get("month"), Some(&crate::fact::AttrSlot::Scalar(Some(Value::Int(3)))));
                assert_eq!(f.get("year"), Some(&crate::fact::AttrSlot::Scalar(Some(Value::Int(2024)))));
            }
            _ => panic!("expected a Fact"),
        }
    }

    #[test]
    fn items_without_interpretation_forwards_last_child() {
        let schemas = SchemaRegistry::new();
        let morph = DictionaryMorphService::new();
        let r = grammar::rule(vec![]);
        let tree = Tree::Node {
            rule: r,
            children: vec![leaf("a", TokenKind::Word, 0), leaf("b", TokenKind::Word, 1)],
        };
        let outcome = interpret(&tree, &morph, &schemas).unwrap();
        assert_eq!(outcome, FactOutcome::Value(Value::Str("b".to_string())));
    }

    #[test]
    fn custom_error_propagates() {
        let schemas = SchemaRegistry::new();
        let morph = DictionaryMorphService::new();
        let r = grammar::interpretation(
            &grammar::rule(vec![Term::predicate(eq("x"))]),
            custom(|_| Err("boom".to_string())),
        );
        let tree = Tree::Node { rule: r, children: vec![leaf("x", TokenKind::Word, 0)] };
        assert!(interpret(&tree, &morph, &schemas).is_err());
    }

    #[test]
    fn pipeline_key_short_circuits_normalized_join() {
        let schemas = SchemaRegistry::new();
        let morph = DictionaryMorphService::new();
        let phrase = grammar::interpretation(&grammar::rule(vec![]), normalized());
        phrase.set_pipeline_key("до_нашей_эры");
        let tree = Tree::Node {
            rule: phrase,
            children: vec![leaf("до", TokenKind::Word, 0), leaf("нашей", TokenKind::Word, 3), leaf("эры", TokenKind::Word, 9)],
        };
        let outcome = interpret(&tree, &morph, &schemas).unwrap();
        assert_eq!(outcome, FactOutcome::Value(Value::Str("до_нашей_эры".to_string())));
    }
}
