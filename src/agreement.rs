//! The agreement-relation validator: a small post-hoc filter over parse
//! trees for grammatical-agreement constraints.
use crate::grammar::AgreementFn;
use crate::token::{MorphForm, Token};
use crate::tree::Tree;
use std::collections::BTreeSet;
use std::rc::Rc;

const GENDERS: [&str; 3] = ["masc", "femn", "neut"];

/// `gender_agrees?` — true if two grammeme sets could describe the same
/// gender (a `GNdr`/`ms-f` indeclinable-gender marker or shared plurality
/// counts as agreement, since gender collapses in the plural).
pub fn gender_agrees(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    if a.contains("GNdr") || b.contains("GNdr") {
        return true;
    }
    if a.contains("plur") && b.contains("plur") {
        return true;
    }
    let ms_f_ok = |one: &BTreeSet<String>, other: &BTreeSet<String>| {
        one.contains("ms-f") && (other.contains("masc") || other.contains("femn"))
    };
    if ms_f_ok(a, b) || ms_f_ok(b, a) {
        return true;
    }
    GENDERS.iter().any(|g| a.contains(*g) && b.contains(*g))
}

/// `number_agrees?` — true if both sets mark the same grammatical number,
/// counting `Sgtm`/`Pltm` (singularia/pluralia tantum) as their plain
/// `sing`/`plur` counterpart.
pub fn number_agrees(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    let is_sing = |s: &BTreeSet<String>| s.contains("sing") || s.contains("Sgtm");
    let is_plur = |s: &BTreeSet<String>| s.contains("plur") || s.contains("Pltm");
    (is_sing(a) && is_sing(b)) || (is_plur(a) && is_plur(b))
}

const CASES: [&str; 10] = [
    "nomn", "gent", "datv", "accs", "ablt", "loct", "voct", "gen2", "acc2", "loc2",
];

/// `case_agrees?` — true if both sets share a case, or either carries
/// `Fixd` (an indeclinable word agrees with any case).
pub fn case_agrees(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    if a.contains("Fixd") || b.contains("Fixd") {
        return true;
    }
    CASES.iter().any(|c| a.contains(*c) && b.contains(*c))
}

/// `gnc_agrees?` — conjunction of gender, number, and case agreement.
pub fn gnc_agrees(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    gender_agrees(a, b) && number_agrees(a, b) && case_agrees(a, b)
}

pub fn gender() -> AgreementFn {
    Rc::new(gender_agrees)
}
pub fn number() -> AgreementFn {
    Rc::new(number_agrees)
}
pub fn case() -> AgreementFn {
    Rc::new(case_agrees)
}
pub fn gnc() -> AgreementFn {
    Rc::new(gnc_agrees)
}

/// One relation-tagged anchor: the relation function's identity (by `Rc`
/// pointer) paired with the leftmost leaf found under the rule node's
/// *main* subtree.
struct Anchor<'t> {
    relation_ptr: *const (),
    relation: AgreementFn,
    token: &'t Token,
}

fn relation_ptr(f: &AgreementFn) -> *const () {
    Rc::as_ptr(f) as *const ()
}

fn leftmost_leaf(tree: &Tree) -> Option<&Token> {
    match tree {
        Tree::Leaf(t) => Some(t),
        Tree::Node { children, .. } => {
            for c in children {
                if let Some(t) = leftmost_leaf(c) {
                    return Some(t);
                }
            }
            None
        }
    }
}

fn collect_anchors<'t>(tree: &'t Tree, out: &mut Vec<Anchor<'t>>) {
    if let Tree::Node { rule, children } = tree {
        if let Some(relation) = rule.relation() {
            let main_idx = rule
                .productions()
                .iter()
                .find(|p| p.terms.len() == children.len())
                .map(|p| p.main)
                .unwrap_or(0);
            let main_child = children.get(main_idx).or_else(|| children.first());
            if let Some(anchor_token) = main_child.and_then(leftmost_leaf) {
                out.push(Anchor { relation_ptr: relation_ptr(&relation), relation, token: anchor_token });
            }
        }
        for c in children {
            collect_anchors(c, out);
        }
    }
}

fn forms_agree(relation: &AgreementFn, a: &[MorphForm], b: &[MorphForm]) -> bool {
    a.iter().any(|fa| b.iter().any(|fb| relation(&fa.grams, &fb.grams)))
}

/// Validates every agreement-tagged group in `tree`: for each group of
/// anchors sharing a relation function, every ordered pair of distinct
/// tokens must have *some* pair of forms that satisfy the relation.
/// Existential, not form-constraining: a token ambiguous between several
/// readings agrees as long as any one reading works, rather than forcing a
/// single reading to be picked across the whole group up front.
pub fn validate(tree: &Tree) -> bool {
    let mut anchors = Vec::new();
    collect_anchors(tree, &mut anchors);

    let mut groups: Vec<(*const (), AgreementFn, Vec<&Token>)> = Vec::new();
    for a in anchors {
        if let Some(g) = groups.iter_mut().find(|(ptr, _, _)| *ptr == a.relation_ptr) {
            g.2.push(a.token);
        } else {
            groups.push((a.relation_ptr, a.relation, vec![a.token]));
        }
    }

    for (_, relation, tokens) in &groups {
        if tokens.len() < 2 {
            continue;
        }
        for (i, a) in tokens.iter().enumerate() {
            for (j, b) in tokens.iter().enumerate() {
                if i == j {
                    continue;
                }
                if !forms_agree(relation, &a.forms, &b.forms) {
                    return false;
                }
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gram_set(grams: &[&str]) -> BTreeSet<String> {
        grams.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn gnc_agrees_is_reflexive() {
        let a = gram_set(&["masc", "sing", "nomn"]);
        assert!(gnc_agrees(&a, &a));
    }

    #[test]
    fn gender_fixed_always_agrees() {
        let a = gram_set(&["GNdr"]);
        let b = gram_set(&["femn"]);
        assert!(gender_agrees(&a, &b));
    }

    #[test]
    fn ms_f_agrees_with_masc_or_femn() {
        let ms_f = gram_set(&["ms-f"]);
        assert!(gender_agrees(&ms_f, &gram_set(&["masc"])));
        assert!(gender_agrees(&ms_f, &gram_set(&["femn"])));
        assert!(!gender_agrees(&ms_f, &gram_set(&["neut"])));
    }

    #[test]
    fn number_requires_shared_plurality() {
        assert!(number_agrees(&gram_set(&["sing"]), &gram_set(&["Sgtm"])));
        assert!(number_agrees(&gram_set(&["plur"]), &gram_set(&["Pltm"])));
        assert!(!number_agrees(&gram_set(&["sing"]), &gram_set(&["plur"])));
    }

    #[test]
    fn case_fixd_agrees_regardless_of_intersection() {
        assert!(case_agrees(&gram_set(&["Fixd"]), &gram_set(&["gent"])));
        assert!(case_agrees(&gram_set(&["nomn"]), &gram_set(&["nomn"])));
        assert!(!case_agrees(&gram_set(&["nomn"]), &gram_set(&["gent"])));
    }
}
