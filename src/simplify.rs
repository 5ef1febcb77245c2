//! The tree simplifier: purely local, idempotent rewrites
//! applied bottom-up, re-applied at a node after any change to it.

use crate::tree::{Tag, Tree};

pub fn simplify(tree: Tree) -> Tree {
    let mut node = tree;
    node.children = node.children.into_iter().map(simplify).collect();
    loop {
        let (rewritten, changed) = rewrite_once(node);
        node = rewritten;
        if !changed {
            return node;
        }
    }
}

fn rewrite_once(mut node: Tree) -> (Tree, bool) {
    match node.tag {
        Tag::Cat => {
            let before = node.children.len();
            let flattened: Vec<Tree> = node
                .children
                .into_iter()
                .filter(|c| !c.is_nop())
                .flat_map(|c| if c.tag == Tag::Cat { c.children } else { vec![c] })
                .collect();
            let changed = flattened.len() != before;
            node.children = flattened;
            if node.children.is_empty() {
                return (Tree::nop(node.span), true);
            }
            if node.children.len() == 1 {
                return (node.children.into_iter().next().unwrap(), true);
            }
            (node, changed)
        }
        Tag::Alt => {
            let before = node.children.len();
            let flattened: Vec<Tree> = node
                .children
                .into_iter()
                .flat_map(|c| if c.tag == Tag::Alt { c.children } else { vec![c] })
                .collect();
            let changed = flattened.len() != before;
            node.children = flattened;
            (node, changed)
        }
        Tag::Format => {
            if node.children.len() == 1 && node.children[0].tag == Tag::Str {
                return (node.children.into_iter().next().unwrap(), true);
            }
            (node, false)
        }
        Tag::Scope => {
            // A SCOPE with no BIND child (already resolved/promoted, or one
            // that never introduced a binding) collapses into its body.
            if node.children.len() == 1 && node.children[0].tag != Tag::Bind {
                return (node.children.into_iter().next().unwrap(), true);
            }
            (node, false)
        }
        _ => (node, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    #[test]
    fn flattens_nested_cat() {
        let t = simplify(Parser::parse("dup dup dup").unwrap());
        assert_eq!(t.tag, Tag::Cat);
        assert_eq!(t.children.len(), 3);
    }

    #[test]
    fn flattens_nested_alt() {
        let t = simplify(Parser::parse("1, 2, 3").unwrap());
        assert_eq!(t.tag, Tag::Alt);
        assert_eq!(t.children.len(), 3);
    }

    #[test]
    fn simplify_is_idempotent() {
        let t = simplify(Parser::parse("1 (2, 3) add, {4}").unwrap());
        let t2 = simplify(t.clone());
        assert_eq!(format!("{t:?}"), format!("{t2:?}"));
    }

    #[test]
    fn single_str_format_collapses_to_str() {
        let t = simplify(Parser::parse(r#""plain""#).unwrap());
        assert_eq!(t.tag, Tag::Str);
    }
}
