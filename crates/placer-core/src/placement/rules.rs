//! Location rule evaluation over node attributes.

use crate::context::Diagnostics;
use crate::input::{BoolOp, ExprOp, ValueType};
use crate::model::{ClusterModel, Expression, Node, NodeDetails, NodeList, Rule, RuleScore};
use crate::score::Score;
use std::cmp::Ordering;
use tracing::debug;

/// Evaluates [`Rule`] trees against the nodes of a model.
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Weighted nodes the rule selects, or `None` when nothing matches.
    ///
    /// `and` rules start from every node and drop those failing any
    /// expression. `or` rules start empty and merge the rule score in once per
    /// matching expression.
    pub fn evaluate(rule: &Rule, model: &ClusterModel, diag: &mut Diagnostics) -> Option<NodeList> {
        let mut result = NodeList::new();

        for node in &model.nodes {
            let hits = match rule.op {
                BoolOp::And => usize::from(Self::matches(rule, node)),
                BoolOp::Or => rule
                    .expressions
                    .iter()
                    .filter(|e| Self::test_expression(e, node))
                    .count(),
            };
            if hits == 0 {
                continue;
            }
            let Some(score) = Self::score_for(rule, node, diag) else {
                continue;
            };
            for _ in 0..hits {
                result.merge_node(Node::new(node.id, score));
            }
        }

        if result.is_empty() {
            debug!(rule = %rule.id, "rule matched no nodes");
            return None;
        }
        Some(result)
    }

    /// Boolean value of the rule on one node.
    #[must_use]
    pub fn matches(rule: &Rule, node: &NodeDetails) -> bool {
        match rule.op {
            BoolOp::And => rule.expressions.iter().all(|e| Self::test_expression(e, node)),
            BoolOp::Or => rule.expressions.iter().any(|e| Self::test_expression(e, node)),
        }
    }

    fn test_expression(expr: &Expression, node: &NodeDetails) -> bool {
        match expr {
            Expression::Nested(rule) => Self::matches(rule, node),
            Expression::Compare {
                attribute,
                op,
                value,
                value_type,
            } => Self::compare(
                *op,
                node.attribute(attribute),
                value.as_deref(),
                *value_type,
            ),
        }
    }

    /// Apply `op` to a node attribute and a literal.
    #[must_use]
    pub fn compare(op: ExprOp, lhs: Option<&str>, rhs: Option<&str>, value_type: ValueType) -> bool {
        match op {
            ExprOp::Defined => return lhs.is_some(),
            ExprOp::NotDefined => return lhs.is_none(),
            _ => {}
        }
        let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
            return false;
        };
        let Some(ordering) = Self::order_values(lhs, rhs, value_type) else {
            return false;
        };
        match op {
            ExprOp::Lt => ordering == Ordering::Less,
            ExprOp::Gt => ordering == Ordering::Greater,
            ExprOp::Lte => ordering != Ordering::Greater,
            ExprOp::Gte => ordering != Ordering::Less,
            ExprOp::Eq => ordering == Ordering::Equal,
            ExprOp::Ne => ordering != Ordering::Equal,
            ExprOp::Defined | ExprOp::NotDefined => false,
        }
    }

    fn order_values(lhs: &str, rhs: &str, value_type: ValueType) -> Option<Ordering> {
        match value_type {
            ValueType::String => Some(lhs.cmp(rhs)),
            ValueType::Integer => {
                let l = lhs.trim().parse::<i64>().ok()?;
                let r = rhs.trim().parse::<i64>().ok()?;
                Some(l.cmp(&r))
            }
            ValueType::Version => {
                let l = parse_version(lhs)?;
                let r = parse_version(rhs)?;
                Some(compare_versions(&l, &r))
            }
        }
    }

    /// Score the rule grants on `node`; `None` rejects the node.
    fn score_for(rule: &Rule, node: &NodeDetails, diag: &mut Diagnostics) -> Option<Score> {
        match &rule.score {
            RuleScore::Literal(score) => Some(*score),
            RuleScore::Attribute(attr) => match node.attribute(attr).map(str::parse::<Score>) {
                Some(Ok(score)) => Some(score),
                Some(Err(_)) => {
                    diag.processing_warning(format!(
                        "rule {}: attribute {} on {} is not a score",
                        rule.id, attr, node.name
                    ));
                    None
                }
                None => {
                    diag.processing_warning(format!(
                        "rule {}: no score attribute {} on {}",
                        rule.id, attr, node.name
                    ));
                    None
                }
            },
        }
    }
}

fn parse_version(s: &str) -> Option<Vec<u64>> {
    s.trim().split('.').map(|part| part.parse::<u64>().ok()).collect()
}

/// Component-wise, missing trailing components count as zero.
fn compare_versions(l: &[u64], r: &[u64]) -> Ordering {
    let len = l.len().max(r.len());
    for i in 0..len {
        let a = l.get(i).copied().unwrap_or(0);
        let b = r.get(i).copied().unwrap_or(0);
        match a.cmp(&b) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

// =============================================================================
// TESTS
// =============================================================================
