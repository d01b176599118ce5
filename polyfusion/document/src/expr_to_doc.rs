// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Translates row expressions into document operator expressions

use serde_json::{json, Map, Value};

use polyfusion_common::error::Result;
use polyfusion_common::plan_err;
use polyfusion_common::value::PolyValue;
use polyfusion_expr::rex::RexNode;
use polyfusion_expr::OperatorKind;

/// Document operator for a SQL operator; operators without a translation
/// are rejected by the caller
fn operator_name(kind: OperatorKind) -> Option<&'static str> {
    match kind {
        OperatorKind::Equals => Some("$eq"),
        OperatorKind::NotEquals => Some("$ne"),
        OperatorKind::LessThan => Some("$lt"),
        OperatorKind::LessThanOrEqual => Some("$lte"),
        OperatorKind::GreaterThan => Some("$gt"),
        OperatorKind::GreaterThanOrEqual => Some("$gte"),
        OperatorKind::Plus => Some("$add"),
        OperatorKind::Minus => Some("$subtract"),
        OperatorKind::Times => Some("$multiply"),
        OperatorKind::Divide => Some("$divide"),
        OperatorKind::Mod => Some("$mod"),
        OperatorKind::And => Some("$and"),
        OperatorKind::Or => Some("$or"),
        OperatorKind::Not => Some("$not"),
        OperatorKind::Concat => Some("$concat"),
        OperatorKind::Item => Some("$arrayElemAt"),
        _ => None,
    }
}

/// Renders a literal as a document value
pub fn literal_value(value: &PolyValue) -> Result<Value> {
    Ok(match value {
        PolyValue::Null => Value::Null,
        PolyValue::Boolean(b) => json!(b),
        PolyValue::Integer(i) => json!(i),
        PolyValue::Float(f) => json!(f.0),
        PolyValue::Decimal { .. } => json!(value.to_string()),
        PolyValue::Utf8(s) => json!(s),
        PolyValue::Date(d) => json!(d),
        PolyValue::Time(t) => json!(t),
        PolyValue::Timestamp(t) => json!(t),
        PolyValue::Interval(v) => {
            if v.fields.len() == 2 {
                json!(v.months())
            } else {
                json!(v.millis())
            }
        }
        PolyValue::Array(items) => Value::Array(
            items
                .iter()
                .map(literal_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        other => return plan_err!("literal {other} has no document representation"),
    })
}

/// Translates an expression into aggregation-operator form, resolving input
/// references through the physical field names of the input relation.
pub fn translate_expr(rex: &RexNode, fields: &[String]) -> Result<Value> {
    match rex {
        RexNode::Literal { value, .. } => literal_value(value),
        RexNode::InputRef { index, .. } => match fields.get(*index) {
            Some(name) => Ok(json!(format!("${name}"))),
            None => plan_err!("input ${index} out of range for {} fields", fields.len()),
        },
        RexNode::Call { op, operands, .. } => match op.kind {
            OperatorKind::Case => translate_case(operands, fields),
            OperatorKind::IsNull => Ok(json!({
                "$eq": [translate_expr(&operands[0], fields)?, Value::Null]
            })),
            OperatorKind::IsNotNull => Ok(json!({
                "$ne": [translate_expr(&operands[0], fields)?, Value::Null]
            })),
            OperatorKind::Item => {
                // document arrays are 0-based, SQL item access is 1-based
                let array = translate_expr(&operands[0], fields)?;
                let index = match operands[1].as_literal() {
                    Some(PolyValue::Integer(i)) => json!(i - 1),
                    _ => json!({
                        "$subtract": [translate_expr(&operands[1], fields)?, 1]
                    }),
                };
                Ok(json!({ "$arrayElemAt": [array, index] }))
            }
            OperatorKind::Distance => Ok(distance_document(operands, fields)?),
            kind => {
                let name = match operator_name(kind) {
                    Some(name) => name,
                    None => {
                        return plan_err!(
                            "operator {} has no document translation",
                            op.name
                        )
                    }
                };
                let args = operands
                    .iter()
                    .map(|o| translate_expr(o, fields))
                    .collect::<Result<Vec<_>>>()?;
                let mut doc = Map::new();
                doc.insert(name.to_string(), Value::Array(args));
                Ok(Value::Object(doc))
            }
        },
        other => plan_err!("{other} has no document translation"),
    }
}

/// CASE lowers into nested `$cond` documents
fn translate_case(operands: &[RexNode], fields: &[String]) -> Result<Value> {
    let else_value = if operands.len() % 2 == 1 {
        translate_expr(&operands[operands.len() - 1], fields)?
    } else {
        Value::Null
    };
    let mut result = else_value;
    let pairs = operands.len() / 2;
    for i in (0..pairs).rev() {
        let cond = translate_expr(&operands[i * 2], fields)?;
        let then = translate_expr(&operands[i * 2 + 1], fields)?;
        result = json!({ "$cond": [cond, then, result] });
    }
    Ok(result)
}

/// Distance calls serialize through a dedicated document so adapters can
/// recognize them without re-parsing the expression
pub fn distance_document(operands: &[RexNode], fields: &[String]) -> Result<Value> {
    let mut doc = Map::new();
    doc.insert(
        "input".to_string(),
        translate_expr(&operands[0], fields)?,
    );
    doc.insert(
        "target".to_string(),
        translate_expr(&operands[1], fields)?,
    );
    doc.insert("metric".to_string(), translate_expr(&operands[2], fields)?);
    if let Some(bound) = operands.get(3) {
        doc.insert("bound".to_string(), translate_expr(bound, fields)?);
    }
    Ok(json!({ "$distance": Value::Object(doc) }))
}

/// Translates a predicate into match-query form: simple comparisons against
/// literals use field syntax, everything else falls back to `$expr`.
pub fn translate_match(rex: &RexNode, fields: &[String]) -> Result<Value> {
    if let RexNode::Call { op, operands, .. } = rex {
        match (op.kind, operands.as_slice()) {
            (OperatorKind::And, operands) => {
                let parts = operands
                    .iter()
                    .map(|o| translate_match(o, fields))
                    .collect::<Result<Vec<_>>>()?;
                return Ok(json!({ "$and": parts }));
            }
            (OperatorKind::Or, operands) => {
                let parts = operands
                    .iter()
                    .map(|o| translate_match(o, fields))
                    .collect::<Result<Vec<_>>>()?;
                return Ok(json!({ "$or": parts }));
            }
            (kind, [RexNode::InputRef { index, .. }, right]) if kind.is_comparison() => {
                if let Some(value) = right.as_literal() {
                    let field = match fields.get(*index) {
                        Some(field) => field,
                        None => {
                            return plan_err!(
                                "input ${index} out of range for {} fields",
                                fields.len()
                            )
                        }
                    };
                    let name = operator_name(kind).expect("comparisons have a translation");
                    let mut op_doc = Map::new();
                    op_doc.insert(name.to_string(), literal_value(value)?);
                    let mut doc = Map::new();
                    doc.insert(field.clone(), Value::Object(op_doc));
                    return Ok(Value::Object(doc));
                }
            }
            _ => {}
        }
    }
    Ok(json!({ "$expr": translate_expr(rex, fields)? }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyfusion_common::types::{PolyType, TypeSystem};
    use polyfusion_expr::{standard_operator_table, RexBuilder};
    use std::sync::Arc;

    fn rex() -> RexBuilder {
        RexBuilder::new(Arc::new(standard_operator_table()), TypeSystem::default())
    }

    fn fields() -> Vec<String> {
        vec!["phys_a".to_string(), "phys_b".to_string()]
    }

    #[test]
    fn comparison_against_literal_uses_field_syntax() {
        let b = rex();
        let cond = b
            .call(
                OperatorKind::GreaterThan,
                vec![
                    RexBuilder::input_ref(0, PolyType::integer()),
                    RexBuilder::literal_of(PolyValue::Integer(10)),
                ],
            )
            .unwrap();
        assert_eq!(
            translate_match(&cond, &fields()).unwrap(),
            json!({ "phys_a": { "$gt": 10 } })
        );
    }

    #[test]
    fn field_to_field_comparison_falls_back_to_expr() {
        let b = rex();
        let cond = b
            .call(
                OperatorKind::Equals,
                vec![
                    RexBuilder::input_ref(0, PolyType::integer()),
                    RexBuilder::input_ref(1, PolyType::integer()),
                ],
            )
            .unwrap();
        assert_eq!(
            translate_match(&cond, &fields()).unwrap(),
            json!({ "$expr": { "$eq": ["$phys_a", "$phys_b"] } })
        );
    }

    #[test]
    fn case_nests_cond_documents() {
        let b = rex();
        let case = b
            .call(
                OperatorKind::Case,
                vec![
                    b.call(
                        OperatorKind::Equals,
                        vec![
                            RexBuilder::input_ref(0, PolyType::integer()),
                            RexBuilder::literal_of(PolyValue::Integer(1)),
                        ],
                    )
                    .unwrap(),
                    RexBuilder::literal_of(PolyValue::utf8("one")),
                    b.call(
                        OperatorKind::Equals,
                        vec![
                            RexNode::InputRef {
                                index: 0,
                                ty: PolyType::integer(),
                            },
                            RexBuilder::literal_of(PolyValue::Integer(2)),
                        ],
                    )
                    .unwrap(),
                    RexBuilder::literal_of(PolyValue::utf8("two")),
                    RexBuilder::literal_of(PolyValue::utf8("many")),
                ],
            )
            .unwrap();
        assert_eq!(
            translate_expr(&case, &fields()).unwrap(),
            json!({
                "$cond": [
                    { "$eq": ["$phys_a", 1] },
                    "one",
                    { "$cond": [ { "$eq": ["$phys_a", 2] }, "two", "many" ] }
                ]
            })
        );
    }

    #[test]
    fn untranslatable_operator_is_rejected() {
        let b = rex();
        let like = b
            .call(
                OperatorKind::Like,
                vec![
                    RexBuilder::input_ref(1, PolyType::varchar(10)),
                    RexBuilder::literal_of(PolyValue::utf8("a%")),
                ],
            )
            .unwrap();
        assert!(translate_expr(&like, &fields()).is_err());
    }

    #[test]
    fn array_item_converts_to_zero_based() {
        let b = rex();
        let item = b
            .call(
                OperatorKind::Item,
                vec![
                    RexBuilder::input_ref(
                        0,
                        PolyType::array(PolyType::integer()),
                    ),
                    RexBuilder::literal_of(PolyValue::Integer(2)),
                ],
            )
            .unwrap();
        assert_eq!(
            translate_expr(&item, &fields()).unwrap(),
            json!({ "$arrayElemAt": ["$phys_a", 1] })
        );
    }
}
