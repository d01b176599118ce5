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

//! Lowers algebra sub-trees of the document convention into ordered stage
//! lists and collection modifications

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Map, Value};

use polyfusion_common::cancel::CancelFlag;
use polyfusion_common::error::Result;
use polyfusion_common::types::{PolyType, PolyTypeFamily};
use polyfusion_common::value::PolyValue;
use polyfusion_common::{not_impl_err, plan_err};
use polyfusion_expr::rel::{ModifyOperation, RelGraph, RelId, RelKind};
use polyfusion_expr::rex::{is_identity, RexNode};
use polyfusion_expr::OperatorKind;

use crate::expr_to_doc::{literal_value, translate_expr, translate_match};
use crate::pipeline::{
    group_stage, limit_stage, match_stage, project_stage, skip_stage, sort_stage,
};

/// What the executor sends to the document store for one sub-tree
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOperation {
    /// An aggregation pipeline returning documents
    Pipeline {
        collection: String,
        stages: Vec<Value>,
    },
    /// Insert the given documents; the result is the inserted count
    InsertMany {
        collection: String,
        documents: Vec<Value>,
    },
    /// Delete every document matching the filter; the result is the count
    DeleteMany {
        collection: String,
        filter: Value,
    },
}

/// A sub-tree in mid-conversion: the pipeline so far and the physical field
/// name of each output column
#[derive(Debug)]
struct DocFrame {
    collection: String,
    stages: Vec<Value>,
    fields: Vec<String>,
}

/// Converts sub-trees of the document convention.
pub struct RelToDocumentConverter<'a> {
    graph: &'a RelGraph,
    /// Logical column name to physical field name, from the placements
    physical_names: HashMap<String, String>,
    cancel: CancelFlag,
}

impl<'a> RelToDocumentConverter<'a> {
    pub fn new(graph: &'a RelGraph, physical_names: HashMap<String, String>) -> Self {
        Self::with_cancel(graph, physical_names, CancelFlag::new())
    }

    pub fn with_cancel(
        graph: &'a RelGraph,
        physical_names: HashMap<String, String>,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            graph,
            physical_names,
            cancel,
        }
    }

    fn physical(&self, logical: &str) -> String {
        self.physical_names
            .get(logical)
            .cloned()
            .unwrap_or_else(|| logical.to_string())
    }

    /// Converts `root` into a pipeline or a collection modification
    pub fn convert(&mut self, root: RelId) -> Result<DocumentOperation> {
        if let RelKind::TableModify {
            table, operation, ..
        } = self.graph.kind(root)
        {
            let collection = table
                .qualified_name
                .last()
                .cloned()
                .unwrap_or_else(|| table.dotted_name());
            let input = self.graph.inputs(root)[0];
            return match operation {
                ModifyOperation::Insert => {
                    let documents = self.insert_documents(input)?;
                    Ok(DocumentOperation::InsertMany {
                        collection,
                        documents,
                    })
                }
                ModifyOperation::Delete => {
                    let filter = self.delete_filter(input)?;
                    Ok(DocumentOperation::DeleteMany { collection, filter })
                }
                ModifyOperation::Update { .. } => not_impl_err!(
                    "UPDATE is not supported by the document-pipeline emitter"
                ),
                ModifyOperation::Merge => {
                    not_impl_err!("MERGE is not supported by the document-pipeline emitter")
                }
            };
        }
        let frame = self.visit(root)?;
        Ok(DocumentOperation::Pipeline {
            collection: frame.collection,
            stages: frame.stages,
        })
    }

    fn visit(&self, id: RelId) -> Result<DocFrame> {
        self.cancel.check()?;
        match self.graph.kind(id) {
            RelKind::DocumentScan { collection } => {
                let fields = collection
                    .row_type
                    .fields()
                    .iter()
                    .map(|f| self.physical(&f.name))
                    .collect();
                Ok(DocFrame {
                    collection: collection
                        .qualified_name
                        .last()
                        .cloned()
                        .unwrap_or_else(|| collection.dotted_name()),
                    stages: Vec::new(),
                    fields,
                })
            }
            RelKind::Filter { condition } => {
                let mut frame = self.visit(self.graph.inputs(id)[0])?;
                let filter = translate_match(condition, &frame.fields)?;
                frame.stages.push(match_stage(filter));
                Ok(frame)
            }
            RelKind::Project { exprs, field_names } => {
                let input = self.graph.inputs(id)[0];
                let mut frame = self.visit(input)?;
                let input_fields = self.graph.row_type(input).fields();
                // a projection mapping every field to its own physical name
                // adds nothing to the pipeline
                let identity = is_identity(exprs, input_fields.len())
                    && field_names
                        .iter()
                        .zip(&frame.fields)
                        .all(|(name, phys)| &self.physical(name) == phys);
                if identity {
                    return Ok(frame);
                }
                let mut spec = Map::new();
                for (expr, name) in exprs.iter().zip(field_names) {
                    let value = match expr {
                        RexNode::Literal { value, .. } => {
                            json!({ "$literal": literal_value(value)? })
                        }
                        RexNode::InputRef { index, .. } => {
                            let physical = match frame.fields.get(*index) {
                                Some(physical) => physical,
                                None => {
                                    return plan_err!(
                                        "input ${index} out of range in projection"
                                    )
                                }
                            };
                            if physical == name {
                                json!(1)
                            } else {
                                json!(format!("${physical}"))
                            }
                        }
                        other => translate_expr(other, &frame.fields)?,
                    };
                    spec.insert(name.clone(), value);
                }
                frame.stages.push(project_stage(spec));
                frame.fields = field_names.clone();
                Ok(frame)
            }
            RelKind::Aggregate {
                group_set,
                agg_calls,
            } => {
                let mut frame = self.visit(self.graph.inputs(id)[0])?;
                let group_names: Vec<String> = self
                    .graph
                    .row_type(id)
                    .fields()
                    .iter()
                    .take(group_set.len())
                    .map(|f| f.name.clone())
                    .collect();
                let id_value = match group_set.as_slice() {
                    [] => Value::Null,
                    [single] => json!(format!("${}", frame.fields[*single])),
                    keys => {
                        let mut id_doc = Map::new();
                        for (key, name) in keys.iter().zip(&group_names) {
                            id_doc.insert(
                                name.clone(),
                                json!(format!("${}", frame.fields[*key])),
                            );
                        }
                        Value::Object(id_doc)
                    }
                };
                let mut spec = Map::new();
                spec.insert("_id".to_string(), id_value);
                for call in agg_calls {
                    if call.distinct {
                        return not_impl_err!(
                            "DISTINCT aggregates in the document-pipeline emitter"
                        );
                    }
                    let accumulator = match call.kind {
                        OperatorKind::Count => json!({ "$sum": 1 }),
                        OperatorKind::Sum => {
                            json!({ "$sum": format!("${}", frame.fields[call.args[0]]) })
                        }
                        OperatorKind::Min => {
                            json!({ "$min": format!("${}", frame.fields[call.args[0]]) })
                        }
                        OperatorKind::Max => {
                            json!({ "$max": format!("${}", frame.fields[call.args[0]]) })
                        }
                        OperatorKind::Avg => {
                            json!({ "$avg": format!("${}", frame.fields[call.args[0]]) })
                        }
                        other => {
                            return plan_err!(
                                "aggregate {other:?} has no document translation"
                            )
                        }
                    };
                    spec.insert(call.name.clone(), accumulator);
                }
                frame.stages.push(group_stage(spec));
                // grouped keys live under _id in the output documents
                let mut fields = Vec::new();
                match group_set.len() {
                    0 => {}
                    1 => fields.push("_id".to_string()),
                    _ => fields.extend(group_names.iter().map(|n| format!("_id.{n}"))),
                }
                fields.extend(agg_calls.iter().map(|c| c.name.clone()));
                frame.fields = fields;
                Ok(frame)
            }
            RelKind::Sort {
                collation,
                offset,
                fetch,
            } => {
                let mut frame = self.visit(self.graph.inputs(id)[0])?;
                if !collation.0.is_empty() {
                    let mut keys = Map::new();
                    for key in &collation.0 {
                        let field = match frame.fields.get(key.field) {
                            Some(field) => field.clone(),
                            None => {
                                return plan_err!("sort key {} out of range", key.field)
                            }
                        };
                        keys.insert(field, json!(if key.descending { -1 } else { 1 }));
                    }
                    frame.stages.push(sort_stage(keys));
                }
                if let Some(offset) = offset {
                    frame.stages.push(skip_stage(*offset));
                }
                if let Some(fetch) = fetch {
                    frame.stages.push(limit_stage(*fetch));
                }
                Ok(frame)
            }
            other => plan_err!(
                "{} is not supported by the document-pipeline emitter",
                other.name()
            ),
        }
    }

    /// Lowers an insert's `Values` child into typed documents, field by field
    fn insert_documents(&self, input: RelId) -> Result<Vec<Value>> {
        let tuples = match self.graph.kind(input) {
            RelKind::Values { tuples, .. } => tuples.clone(),
            other => {
                return plan_err!(
                    "document INSERT expects a VALUES input, got {}",
                    other.name()
                )
            }
        };
        let fields: Vec<(String, PolyType)> = self
            .graph
            .row_type(input)
            .fields()
            .iter()
            .map(|f| (self.physical(&f.name), f.ty.clone()))
            .collect();
        tuples
            .iter()
            .map(|tuple| {
                let mut doc = Map::new();
                for (expr, (name, ty)) in tuple.iter().zip(&fields) {
                    let value = match expr.as_literal() {
                        Some(value) => value,
                        None => return plan_err!("document INSERT accepts literals only"),
                    };
                    // null literals are omitted from the document
                    if value.is_null() {
                        continue;
                    }
                    doc.insert(name.clone(), typed_insert_value(value, ty)?);
                }
                Ok(Value::Object(doc))
            })
            .collect()
    }

    /// Extracts the filter of a delete's filter-only child
    fn delete_filter(&self, input: RelId) -> Result<Value> {
        match self.graph.kind(input) {
            RelKind::Filter { condition } => {
                let scan = self.graph.inputs(input)[0];
                let frame = self.visit(scan)?;
                if !frame.stages.is_empty() {
                    return plan_err!("document DELETE expects a filter-only child");
                }
                translate_match(condition, &frame.fields)
            }
            RelKind::DocumentScan { .. } => Ok(json!({})),
            other => plan_err!(
                "document DELETE expects a filter-only child, got {}",
                other.name()
            ),
        }
    }
}

/// Converts a literal into the document value dictated by the column type:
/// character to string, exact integers to integer numbers, fractional types
/// to doubles, date and time to day/milli counts, timestamps to epoch
/// millis, booleans to booleans, binary to base64 text, anything else to its
/// string form.
fn typed_insert_value(value: &PolyValue, ty: &PolyType) -> Result<Value> {
    let family = ty.family();
    Ok(if family.is_character() {
        match value {
            PolyValue::Utf8(s) => json!(s),
            other => json!(other.to_string()),
        }
    } else if family.is_exact_numeric() && family != PolyTypeFamily::Decimal {
        match value {
            PolyValue::Integer(i) => json!(i),
            other => return plan_err!("cannot insert {other} into an integer column"),
        }
    } else if family.is_approximate_numeric() || family == PolyTypeFamily::Decimal {
        match value {
            PolyValue::Float(f) => json!(f.0),
            PolyValue::Integer(i) => json!(*i as f64),
            PolyValue::Decimal { unscaled, scale } => {
                json!(*unscaled as f64 / 10f64.powi(*scale as i32))
            }
            other => return plan_err!("cannot insert {other} into a fractional column"),
        }
    } else {
        match (value, family) {
            (PolyValue::Date(d), PolyTypeFamily::Date) => json!(d),
            (PolyValue::Time(t), PolyTypeFamily::Time) => json!(t),
            (PolyValue::Timestamp(t), PolyTypeFamily::Timestamp) => json!(t),
            (PolyValue::Boolean(b), PolyTypeFamily::Boolean) => json!(b),
            (PolyValue::Binary(bytes), _) => json!(BASE64.encode(bytes)),
            (other, _) => json!(other.to_string()),
        }
    })
}
