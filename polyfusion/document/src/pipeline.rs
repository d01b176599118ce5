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

//! Stage constructors for the ordered document pipeline

use serde_json::{json, Map, Value};

pub fn match_stage(filter: Value) -> Value {
    json!({ "$match": filter })
}

pub fn project_stage(fields: Map<String, Value>) -> Value {
    json!({ "$project": Value::Object(fields) })
}

pub fn group_stage(spec: Map<String, Value>) -> Value {
    json!({ "$group": Value::Object(spec) })
}

pub fn sort_stage(keys: Map<String, Value>) -> Value {
    json!({ "$sort": Value::Object(keys) })
}

pub fn limit_stage(n: usize) -> Value {
    json!({ "$limit": n })
}

pub fn skip_stage(n: usize) -> Value {
    json!({ "$skip": n })
}

pub fn unwind_stage(path: &str) -> Value {
    json!({ "$unwind": format!("${path}") })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_have_the_expected_shape() {
        assert_eq!(limit_stage(5), json!({ "$limit": 5 }));
        assert_eq!(unwind_stage("tags"), json!({ "$unwind": "$tags" }));
        let mut keys = Map::new();
        keys.insert("age".to_string(), json!(-1));
        assert_eq!(sort_stage(keys), json!({ "$sort": { "age": -1 } }));
    }
}
