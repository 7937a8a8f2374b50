// This file is part of the terraform-provider-huaweicloud project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::borrow::Cow;
use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use tf_provider::map;
use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Block, Description, Schema};
use tf_provider::value::{self, Value, ValueBool, ValueList, ValueMap, ValueNumber, ValueString};

use crate::utils::{
    assign_string, bool_at, computed, flatten_tags_to_map, format_rfc3339, number_at,
    settle_unknowns, string_at, PathSearch, Timeouts, WithSchema, ID_ATTRIBUTE,
    REGION_ATTRIBUTE, TAGS_ATTRIBUTE, TIMEOUTS_BLOCK,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Spec<'a> {
    #[serde(borrow = "'a")]
    pub spec_code: ValueString<'a>,
    pub stride_num: ValueNumber,
    pub product_id: ValueString<'a>,
}

/// State of a `huaweicloud_lakeformation_instance` resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InstanceState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub region: ValueString<'a>,
    pub name: ValueString<'a>,
    pub shared: ValueBool,
    pub specs: ValueList<Value<Spec<'a>>>,
    pub description: ValueString<'a>,
    pub enterprise_project_id: ValueString<'a>,
    pub tags: ValueMap<'a, ValueString<'a>>,
    pub to_recycle_bin: ValueBool,
    pub enable_force_new: ValueString<'a>,
    pub status: ValueString<'a>,
    pub is_default: ValueBool,
    pub create_time: ValueString<'a>,
    pub update_time: ValueString<'a>,
    #[serde(with = "value::serde_as_vec")]
    pub timeouts: Value<Timeouts<'a>>,
}

/// State of a `huaweicloud_lakeformation_instance` data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InstanceDataState<'a> {
    #[serde(borrow = "'a")]
    pub id: ValueString<'a>,
    pub region: ValueString<'a>,
    pub instance_id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub shared: ValueBool,
    pub specs: ValueList<Value<Spec<'a>>>,
    pub description: ValueString<'a>,
    pub enterprise_project_id: ValueString<'a>,
    pub tags: ValueMap<'a, ValueString<'a>>,
    pub status: ValueString<'a>,
    pub is_default: ValueBool,
    pub create_time: ValueString<'a>,
    pub update_time: ValueString<'a>,
}

fn spec_code<'b>(spec: &'b Value<Spec>) -> Option<&'b str> {
    spec.as_ref_option()
        .and_then(|spec| spec.spec_code.as_deref_option())
}

/// Order the remote specs like the known ones, specs unknown locally come last
pub(super) fn order_specs<'a>(
    remote: Vec<Value<Spec<'a>>>,
    known: &ValueList<Value<Spec>>,
) -> Vec<Value<Spec<'a>>> {
    let mut remaining = remote;
    let mut ordered = Vec::with_capacity(remaining.len());
    for code in known.iter().flatten().filter_map(spec_code) {
        if let Some(index) = remaining.iter().position(|spec| spec_code(spec) == Some(code)) {
            ordered.push(remaining.remove(index));
        }
    }
    ordered.append(&mut remaining);
    ordered
}

fn flatten_specs<'a>(body: &Json, known: &ValueList<Value<Spec>>) -> ValueList<Value<Spec<'a>>> {
    let specs: Vec<_> = body
        .search_array("specs")
        .iter()
        .map(|spec| {
            Value::Value(Spec {
                spec_code: string_at(spec, "spec_code"),
                stride_num: number_at(spec, "stride_num"),
                product_id: string_at(spec, "product_id"),
            })
        })
        .collect();
    if specs.is_empty() {
        Value::Null
    } else {
        Value::Value(order_specs(specs, known))
    }
}

pub(super) fn build_specs(specs: &ValueList<Value<Spec>>) -> Json {
    let specs: Vec<Json> = specs
        .iter()
        .flatten()
        .filter_map(Value::as_ref_option)
        .map(|spec| {
            json!({
                "spec_code": spec.spec_code.as_deref_option(),
                "stride_num": spec.stride_num.as_option(),
                "product_id": spec.product_id.as_deref_option(),
            })
        })
        .collect();
    if specs.is_empty() {
        Json::Null
    } else {
        Json::Array(specs)
    }
}

fn timestamp<'a>(body: &Json, expr: &str) -> ValueString<'a> {
    body.search(expr)
        .as_ref()
        .and_then(format_rfc3339)
        .map(Cow::Owned)
        .into()
}

impl<'a> InstanceState<'a> {
    pub(super) fn unknown_outputs(&mut self) {
        self.status = Value::Unknown;
        self.update_time = Value::Unknown;
    }

    /// Product IDs are filled by the API when left out
    pub(super) fn unknown_spec_fields(&mut self) {
        match &mut self.specs {
            Value::Value(specs) => {
                for spec in specs.iter_mut().filter_map(Value::as_mut_option) {
                    if spec.product_id.is_null() {
                        spec.product_id = Value::Unknown;
                    }
                    if spec.stride_num.is_null() {
                        spec.stride_num = Value::Unknown;
                    }
                }
            }
            specs => *specs = Value::Unknown,
        }
    }

    pub(super) fn settle(&mut self) {
        settle_unknowns!(
            self,
            [
                id,
                region,
                specs,
                enterprise_project_id,
                to_recycle_bin,
                status,
                is_default,
                create_time,
                update_time,
            ]
        );
        if let Value::Value(specs) = &mut self.specs {
            for spec in specs.iter_mut().filter_map(Value::as_mut_option) {
                settle_unknowns!(spec, [spec_code, stride_num, product_id]);
            }
        }
    }

    pub(super) fn apply_response(&mut self, region: &str, body: &Json) {
        self.region = Value::Value(Cow::Owned(region.to_owned()));
        self.name = string_at(body, "name");
        self.shared = bool_at(body, "shared");
        self.specs = flatten_specs(body, &self.specs);
        assign_string(&mut self.description, string_at(body, "description"));
        self.enterprise_project_id = string_at(body, "enterprise_project_id");
        let tags = flatten_tags_to_map(body.search("tags"));
        if !(tags.is_null() && self.tags.as_ref_option().is_some_and(|tags| tags.is_empty())) {
            self.tags = tags;
        }
        self.status = string_at(body, "status");
        self.is_default = bool_at(body, "default_instance");
        self.create_time = timestamp(body, "create_time");
        self.update_time = timestamp(body, "update_time");
    }
}

impl<'a> InstanceDataState<'a> {
    pub(super) fn apply_response(&mut self, region: &str, body: &Json) {
        self.id = string_at(body, "instance_id");
        if self.id.is_null() {
            self.id = self.instance_id.clone();
        }
        self.region = Value::Value(Cow::Owned(region.to_owned()));
        self.name = string_at(body, "name");
        self.shared = bool_at(body, "shared");
        self.specs = flatten_specs(body, &Value::Null);
        self.description = string_at(body, "description");
        self.enterprise_project_id = string_at(body, "enterprise_project_id");
        self.tags = flatten_tags_to_map(body.search("tags"));
        self.status = string_at(body, "status");
        self.is_default = bool_at(body, "default_instance");
        self.create_time = timestamp(body, "create_time");
        self.update_time = timestamp(body, "update_time");
    }
}

fn spec_attributes(constraint: AttributeConstraint) -> HashMap<String, Attribute> {
    let attribute = |attr_type, description: &str| Attribute {
        attr_type,
        description: Description::plain(description),
        constraint: constraint.clone(),
        ..Default::default()
    };
    map! {
        "spec_code" => attribute(AttributeType::String, "The specification code."),
        "stride_num" => attribute(AttributeType::Number, "The stride number of the specification."),
        "product_id" => attribute(AttributeType::String, "The product ID of the specification."),
    }
}

lazy_static! {
    static ref OUTPUT_ATTRIBUTES: HashMap<String, Attribute> = map! {
        "status" => computed(AttributeType::String, "The status of the instance."),
        "is_default" => computed(AttributeType::Bool, "Whether the instance is the default instance."),
        "create_time" => computed(AttributeType::String, "The creation time of the instance, in RFC3339 format."),
        "update_time" => computed(AttributeType::String, "The update time of the instance, in RFC3339 format."),
    };
}

impl WithSchema for InstanceState<'_> {
    fn schema() -> Schema {
        let mut attributes: HashMap<String, Attribute> = map! {
            "id" => ID_ATTRIBUTE.clone(),
            "region" => REGION_ATTRIBUTE.clone(),
            "name" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The name of the instance."),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "shared" => Attribute {
                attr_type: AttributeType::Bool,
                description: Description::plain("Whether the instance is shared."),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "specs" => Attribute {
                attr_type: AttributeType::AttributeList(spec_attributes(
                    AttributeConstraint::OptionalComputed,
                )),
                description: Description::plain("The list of specifications."),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
            "description" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The description of the instance."),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
            "enterprise_project_id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The ID of the enterprise project."),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
            "tags" => TAGS_ATTRIBUTE.clone(),
            "to_recycle_bin" => Attribute {
                attr_type: AttributeType::Bool,
                description: Description::plain(
                    "Whether to put the instance into the recycle bin when delete postpaid instance.",
                ),
                constraint: AttributeConstraint::OptionalComputed,
                ..Default::default()
            },
            "enable_force_new" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain(
                    "Whether changing `shared` or `enterprise_project_id` replaces the instance (\"true\" or \"false\").",
                ),
                constraint: AttributeConstraint::Optional,
                ..Default::default()
            },
        };
        attributes.extend(OUTPUT_ATTRIBUTES.clone());

        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes,
                blocks: map! {
                    "timeouts" => TIMEOUTS_BLOCK.clone(),
                },
                description: Description::plain("Manages a LakeFormation instance"),
                ..Default::default()
            },
        }
    }
}

impl WithSchema for InstanceDataState<'_> {
    fn schema() -> Schema {
        let mut attributes: HashMap<String, Attribute> = map! {
            "id" => ID_ATTRIBUTE.clone(),
            "region" => REGION_ATTRIBUTE.clone(),
            "instance_id" => Attribute {
                attr_type: AttributeType::String,
                description: Description::plain("The ID of the instance to query."),
                constraint: AttributeConstraint::Required,
                ..Default::default()
            },
            "name" => computed(AttributeType::String, "The name of the instance."),
            "shared" => computed(AttributeType::Bool, "Whether the instance is shared."),
            "specs" => computed(
                AttributeType::AttributeList(spec_attributes(AttributeConstraint::Computed)),
                "The list of specifications.",
            ),
            "description" => computed(AttributeType::String, "The description of the instance."),
            "enterprise_project_id" => computed(AttributeType::String, "The ID of the enterprise project."),
            "tags" => computed(
                AttributeType::Map(AttributeType::String.into()),
                "The key/value pairs associated with the instance.",
            ),
        };
        attributes.extend(OUTPUT_ATTRIBUTES.clone());

        Schema {
            version: 1,
            block: Block {
                version: 1,
                attributes,
                description: Description::plain("Get the details of a LakeFormation instance"),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(code: &'static str, stride_num: i64) -> Value<Spec<'static>> {
        Value::Value(Spec {
            spec_code: Value::Value(Cow::Borrowed(code)),
            stride_num: Value::Value(stride_num),
            product_id: Value::Null,
        })
    }

    fn codes(specs: &[Value<Spec>]) -> Vec<String> {
        specs
            .iter()
            .filter_map(spec_code)
            .map(str::to_owned)
            .collect()
    }

    fn instance() -> Json {
        json!({
            "instance_id": "i-1",
            "name": "lf-demo",
            "shared": true,
            "description": "",
            "enterprise_project_id": "0",
            "status": "RUNNING",
            "default_instance": false,
            "create_time": "2024-03-01T10:00:00.123Z",
            "update_time": 1709287200000i64,
            "specs": [
                { "spec_code": "lakeformation.unit.basic.qps", "stride_num": 1, "product_id": "p-1" },
                { "spec_code": "lakeformation.unit.basic.storage", "stride_num": 2, "product_id": "p-2" },
            ],
            "tags": [{ "key": "env", "value": "test" }],
        })
    }

    #[test]
    fn test_order_specs() {
        let remote = vec![spec("a", 1), spec("b", 1), spec("c", 1)];
        let known = Value::Value(vec![spec("c", 1), spec("a", 1), spec("z", 1)]);
        assert_eq!(codes(&order_specs(remote, &known)), ["c", "a", "b"]);

        let remote = vec![spec("a", 1), spec("b", 1)];
        assert_eq!(codes(&order_specs(remote, &Value::Null)), ["a", "b"]);
    }

    #[test]
    fn test_build_specs() {
        let specs = Value::Value(vec![spec("a", 2)]);
        assert_eq!(
            build_specs(&specs),
            json!([{ "spec_code": "a", "stride_num": 2, "product_id": null }])
        );
        assert_eq!(build_specs(&Value::Null), Json::Null);
    }

    #[test]
    fn test_apply_response() {
        let mut state = InstanceState {
            specs: Value::Value(vec![
                spec("lakeformation.unit.basic.storage", 2),
                spec("lakeformation.unit.basic.qps", 1),
            ]),
            ..Default::default()
        };
        state.apply_response("cn-north-4", &instance());

        assert_eq!(
            codes(state.specs.as_ref_option().unwrap()),
            ["lakeformation.unit.basic.storage", "lakeformation.unit.basic.qps"]
        );
        assert!(state.description.is_null());
        assert_eq!(state.shared.as_option(), Some(true));
        assert_eq!(state.create_time.as_deref_option(), Some("2024-03-01T10:00:00Z"));
        assert_eq!(state.update_time.as_deref_option(), Some("2024-03-01T10:00:00Z"));
        assert_eq!(state.tags.iter().flatten().count(), 1);
    }

    #[test]
    fn test_settle() {
        let mut state = InstanceState {
            specs: Value::Value(vec![spec("a", 1)]),
            ..Default::default()
        };
        state.unknown_spec_fields();
        state.unknown_outputs();
        state.settle();

        assert!(state.status.is_null());
        let spec = state.specs.as_ref_option().unwrap()[0].as_ref_option().unwrap();
        assert!(spec.product_id.is_null());
        assert_eq!(spec.stride_num.as_option(), Some(1));
    }

    #[test]
    fn test_data_source_apply_response() {
        let mut state = InstanceDataState {
            instance_id: Value::Value(Cow::Borrowed("i-1")),
            ..Default::default()
        };
        state.apply_response("cn-north-4", &instance());
        assert_eq!(state.id.as_deref_option(), Some("i-1"));
        assert_eq!(state.description.as_deref_option(), Some(""));
        assert_eq!(state.specs.iter().flatten().count(), 2);
    }

    #[test]
    fn test_schemas() {
        let schema = InstanceState::schema();
        assert!(schema.block.blocks.contains_key("timeouts"));
        assert_eq!(
            schema.block.attributes["shared"].constraint,
            AttributeConstraint::Required
        );
        let schema = InstanceDataState::schema();
        assert_eq!(
            schema.block.attributes["specs"].constraint,
            AttributeConstraint::Computed
        );
    }
}
